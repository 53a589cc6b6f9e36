//! Resource resolution and loading.
//!
//! A metric's [`Requirement`]s are normalized against a built-in table of
//! default sources and formats, resolved against the unit's model, dataset
//! and metric, and loaded through the format's load function. Loaded values
//! are cached by `(resolved source, load function)` for the lifetime of the
//! loader, so a file shared by many units is read once.

use crate::formats;
use dialeval_core::{
    keys, ConfigError, DatasetField, EvaluationUnit, Format, Metric, ModelField, Requirement,
    Resource, ResourceError, Resources, Source, SourceValue,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// A requirement with its source and format filled in.
#[derive(Debug, Clone)]
pub struct ResolvedRequirement {
    pub key: String,
    pub source: Source,
    pub format: Format,
}

/// Default source and format for a well-known key.
pub fn default_entry(key: &str) -> Option<(Source, Format)> {
    use DatasetField as D;
    use ModelField as M;

    let entry = match key {
        keys::RESPONSES => (Source::Model(M::Responses), Format::TokenList),
        keys::CONTEXTS => (Source::Dataset(D::Contexts), Format::TokenList),
        keys::REFERENCES => (Source::Dataset(D::References), Format::TokenList),
        keys::RAW_RESPONSES => (Source::Model(M::Responses), Format::RawLines),
        keys::RAW_CONTEXTS => (Source::Dataset(D::Contexts), Format::RawLines),
        keys::RAW_REFERENCES => (Source::Dataset(D::References), Format::RawLines),
        keys::HYPOTHESIS_SETS => (Source::Model(M::MultiResponses), Format::TokenSets),
        keys::REFERENCE_SETS => (
            Source::Metric(keys::REFERENCE_SETS.to_string()),
            Format::TokenSets,
        ),
        keys::EMBEDDINGS => (
            Source::Metric(keys::EMBEDDINGS.to_string()),
            Format::Embeddings,
        ),
        keys::WEIGHTS => (Source::Model(M::Weights), Format::Path),
        keys::VOCABULARY => (Source::Dataset(D::Vocabulary), Format::Path),
        keys::TRAIN_SET => (Source::Dataset(D::TrainSet), Format::Path),
        keys::TEST_DIALOGUES => (Source::Dataset(D::TestDialogues), Format::Path),
        _ => return None,
    };
    Some(entry)
}

/// Fill in defaults for one requirement.
pub fn normalize(requirement: &Requirement) -> Result<ResolvedRequirement, ResourceError> {
    let (key, source, format) = match requirement {
        Requirement::Key(key) => (key, None, None),
        Requirement::Custom {
            key,
            source,
            format,
        } => (key, source.clone(), format.clone()),
    };

    let default = default_entry(key);
    let source = match (source, &default) {
        (Some(source), _) => source,
        (None, Some((source, _))) => source.clone(),
        (None, None) => return Err(ResourceError::UnknownKey(key.clone())),
    };
    let format = match (format, default) {
        (Some(format), _) => format,
        (None, Some((_, format))) => format,
        (None, None) => return Err(ResourceError::UnknownKey(key.clone())),
    };

    Ok(ResolvedRequirement {
        key: key.clone(),
        source,
        format,
    })
}

/// Check that every requirement of `metric` can be normalized.
pub fn validate_requirements(metric: &dyn Metric) -> Result<(), ConfigError> {
    for requirement in metric.requires() {
        normalize(&requirement).map_err(|e| ConfigError::MalformedRequirement {
            metric: metric.fullname(),
            key: requirement.name().to_string(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

/// Look a source up on the unit's model, dataset or metric.
pub fn resolve_source(
    key: &str,
    source: &Source,
    unit: &EvaluationUnit,
) -> Result<SourceValue, ResourceError> {
    let path = |p: &PathBuf| Some(SourceValue::Path(p.clone()));
    let opt_path = |p: &Option<PathBuf>| p.clone().map(SourceValue::Path);

    let model = unit.model();
    let dataset = unit.dataset();
    let value = match source {
        Source::Model(ModelField::Responses) => path(&model.responses),
        Source::Model(ModelField::MultiResponses) => opt_path(&model.multi_responses),
        Source::Model(ModelField::Weights) => opt_path(&model.weights),
        Source::Dataset(DatasetField::Contexts) => path(&dataset.contexts),
        Source::Dataset(DatasetField::References) => path(&dataset.references),
        Source::Dataset(DatasetField::TestDialogues) => opt_path(&dataset.test_dialogues),
        Source::Dataset(DatasetField::Vocabulary) => opt_path(&dataset.vocabulary),
        Source::Dataset(DatasetField::TrainSet) => opt_path(&dataset.train_set),
        Source::Metric(name) => unit.metric().source(name),
        Source::Literal(value) => Some(value.clone()),
    };

    value.ok_or_else(|| ResourceError::MissingSource {
        key: key.to_string(),
        source_name: source.to_string(),
    })
}

/// Apply a format's load function to a resolved value.
pub fn load_value(
    key: &str,
    value: &SourceValue,
    format: &Format,
) -> Result<Resource, ResourceError> {
    let file = || match value {
        SourceValue::Path(path) => Ok(path.as_path()),
        SourceValue::Literal(literal) => Err(ResourceError::NotAPath {
            key: key.to_string(),
            value: literal.clone(),
        }),
    };

    match format {
        Format::TokenList => formats::read_token_lists(file()?).map(Resource::TokenLists),
        Format::RawLines => formats::read_lines(file()?).map(Resource::Lines),
        Format::TokenSets => formats::read_token_sets(file()?).map(Resource::TokenSets),
        Format::Embeddings => formats::read_embeddings(file()?).map(Resource::Embeddings),
        Format::Path => Ok(match value {
            SourceValue::Path(path) => Resource::Path(path.clone()),
            SourceValue::Literal(literal) => Resource::Literal(literal.clone()),
        }),
        Format::Custom { load, .. } => load(value),
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Loads resources for evaluation units, caching by resolved source and
/// load function.
#[derive(Debug, Default)]
pub struct ResourceLoader {
    cache: HashMap<(SourceValue, String), Arc<Resource>>,
    hits: usize,
    misses: usize,
}

impl ResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load everything `unit`'s metric requires.
    ///
    /// Returns `None` (after logging a warning naming the unit and key) as
    /// soon as one resource fails; later keys are not attempted.
    pub fn load_resources(&mut self, unit: &EvaluationUnit) -> Option<Resources> {
        let mut resources = Resources::new();
        for requirement in unit.metric().requires() {
            let key = requirement.name().to_string();
            match self.load_one(unit, &requirement) {
                Ok(resource) => resources.insert(key, resource),
                Err(e) => {
                    log::warn!("{}: cannot load resource '{}': {}", unit.prefix(), key, e);
                    return None;
                }
            }
        }
        Some(resources)
    }

    fn load_one(
        &mut self,
        unit: &EvaluationUnit,
        requirement: &Requirement,
    ) -> Result<Arc<Resource>, ResourceError> {
        let resolved = normalize(requirement)?;
        let value = resolve_source(&resolved.key, &resolved.source, unit)?;
        let cache_key = (value, resolved.format.id().to_string());

        if let Some(resource) = self.cache.get(&cache_key) {
            self.hits += 1;
            return Ok(Arc::clone(resource));
        }

        log::debug!(
            "Loading '{}' from {} as {}",
            resolved.key,
            cache_key.0,
            cache_key.1
        );
        let resource = Arc::new(load_value(&resolved.key, &cache_key.0, &resolved.format)?);
        self.misses += 1;
        self.cache.insert(cache_key, Arc::clone(&resource));
        Ok(resource)
    }

    /// Resolve the file paths `unit` depends on, without loading them.
    ///
    /// Literal sources are skipped.
    pub fn get_filenames(
        &self,
        unit: &EvaluationUnit,
    ) -> Result<BTreeMap<String, PathBuf>, ResourceError> {
        let mut filenames = BTreeMap::new();
        for requirement in unit.metric().requires() {
            let resolved = normalize(&requirement)?;
            if let SourceValue::Path(path) =
                resolve_source(&resolved.key, &resolved.source, unit)?
            {
                filenames.insert(resolved.key, path);
            }
        }
        Ok(filenames)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
        }
    }
}
