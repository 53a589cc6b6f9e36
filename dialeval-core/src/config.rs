//! Declarative run configuration.
//!
//! A run configuration names the models, datasets and metrics to evaluate.
//! It is read from JSON, TOML or YAML; the shape is the same in all three:
//!
//! ```toml
//! models = ["results/ubuntu/hred/output.txt"]
//! output_dir = "scores"
//!
//! [datasets.ubuntu]
//! context = "data/ubuntu/contexts.txt"
//! reference = "data/ubuntu/references.txt"
//!
//! [metrics.bleu]
//! n = [1, 2, 3, 4]
//! ```

use crate::entity::{Dataset, Model};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File formats a run configuration can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Root of a run configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct RunConfig {
    /// Models, as response-file paths or explicit records
    pub models: Vec<ModelSpec>,

    /// Datasets, keyed by name or as a list of records
    pub datasets: DatasetsSpec,

    /// Metric configuration blocks
    pub metrics: MetricsSpec,

    /// Recompute every unit even when its output is up to date
    #[serde(default)]
    pub force: bool,

    /// Directory score files are written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Worker pool size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl RunConfig {
    /// Create a configuration from its three required parts.
    pub fn new(models: Vec<ModelSpec>, datasets: DatasetsSpec, metrics: MetricsSpec) -> Self {
        Self {
            models,
            datasets,
            metrics,
            force: false,
            output_dir: None,
            workers: None,
        }
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Load a configuration file, choosing the parser by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        log::debug!("Loading {:?} config from {}", format, path.display());
        Self::parse(&contents, format).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration text in the given format.
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
        }
    }
}

/// A model declared by its response-file path or as a full record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModelSpec {
    Path(PathBuf),
    Model(Model),
}

impl ModelSpec {
    /// Resolve to a [`Model`], inferring names from the path if needed.
    pub fn to_model(&self) -> Result<Model, ConfigError> {
        match self {
            ModelSpec::Path(path) => Model::from_output_path(path),
            ModelSpec::Model(model) => Ok(model.clone()),
        }
    }
}

impl From<Model> for ModelSpec {
    fn from(model: Model) -> Self {
        ModelSpec::Model(model)
    }
}

/// Dataset files, without the name (used in the keyed form).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetFiles {
    #[serde(alias = "context")]
    pub contexts: PathBuf,

    #[serde(alias = "reference")]
    pub references: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_dialogues: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_set: Option<PathBuf>,
}

impl DatasetFiles {
    fn to_dataset(&self, name: &str) -> Dataset {
        Dataset {
            name: name.to_string(),
            contexts: self.contexts.clone(),
            references: self.references.clone(),
            test_dialogues: self.test_dialogues.clone(),
            vocabulary: self.vocabulary.clone(),
            train_set: self.train_set.clone(),
        }
    }
}

/// Datasets keyed by name (iterated in key order) or as a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DatasetsSpec {
    Map(BTreeMap<String, DatasetFiles>),
    List(Vec<Dataset>),
}

impl DatasetsSpec {
    pub fn to_datasets(&self) -> Vec<Dataset> {
        match self {
            DatasetsSpec::Map(map) => map
                .iter()
                .map(|(name, files)| files.to_dataset(name))
                .collect(),
            DatasetsSpec::List(list) => list.clone(),
        }
    }
}

impl From<Vec<Dataset>> for DatasetsSpec {
    fn from(datasets: Vec<Dataset>) -> Self {
        DatasetsSpec::List(datasets)
    }
}

/// One entry of the list form: `{"name": "bleu", "n": 4}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricEntry {
    pub name: String,

    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Metric blocks keyed by name (iterated in key order) or as a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricsSpec {
    Map(BTreeMap<String, serde_json::Value>),
    List(Vec<MetricEntry>),
}

impl MetricsSpec {
    /// `(name, block)` pairs in iteration order.
    pub fn entries(&self) -> Vec<(String, serde_json::Value)> {
        match self {
            MetricsSpec::Map(map) => map
                .iter()
                .map(|(name, block)| (name.clone(), block.clone()))
                .collect(),
            MetricsSpec::List(list) => list
                .iter()
                .map(|entry| {
                    (
                        entry.name.clone(),
                        serde_json::Value::Object(entry.params.clone()),
                    )
                })
                .collect(),
        }
    }
}
