//! Resource declarations and loaded resource values.
//!
//! A metric declares what it needs as a list of [`Requirement`]s. Each
//! requirement names a resource key and optionally overrides where the value
//! comes from ([`Source`]) and how it is turned into memory ([`Format`]).
//! The loader resolves those declarations and hands the metric a
//! [`Resources`] map.

use crate::error::{MetricError, ResourceError};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Well-known resource keys.
pub mod keys {
    pub const RESPONSES: &str = "responses";
    pub const CONTEXTS: &str = "contexts";
    pub const REFERENCES: &str = "references";
    pub const RAW_RESPONSES: &str = "raw_responses";
    pub const RAW_CONTEXTS: &str = "raw_contexts";
    pub const RAW_REFERENCES: &str = "raw_references";
    pub const HYPOTHESIS_SETS: &str = "hypothesis_sets";
    pub const REFERENCE_SETS: &str = "reference_sets";
    pub const EMBEDDINGS: &str = "embeddings";
    pub const WEIGHTS: &str = "weights";
    pub const VOCABULARY: &str = "vocabulary";
    pub const TRAIN_SET: &str = "train_set";
    pub const TEST_DIALOGUES: &str = "test_dialogues";
}

/// Model attributes a requirement can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelField {
    Responses,
    MultiResponses,
    Weights,
}

/// Dataset attributes a requirement can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetField {
    Contexts,
    References,
    TestDialogues,
    Vocabulary,
    TrainSet,
}

/// Where a resource's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// An attribute of the unit's model
    Model(ModelField),
    /// An attribute of the unit's dataset
    Dataset(DatasetField),
    /// A named value owned by the metric (see [`crate::Metric::source`])
    Metric(String),
    /// A fixed value
    Literal(SourceValue),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Model(field) => write!(f, "model.{}", model_field_name(*field)),
            Source::Dataset(field) => write!(f, "dataset.{}", dataset_field_name(*field)),
            Source::Metric(name) => write!(f, "metric.{}", name),
            Source::Literal(value) => write!(f, "literal {}", value),
        }
    }
}

fn model_field_name(field: ModelField) -> &'static str {
    match field {
        ModelField::Responses => "responses",
        ModelField::MultiResponses => "multi_responses",
        ModelField::Weights => "weights",
    }
}

fn dataset_field_name(field: DatasetField) -> &'static str {
    match field {
        DatasetField::Contexts => "contexts",
        DatasetField::References => "references",
        DatasetField::TestDialogues => "test_dialogues",
        DatasetField::Vocabulary => "vocabulary",
        DatasetField::TrainSet => "train_set",
    }
}

/// A resolved source: either a file or a literal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceValue {
    Path(PathBuf),
    Literal(String),
}

impl SourceValue {
    /// The file path, if this value names one.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            SourceValue::Path(path) => Some(path),
            SourceValue::Literal(_) => None,
        }
    }
}

impl fmt::Display for SourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceValue::Path(path) => write!(f, "{}", path.display()),
            SourceValue::Literal(value) => write!(f, "{:?}", value),
        }
    }
}

/// Load function type for [`Format::Custom`].
pub type LoadFn = Arc<dyn Fn(&SourceValue) -> Result<Resource, ResourceError> + Send + Sync>;

/// How a resolved source is turned into a [`Resource`].
#[derive(Clone)]
pub enum Format {
    /// One example per line, split on whitespace
    TokenList,
    /// One example per line, kept as a string
    RawLines,
    /// One example per line, TAB-separated hypotheses, each split on whitespace
    TokenSets,
    /// word2vec table (binary for `.bin`, text otherwise)
    Embeddings,
    /// The path itself, unread
    Path,
    /// A caller-supplied loader; `id` is its identity in the resource cache
    Custom { id: String, load: LoadFn },
}

impl Format {
    /// Build a custom format from a closure.
    pub fn custom<F>(id: impl Into<String>, load: F) -> Self
    where
        F: Fn(&SourceValue) -> Result<Resource, ResourceError> + Send + Sync + 'static,
    {
        Format::Custom {
            id: id.into(),
            load: Arc::new(load),
        }
    }

    /// Identity of the load function, used in cache keys.
    pub fn id(&self) -> &str {
        match self {
            Format::TokenList => "token_list",
            Format::RawLines => "raw_lines",
            Format::TokenSets => "token_sets",
            Format::Embeddings => "embeddings",
            Format::Path => "path",
            Format::Custom { id, .. } => id,
        }
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Custom { id, .. } => f.debug_struct("Custom").field("id", id).finish(),
            other => f.write_str(other.id()),
        }
    }
}

/// One entry of a metric's `requires` declaration.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// A well-known key with its default source and format
    Key(String),
    /// A key with an overridden source and/or format
    Custom {
        key: String,
        source: Option<Source>,
        format: Option<Format>,
    },
}

impl Requirement {
    /// A requirement using the defaults for `key`.
    pub fn key(key: impl Into<String>) -> Self {
        Requirement::Key(key.into())
    }

    /// Override only the format; the default source for `key` is used.
    pub fn with_format(key: impl Into<String>, format: Format) -> Self {
        Requirement::Custom {
            key: key.into(),
            source: None,
            format: Some(format),
        }
    }

    /// Override the source and, optionally, the format.
    pub fn with_source(key: impl Into<String>, source: Source, format: Option<Format>) -> Self {
        Requirement::Custom {
            key: key.into(),
            source: Some(source),
            format,
        }
    }

    /// The key the loaded value is stored under.
    pub fn name(&self) -> &str {
        match self {
            Requirement::Key(key) => key,
            Requirement::Custom { key, .. } => key,
        }
    }
}

/// Build a list-form declaration from plain keys.
pub fn requires(keys: &[&str]) -> Vec<Requirement> {
    keys.iter().map(|k| Requirement::key(*k)).collect()
}

/// A word-embedding table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embeddings {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl Embeddings {
    /// Create an empty table of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: HashMap::new(),
        }
    }

    /// Insert a vector. Vectors of the wrong dimension are rejected.
    pub fn insert(&mut self, word: impl Into<String>, vector: Vec<f32>) -> bool {
        if vector.len() != self.dim {
            return false;
        }
        self.vectors.insert(word.into(), vector);
        true
    }

    /// Look up a word.
    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }

    /// Vector dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// A loaded resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    TokenLists(Vec<Vec<String>>),
    Lines(Vec<String>),
    TokenSets(Vec<Vec<Vec<String>>>),
    Embeddings(Embeddings),
    Path(PathBuf),
    Literal(String),
}

impl Resource {
    fn kind(&self) -> &'static str {
        match self {
            Resource::TokenLists(_) => "token lists",
            Resource::Lines(_) => "raw lines",
            Resource::TokenSets(_) => "token sets",
            Resource::Embeddings(_) => "embeddings",
            Resource::Path(_) => "a path",
            Resource::Literal(_) => "a literal",
        }
    }
}

/// The resources handed to one metric invocation, keyed by requirement name.
///
/// Values are shared with the loader cache, so cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    entries: BTreeMap<String, Arc<Resource>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource.
    pub fn insert(&mut self, key: impl Into<String>, resource: Arc<Resource>) {
        self.entries.insert(key.into(), resource);
    }

    /// Raw access to a resource.
    pub fn get(&self, key: &str) -> Result<&Resource, MetricError> {
        self.entries
            .get(key)
            .map(Arc::as_ref)
            .ok_or_else(|| MetricError::MissingResource(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys present, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn token_lists(&self, key: &str) -> Result<&[Vec<String>], MetricError> {
        match self.get(key)? {
            Resource::TokenLists(lists) => Ok(lists),
            other => Err(kind_error(key, "token lists", other)),
        }
    }

    pub fn lines(&self, key: &str) -> Result<&[String], MetricError> {
        match self.get(key)? {
            Resource::Lines(lines) => Ok(lines),
            other => Err(kind_error(key, "raw lines", other)),
        }
    }

    pub fn token_sets(&self, key: &str) -> Result<&[Vec<Vec<String>>], MetricError> {
        match self.get(key)? {
            Resource::TokenSets(sets) => Ok(sets),
            other => Err(kind_error(key, "token sets", other)),
        }
    }

    pub fn embeddings(&self, key: &str) -> Result<&Embeddings, MetricError> {
        match self.get(key)? {
            Resource::Embeddings(table) => Ok(table),
            other => Err(kind_error(key, "embeddings", other)),
        }
    }

    pub fn path(&self, key: &str) -> Result<&Path, MetricError> {
        match self.get(key)? {
            Resource::Path(path) => Ok(path),
            other => Err(kind_error(key, "a path", other)),
        }
    }
}

fn kind_error(key: &str, expected: &'static str, found: &Resource) -> MetricError {
    log::debug!("Resource '{}' is {}, expected {}", key, found.kind(), expected);
    MetricError::ResourceKind {
        key: key.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_names() {
        assert_eq!(Requirement::key(keys::RESPONSES).name(), "responses");
        let custom = Requirement::with_format(keys::RAW_RESPONSES, Format::Path);
        assert_eq!(custom.name(), "raw_responses");
    }

    #[test]
    fn test_requires_builds_key_list() {
        let declared = requires(&[keys::RESPONSES, keys::REFERENCES]);
        let names: Vec<_> = declared.iter().map(Requirement::name).collect();
        assert_eq!(names, vec!["responses", "references"]);
    }

    #[test]
    fn test_format_ids_are_distinct() {
        let formats = [
            Format::TokenList,
            Format::RawLines,
            Format::TokenSets,
            Format::Embeddings,
            Format::Path,
            Format::custom("upper_lines", |_| Ok(Resource::Lines(vec![]))),
        ];
        let mut ids: Vec<_> = formats.iter().map(Format::id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), formats.len());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(
            Source::Model(ModelField::MultiResponses).to_string(),
            "model.multi_responses"
        );
        assert_eq!(
            Source::Dataset(DatasetField::References).to_string(),
            "dataset.references"
        );
        assert_eq!(
            Source::Metric("embeddings".into()).to_string(),
            "metric.embeddings"
        );
    }

    #[test]
    fn test_embeddings_reject_wrong_dimension() {
        let mut table = Embeddings::new(2);
        assert!(table.insert("a", vec![1.0, 0.0]));
        assert!(!table.insert("b", vec![1.0]));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a"), Some(&[1.0, 0.0][..]));
        assert!(table.get("b").is_none());
    }

    #[test]
    fn test_resources_typed_access() {
        let mut resources = Resources::new();
        resources.insert(
            keys::RESPONSES,
            Arc::new(Resource::TokenLists(vec![vec!["hi".into()]])),
        );

        assert_eq!(resources.token_lists(keys::RESPONSES).unwrap().len(), 1);
        assert!(matches!(
            resources.lines(keys::RESPONSES),
            Err(MetricError::ResourceKind { .. })
        ));
        assert!(matches!(
            resources.token_lists(keys::REFERENCES),
            Err(MetricError::MissingResource(ref key)) if key == "references"
        ));
    }
}
