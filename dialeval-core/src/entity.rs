//! Models and datasets under evaluation.
//!
//! Both are plain records built once when the configuration is loaded and
//! never mutated afterwards.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A trained response-generation system and the location of its output.
///
/// # Example
///
/// ```
/// use dialeval_core::Model;
///
/// let model = Model::new("hred", "ubuntu", "/results/ubuntu/hred/output.txt")
///     .with_weights("/checkpoints/hred_model.npz");
/// assert_eq!(model.trained_on, "ubuntu");
/// assert!(model.multi_responses.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier
    pub name: String,

    /// Name of the dataset this model was trained (and is evaluated) on
    pub trained_on: String,

    /// Generated responses, one line per test example
    pub responses: PathBuf,

    /// N-best responses, one TAB-separated line per test example
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_responses: Option<PathBuf>,

    /// Checkpoint used by perplexity-style metrics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<PathBuf>,
}

impl Model {
    /// Create a model with only the required fields.
    pub fn new(
        name: impl Into<String>,
        trained_on: impl Into<String>,
        responses: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            trained_on: trained_on.into(),
            responses: responses.into(),
            multi_responses: None,
            weights: None,
        }
    }

    /// Infer a model from the path of its response file.
    ///
    /// The path is expected to look like `<root>/<dataset>/<model>/<file>`;
    /// both names are lowercased.
    ///
    /// ```
    /// use dialeval_core::Model;
    ///
    /// let model = Model::from_output_path("/results/Ubuntu/VHRED/output.txt").unwrap();
    /// assert_eq!(model.name, "vhred");
    /// assert_eq!(model.trained_on, "ubuntu");
    /// ```
    pub fn from_output_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let dir_name = |p: Option<&Path>| {
            p.and_then(Path::file_name)
                .and_then(|s| s.to_str())
                .map(str::to_lowercase)
        };

        let model_dir = path.parent();
        let dataset_dir = model_dir.and_then(Path::parent);

        match (dir_name(model_dir), dir_name(dataset_dir)) {
            (Some(name), Some(trained_on)) => Ok(Self::new(name, trained_on, path)),
            _ => Err(ConfigError::InvalidModelPath(path.to_path_buf())),
        }
    }

    /// Set the N-best response file.
    #[must_use]
    pub fn with_multi_responses(mut self, path: impl Into<PathBuf>) -> Self {
        self.multi_responses = Some(path.into());
        self
    }

    /// Set the checkpoint file.
    #[must_use]
    pub fn with_weights(mut self, path: impl Into<PathBuf>) -> Self {
        self.weights = Some(path.into());
        self
    }
}

/// A held-out evaluation corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset identifier
    pub name: String,

    /// Dialogue contexts, one line per test example
    #[serde(alias = "context")]
    pub contexts: PathBuf,

    /// Reference responses, one line per test example
    #[serde(alias = "reference")]
    pub references: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_dialogues: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_set: Option<PathBuf>,
}

impl Dataset {
    /// Create a dataset with only the required fields.
    pub fn new(
        name: impl Into<String>,
        contexts: impl Into<PathBuf>,
        references: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            contexts: contexts.into(),
            references: references.into(),
            test_dialogues: None,
            vocabulary: None,
            train_set: None,
        }
    }

    /// Set the vocabulary file.
    #[must_use]
    pub fn with_vocabulary(mut self, path: impl Into<PathBuf>) -> Self {
        self.vocabulary = Some(path.into());
        self
    }

    /// Set the training corpus.
    #[must_use]
    pub fn with_train_set(mut self, path: impl Into<PathBuf>) -> Self {
        self.train_set = Some(path.into());
        self
    }

    /// Set the raw test dialogues.
    #[must_use]
    pub fn with_test_dialogues(mut self, path: impl Into<PathBuf>) -> Self {
        self.test_dialogues = Some(path.into());
        self
    }
}
