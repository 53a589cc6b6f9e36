use std::path::PathBuf;
use thiserror::Error;

/// Errors detected while resolving a run configuration.
///
/// These indicate a mistake in the configuration (or in a metric wrapper's
/// declaration) and are reported before any evaluation unit runs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No metric with this name is registered
    #[error("No such metric: {0}")]
    UnknownMetric(String),

    /// A metric's configuration block could not be parsed
    #[error("Invalid configuration for metric '{metric}': {message}")]
    InvalidMetricConfig { metric: String, message: String },

    /// A model claims to be trained on a dataset that is not declared
    #[error("Model '{model}' trained on unknown dataset '{dataset}'")]
    UnknownDataset { model: String, dataset: String },

    /// A unit was built from a model and a dataset it was not trained on
    #[error("Model '{model}' was not trained on dataset '{dataset}'")]
    DatasetMismatch { model: String, dataset: String },

    /// A name contains the reserved separator
    #[error("{kind} name '{name}' contains the reserved separator '{separator}'")]
    ReservedSeparator {
        kind: &'static str,
        name: String,
        separator: char,
    },

    /// A response path does not follow `<dataset>/<model>/<file>`
    #[error("Cannot infer model from path {0:?}: expected <dataset>/<model>/<file>")]
    InvalidModelPath(PathBuf),

    /// A metric declares a resource the loader cannot resolve
    #[error("Metric '{metric}' has a malformed requirement '{key}': {message}")]
    MalformedRequirement {
        metric: String,
        key: String,
        message: String,
    },

    /// The config file extension is not supported
    #[error("Unsupported config format: {0:?} (convert it to .json, .toml, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),

    /// The config file could not be read
    #[error("Failed to read config {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    /// The config file could not be parsed
    #[error("Failed to parse config {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidMetricConfig`].
    pub fn invalid_metric(metric: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidMetricConfig {
            metric: metric.into(),
            message: message.to_string(),
        }
    }
}

/// Errors raised while resolving or loading a single resource.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// The source for this key has no value (e.g. a model without `weights`)
    #[error("No value for resource '{key}' (source: {source_name})")]
    MissingSource { key: String, source_name: String },

    /// The key has no default source and the requirement supplied none
    #[error("Unknown resource key '{0}'")]
    UnknownKey(String),

    /// Reading the file failed
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its content is not in the expected format
    #[error("Malformed resource {path:?}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// A file-based format was applied to a literal value
    #[error("Resource '{key}' needs a file path, got literal '{value}'")]
    NotAPath { key: String, value: String },
}

/// Errors raised by a metric computation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MetricError {
    /// The metric asked for a resource that was not loaded
    #[error("Missing resource '{0}'")]
    MissingResource(String),

    /// A resource was loaded in a different shape than the metric expects
    #[error("Resource '{key}' is not {expected}")]
    ResourceKind { key: String, expected: &'static str },

    /// Numerical or input edge case the metric cannot handle
    #[error("Computation failed: {0}")]
    Computation(String),

    /// An external tool failed or produced unusable output
    #[error("External command '{command}' failed: {message}")]
    External { command: String, message: String },
}
