//! Evaluation units: one metric applied to one model on one dataset.

use crate::entity::{Dataset, Model};
use crate::error::ConfigError;
use crate::metric::Metric;
use std::fmt;
use std::sync::Arc;

/// Separator used to build unit prefixes and output filenames.
///
/// Model, dataset and metric names must not contain it.
pub const SEPARATOR: char = '-';

/// A (metric, model, dataset) triple with a precomputed output prefix.
#[derive(Debug, Clone)]
pub struct EvaluationUnit {
    metric: Arc<dyn Metric>,
    model: Arc<Model>,
    dataset: Arc<Dataset>,
    prefix: String,
}

impl EvaluationUnit {
    /// Build a unit.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DatasetMismatch`] if `model.trained_on != dataset.name`
    /// - [`ConfigError::ReservedSeparator`] if any name contains [`SEPARATOR`]
    pub fn new(
        metric: Arc<dyn Metric>,
        model: Arc<Model>,
        dataset: Arc<Dataset>,
    ) -> Result<Self, ConfigError> {
        if model.trained_on != dataset.name {
            return Err(ConfigError::DatasetMismatch {
                model: model.name.clone(),
                dataset: dataset.name.clone(),
            });
        }

        let fullname = metric.fullname();
        for (kind, name) in [
            ("model", model.name.as_str()),
            ("dataset", dataset.name.as_str()),
            ("metric", fullname.as_str()),
        ] {
            if name.contains(SEPARATOR) {
                return Err(ConfigError::ReservedSeparator {
                    kind,
                    name: name.to_string(),
                    separator: SEPARATOR,
                });
            }
        }

        let prefix = format!(
            "{}{sep}{}{sep}{}",
            model.name,
            dataset.name,
            fullname,
            sep = SEPARATOR
        );

        Ok(Self {
            metric,
            model,
            dataset,
            prefix,
        })
    }

    pub fn metric(&self) -> &Arc<dyn Metric> {
        &self.metric
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// `<model>-<dataset>-<metric fullname>`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Display for EvaluationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}
