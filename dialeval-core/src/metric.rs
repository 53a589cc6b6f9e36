//! The metric trait and result shapes.
//!
//! Provides the [`Metric`] trait implemented by every wrapper, plus the
//! [`MetricResult`] / [`Score`] values a computation returns and the
//! [`Fields`] selectors that say which parts of a score are kept.

use crate::entity::{Dataset, Model};
use crate::error::MetricError;
use crate::resource::{Requirement, Resources, SourceValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A single score: a number or a record of named numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Number(f64),
    Object(BTreeMap<String, f64>),
}

impl Score {
    /// Build an object score from `(name, value)` pairs.
    pub fn object<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Score::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// The value, if this is a plain number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Score::Number(value) => Some(*value),
            Score::Object(_) => None,
        }
    }

    /// A named field, if this is an object containing it.
    pub fn field(&self, name: &str) -> Option<f64> {
        match self {
            Score::Number(_) => None,
            Score::Object(fields) => fields.get(name).copied(),
        }
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        Score::Number(value)
    }
}

/// Raw output of [`Metric::compute`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetricResult {
    /// A single corpus-level value with no per-example breakdown
    Scalar(Score),
    /// One score per example, plus an optional corpus-level score.
    ///
    /// When `system` is `None` the exporter uses the mean of the extracted
    /// per-example values.
    PerExample {
        utterance: Vec<Score>,
        system: Option<Score>,
    },
}

impl MetricResult {
    /// Per-example numbers with no system score.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        MetricResult::PerExample {
            utterance: values.into_iter().map(Score::Number).collect(),
            system: None,
        }
    }
}

/// Which part of a [`Score`] to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fields {
    /// Keep the score unchanged
    #[default]
    Whole,
    /// Project a single named field to a number
    One(String),
    /// Project several named fields to a sub-record
    Many(Vec<String>),
}

impl Fields {
    pub fn one(name: impl Into<String>) -> Self {
        Fields::One(name.into())
    }
}

/// A configured metric instance.
///
/// Instances are produced by registry factories and shared across
/// evaluation units, so every method takes `&self`.
///
/// # Example
///
/// ```
/// use dialeval_core::{
///     requires, Metric, MetricError, MetricResult, Requirement, Resources, keys,
/// };
///
/// #[derive(Debug)]
/// struct ResponseCount;
///
/// impl Metric for ResponseCount {
///     fn name(&self) -> &str {
///         "response_count"
///     }
///
///     fn requires(&self) -> Vec<Requirement> {
///         requires(&[keys::RESPONSES])
///     }
///
///     fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
///         let responses = resources.token_lists(keys::RESPONSES)?;
///         Ok(MetricResult::Scalar((responses.len() as f64).into()))
///     }
/// }
/// ```
pub trait Metric: Send + Sync + Debug {
    /// Registry name shared by every instance of this wrapper (e.g. `bleu`).
    fn name(&self) -> &str;

    /// Unique identifier of this instance (e.g. `bleu_4`).
    fn fullname(&self) -> String {
        self.name().to_string()
    }

    /// Parameters recorded in the run manifest.
    fn params(&self) -> serde_json::Value {
        serde_json::Value::Object(Default::default())
    }

    /// Resources the loader must provide to [`Metric::compute`].
    fn requires(&self) -> Vec<Requirement>;

    /// Part of each per-example score to keep.
    fn utterance_field(&self) -> Fields {
        Fields::Whole
    }

    /// Part of the system score to keep.
    fn system_field(&self) -> Fields {
        Fields::Whole
    }

    /// A metric-owned value for [`crate::Source::Metric`] requirements.
    fn source(&self, _name: &str) -> Option<SourceValue> {
        None
    }

    /// Whether this metric can evaluate the given pair.
    fn compatible(&self, _model: &Model, _dataset: &Dataset) -> bool {
        true
    }

    /// Score one model on one dataset.
    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{keys, requires};

    #[derive(Debug)]
    struct Constant;

    impl Metric for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn requires(&self) -> Vec<Requirement> {
            requires(&[keys::RESPONSES])
        }

        fn compute(&self, _resources: &Resources) -> Result<MetricResult, MetricError> {
            Ok(MetricResult::Scalar(Score::Number(1.0)))
        }
    }

    #[test]
    fn test_trait_defaults() {
        let metric = Constant;
        assert_eq!(metric.fullname(), "constant");
        assert_eq!(metric.utterance_field(), Fields::Whole);
        assert_eq!(metric.system_field(), Fields::Whole);
        assert!(metric.source("embeddings").is_none());
        assert!(metric.compatible(
            &Model::new("m", "d", "r.txt"),
            &Dataset::new("d", "c.txt", "ref.txt")
        ));
        assert_eq!(metric.params(), serde_json::json!({}));
    }

    #[test]
    fn test_score_accessors() {
        let score = Score::object([("precision", 0.5), ("recall", 0.25)]);
        assert_eq!(score.field("recall"), Some(0.25));
        assert_eq!(score.field("f1_measure"), None);
        assert_eq!(score.as_number(), None);
        assert_eq!(Score::from(2.0).as_number(), Some(2.0));
    }

    #[test]
    fn test_score_serializes_untagged() {
        let number = serde_json::to_value(Score::Number(0.5)).unwrap();
        assert_eq!(number, serde_json::json!(0.5));

        let object = serde_json::to_value(Score::object([("mean", 1.0)])).unwrap();
        assert_eq!(object, serde_json::json!({"mean": 1.0}));
    }

    #[test]
    fn test_from_values() {
        let result = MetricResult::from_values([1.0, 2.0]);
        assert_eq!(
            result,
            MetricResult::PerExample {
                utterance: vec![Score::Number(1.0), Score::Number(2.0)],
                system: None,
            }
        );
    }
}
