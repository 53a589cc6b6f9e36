//! Distinct-N: the share of distinct n-grams in a response.

use crate::params::{ngram_orders, parse_block, OneOrMany};
use crate::text::ngram_counts;
use dialeval_core::{
    keys, requires, ConfigError, Metric, MetricError, MetricResult, Requirement, Resources,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DistinctConfig {
    n: OneOrMany<usize>,
}

pub fn factory(block: &serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
    let config: DistinctConfig = parse_block("distinct_n", block)?;
    Ok(ngram_orders("distinct_n", config.n)?
        .into_iter()
        .map(|n| Arc::new(DistinctN::new(n)) as Arc<dyn Metric>)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinctN {
    n: usize,
}

impl DistinctN {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Metric for DistinctN {
    fn name(&self) -> &str {
        "distinct_n"
    }

    fn fullname(&self) -> String {
        format!("distinct_{}", self.n)
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({ "n": self.n })
    }

    fn requires(&self) -> Vec<Requirement> {
        requires(&[keys::RESPONSES])
    }

    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
        let responses = resources.token_lists(keys::RESPONSES)?;
        Ok(MetricResult::from_values(
            responses.iter().map(|s| distinct_ratio(s, self.n)),
        ))
    }
}

/// Distinct n-grams divided by the sentence length; 0 for an empty sentence.
pub fn distinct_ratio(sentence: &[String], n: usize) -> f64 {
    if sentence.is_empty() {
        return 0.0;
    }
    ngram_counts(sentence, n).len() as f64 / sentence.len() as f64
}
