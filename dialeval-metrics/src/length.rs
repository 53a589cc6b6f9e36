use crate::params::parse_block;
use dialeval_core::{
    keys, requires, ConfigError, Metric, MetricError, MetricResult, Requirement, Resources,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LengthConfig {}

pub fn factory(block: &serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
    let _: LengthConfig = parse_block("utterance_len", block)?;
    Ok(vec![Arc::new(UtteranceLen)])
}

/// Number of tokens in each response.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtteranceLen;

impl Metric for UtteranceLen {
    fn name(&self) -> &str {
        "utterance_len"
    }

    fn requires(&self) -> Vec<Requirement> {
        requires(&[keys::RESPONSES])
    }

    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
        let responses = resources.token_lists(keys::RESPONSES)?;
        Ok(MetricResult::from_values(
            responses.iter().map(|tokens| tokens.len() as f64),
        ))
    }
}
