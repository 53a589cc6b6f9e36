//! Helpers for parsing metric configuration blocks.

use dialeval_core::ConfigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// A parameter given either as a single value or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Deserialize a config block, treating `null` as an empty block.
pub(crate) fn parse_block<T: DeserializeOwned>(
    metric: &str,
    block: &serde_json::Value,
) -> Result<T, ConfigError> {
    let block = match block {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(block).map_err(|e| ConfigError::invalid_metric(metric, e))
}

/// Parse an n-gram order list, rejecting zero and empty lists.
pub(crate) fn ngram_orders(metric: &str, n: OneOrMany<usize>) -> Result<Vec<usize>, ConfigError> {
    let orders = n.into_vec();
    if orders.is_empty() {
        return Err(ConfigError::invalid_metric(metric, "`n` must not be empty"));
    }
    if orders.contains(&0) {
        return Err(ConfigError::invalid_metric(metric, "`n` must be at least 1"));
    }
    Ok(orders)
}
