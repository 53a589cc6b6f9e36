//! Metric registry.
//!
//! The registry stores metric factories rather than instances. A factory
//! receives one configuration block and returns every instance it describes
//! (e.g. `{"n": [1, 2]}` for `bleu` yields `bleu_1` and `bleu_2`).
//!
//! # Example
//!
//! ```
//! use dialeval_core::{MetricRegistry, Metric, MetricError, MetricResult, Requirement, Resources};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Noop;
//!
//! impl Metric for Noop {
//!     fn name(&self) -> &str { "noop" }
//!     fn requires(&self) -> Vec<Requirement> { Vec::new() }
//!     fn compute(&self, _: &Resources) -> Result<MetricResult, MetricError> {
//!         Ok(MetricResult::from_values([]))
//!     }
//! }
//!
//! let mut registry = MetricRegistry::new();
//! registry.register("noop", |_block| Ok(vec![Arc::new(Noop) as Arc<dyn Metric>]));
//!
//! let metrics = registry.parse("noop", &serde_json::json!({})).unwrap();
//! assert_eq!(metrics[0].fullname(), "noop");
//! ```

use crate::error::ConfigError;
use crate::metric::Metric;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Factory function type for creating metric instances from a config block.
pub type MetricFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> + Send + Sync>;

/// Registry of available metrics, keyed by name.
#[derive(Clone)]
pub struct MetricRegistry {
    factories: HashMap<String, MetricFactory>,
}

impl MetricRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a metric factory. A later registration replaces an earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Build the instances described by one configuration block.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownMetric`] when `name` is not registered, or
    /// whatever the factory returns for a bad block.
    pub fn parse(
        &self,
        name: &str,
        block: &serde_json::Value,
    ) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownMetric(name.to_string()))?;
        factory(block)
    }

    /// List all registered metric names (sorted alphabetically).
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("metrics", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;
    use crate::metric::MetricResult;
    use crate::resource::{Requirement, Resources};

    #[derive(Debug)]
    struct Ngram(u64);

    impl Metric for Ngram {
        fn name(&self) -> &str {
            "ngram"
        }

        fn fullname(&self) -> String {
            format!("ngram_{}", self.0)
        }

        fn requires(&self) -> Vec<Requirement> {
            Vec::new()
        }

        fn compute(&self, _resources: &Resources) -> Result<MetricResult, MetricError> {
            Ok(MetricResult::from_values([]))
        }
    }

    fn ngram_factory(block: &serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
        let ns = block
            .get("n")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ConfigError::invalid_metric("ngram", "missing `n`"))?;
        Ok(ns
            .iter()
            .filter_map(|n| n.as_u64())
            .map(|n| Arc::new(Ngram(n)) as Arc<dyn Metric>)
            .collect())
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = MetricRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_register_and_parse() {
        let mut registry = MetricRegistry::new();
        registry.register("ngram", ngram_factory);

        assert!(registry.contains("ngram"));
        let metrics = registry
            .parse("ngram", &serde_json::json!({"n": [1, 3]}))
            .unwrap();
        let names: Vec<_> = metrics.iter().map(|m| m.fullname()).collect();
        assert_eq!(names, vec!["ngram_1", "ngram_3"]);
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut registry = MetricRegistry::new();
        registry.register("ngram", ngram_factory);

        let result = registry.parse("ngram", &serde_json::json!({}));
        assert!(matches!(result, Err(ConfigError::InvalidMetricConfig { .. })));
    }

    #[test]
    fn test_unknown_metric() {
        let registry = MetricRegistry::new();
        let result = registry.parse("blue", &serde_json::json!({}));
        assert!(matches!(result, Err(ConfigError::UnknownMetric(ref name)) if name == "blue"));
    }

    #[test]
    fn test_list_sorted() {
        let mut registry = MetricRegistry::new();
        registry.register("rouge", ngram_factory);
        registry.register("bleu", ngram_factory);
        registry.register("meteor", ngram_factory);
        assert_eq!(registry.list(), vec!["bleu", "meteor", "rouge"]);
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = MetricRegistry::new();
        registry.register("ngram", |_| Ok(Vec::new()));
        registry.register("ngram", ngram_factory);

        assert_eq!(registry.len(), 1);
        let metrics = registry
            .parse("ngram", &serde_json::json!({"n": [2]}))
            .unwrap();
        assert_eq!(metrics.len(), 1);
    }
}
