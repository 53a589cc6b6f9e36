//! # Dialeval Metrics
//!
//! Built-in metric wrappers for dialogue response evaluation.
//!
//! | name | instances |
//! |------|-----------|
//! | `bleu` | `bleu_<n>` |
//! | `rouge` | `rouge_<n>`, `rouge_l`, `rouge_w` |
//! | `distinct_n` | `distinct_<n>` |
//! | `embedding_based` | `embedding_based_average`, `_extrema`, `_greedy` |
//! | `lsdscc` | `lsdscc_max_bleu`, `lsdscc_mds`, `lsdscc_pds` |
//! | `utterance_len` | `utterance_len` |
//! | `meteor`, `adem`, `perplexity` | external programs |
//!
//! ## Example
//!
//! ```
//! let registry = dialeval_metrics::default_registry();
//! let metrics = registry.parse("bleu", &serde_json::json!({"n": [1, 2]})).unwrap();
//!
//! let names: Vec<_> = metrics.iter().map(|m| m.fullname()).collect();
//! assert_eq!(names, vec!["bleu_1", "bleu_2"]);
//! ```

pub mod bleu;
pub mod distinct;
pub mod embedding;
pub mod external;
pub mod length;
pub mod lsdscc;
pub mod params;
pub mod rouge;
pub mod text;

pub use bleu::{corpus_bleu, sentence_bleu, Bleu};
pub use distinct::DistinctN;
pub use embedding::EmbeddingBased;
pub use external::{ExternalKind, ExternalMetric};
pub use length::UtteranceLen;
pub use lsdscc::Lsdscc;
pub use params::OneOrMany;
pub use rouge::{Rouge, RougeKind};

use dialeval_core::MetricRegistry;

/// Register every built-in metric.
pub fn register_builtin_metrics(registry: &mut MetricRegistry) {
    registry.register("bleu", bleu::factory);
    registry.register("rouge", rouge::factory);
    registry.register("distinct_n", distinct::factory);
    registry.register("embedding_based", embedding::factory);
    registry.register("lsdscc", lsdscc::factory);
    registry.register("utterance_len", length::factory);
    registry.register("meteor", external::factory(ExternalKind::Meteor));
    registry.register("adem", external::factory(ExternalKind::Adem));
    registry.register("perplexity", external::factory(ExternalKind::Perplexity));
}

/// A registry holding every built-in metric.
pub fn default_registry() -> MetricRegistry {
    let mut registry = MetricRegistry::new();
    register_builtin_metrics(&mut registry);
    registry
}
