//! Embedding-based similarity: vector average, vector extrema and greedy
//! matching.
//!
//! Words missing from the embedding table are ignored. A sentence with no
//! known words scores 0.

use crate::bleu::check_aligned;
use crate::params::parse_block;
use dialeval_core::{
    keys, requires, ConfigError, Embeddings, Fields, Metric, MetricError, MetricResult,
    Requirement, Resources, Score, SourceValue,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    VectorAverage,
    VectorExtrema,
    GreedyMatching,
}

impl Variant {
    fn suffix(self) -> &'static str {
        match self {
            Variant::VectorAverage => "average",
            Variant::VectorExtrema => "extrema",
            Variant::GreedyMatching => "greedy",
        }
    }

    fn config_name(self) -> &'static str {
        match self {
            Variant::VectorAverage => "vector_average",
            Variant::VectorExtrema => "vector_extrema",
            Variant::GreedyMatching => "greedy_matching",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmbeddingConfig {
    #[serde(default = "default_variants")]
    variants: Vec<Variant>,
    embeddings: PathBuf,
}

fn default_variants() -> Vec<Variant> {
    vec![
        Variant::VectorAverage,
        Variant::VectorExtrema,
        Variant::GreedyMatching,
    ]
}

pub fn factory(block: &serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
    let config: EmbeddingConfig = parse_block("embedding_based", block)?;
    Ok(config
        .variants
        .into_iter()
        .map(|variant| {
            Arc::new(EmbeddingBased::new(variant, config.embeddings.clone())) as Arc<dyn Metric>
        })
        .collect())
}

/// One embedding-based similarity over `responses` and `references`.
///
/// The embedding table path is owned by the metric and exposed as the
/// `embeddings` source.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingBased {
    variant: Variant,
    embeddings: PathBuf,
}

impl EmbeddingBased {
    pub fn new(variant: Variant, embeddings: impl Into<PathBuf>) -> Self {
        Self {
            variant,
            embeddings: embeddings.into(),
        }
    }

    fn score_pair(&self, table: &Embeddings, hypothesis: &[String], reference: &[String]) -> f64 {
        match self.variant {
            Variant::VectorAverage => {
                match (sum_vector(table, hypothesis), sum_vector(table, reference)) {
                    (Some(h), Some(r)) => cosine(&h, &r),
                    _ => 0.0,
                }
            }
            Variant::VectorExtrema => {
                match (extrema_vector(table, hypothesis), extrema_vector(table, reference)) {
                    (Some(h), Some(r)) => cosine(&h, &r),
                    _ => 0.0,
                }
            }
            Variant::GreedyMatching => {
                let h = known_vectors(table, hypothesis);
                let r = known_vectors(table, reference);
                if h.is_empty() || r.is_empty() {
                    0.0
                } else {
                    (greedy(&h, &r) + greedy(&r, &h)) / 2.0
                }
            }
        }
    }
}

impl Metric for EmbeddingBased {
    fn name(&self) -> &str {
        "embedding_based"
    }

    fn fullname(&self) -> String {
        format!("embedding_based_{}", self.variant.suffix())
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "variant": self.variant.config_name(),
            "embeddings": self.embeddings
        })
    }

    fn requires(&self) -> Vec<Requirement> {
        requires(&[keys::RESPONSES, keys::REFERENCES, keys::EMBEDDINGS])
    }

    fn system_field(&self) -> Fields {
        Fields::one("mean")
    }

    fn source(&self, name: &str) -> Option<SourceValue> {
        (name == keys::EMBEDDINGS).then(|| SourceValue::Path(self.embeddings.clone()))
    }

    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
        let hypotheses = resources.token_lists(keys::RESPONSES)?;
        let references = resources.token_lists(keys::REFERENCES)?;
        let table = resources.embeddings(keys::EMBEDDINGS)?;
        check_aligned(hypotheses.len(), references.len())?;

        let scores: Vec<f64> = hypotheses
            .iter()
            .zip(references)
            .map(|(h, r)| self.score_pair(table, h, r))
            .collect();
        let (mean, std) = mean_std(&scores);

        Ok(MetricResult::PerExample {
            utterance: scores.into_iter().map(Score::Number).collect(),
            system: Some(Score::object([("mean", mean), ("std", std)])),
        })
    }
}

fn known_vectors<'a>(table: &'a Embeddings, tokens: &[String]) -> Vec<&'a [f32]> {
    tokens.iter().filter_map(|t| table.get(t)).collect()
}

fn sum_vector(table: &Embeddings, tokens: &[String]) -> Option<Vec<f64>> {
    let vectors = known_vectors(table, tokens);
    if vectors.is_empty() {
        return None;
    }
    let mut sum = vec![0.0f64; table.dim()];
    for vector in vectors {
        for (acc, &x) in sum.iter_mut().zip(vector) {
            *acc += f64::from(x);
        }
    }
    Some(sum)
}

/// Per dimension, the value with the largest magnitude.
fn extrema_vector(table: &Embeddings, tokens: &[String]) -> Option<Vec<f64>> {
    let vectors = known_vectors(table, tokens);
    if vectors.is_empty() {
        return None;
    }
    let extrema = (0..table.dim())
        .map(|d| {
            let max = vectors.iter().map(|v| f64::from(v[d])).fold(f64::MIN, f64::max);
            let min = vectors.iter().map(|v| f64::from(v[d])).fold(f64::MAX, f64::min);
            if max >= min.abs() {
                max
            } else {
                min
            }
        })
        .collect();
    Some(extrema)
}

/// Mean over `from` of the best cosine match in `to`.
fn greedy(from: &[&[f32]], to: &[&[f32]]) -> f64 {
    let total: f64 = from
        .iter()
        .map(|a| {
            let a = widen(a);
            to.iter()
                .map(|b| cosine(&a, &widen(b)))
                .fold(f64::MIN, f64::max)
        })
        .sum();
    total / from.len() as f64
}

fn widen(v: &[f32]) -> Vec<f64> {
    v.iter().map(|&x| f64::from(x)).collect()
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
