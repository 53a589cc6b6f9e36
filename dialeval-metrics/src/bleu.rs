//! BLEU with uniform n-gram weights and optional add-epsilon smoothing.

use crate::params::{ngram_orders, parse_block, OneOrMany};
use crate::text::{clipped_overlap, ngram_total};
use dialeval_core::{
    keys, requires, ConfigError, Metric, MetricError, MetricResult, Requirement, Resources, Score,
};
use serde::Deserialize;
use std::sync::Arc;

/// Numerator added to zero precisions when smoothing.
const EPSILON: f64 = 0.1;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BleuConfig {
    n: OneOrMany<usize>,
    #[serde(default = "default_smoothing")]
    smoothing: bool,
}

fn default_smoothing() -> bool {
    true
}

/// Registry factory: one instance per requested order.
pub fn factory(block: &serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
    let config: BleuConfig = parse_block("bleu", block)?;
    let smoothing = config.smoothing;
    Ok(ngram_orders("bleu", config.n)?
        .into_iter()
        .map(|n| Arc::new(Bleu::new(n, smoothing)) as Arc<dyn Metric>)
        .collect())
}

/// BLEU-N over `responses` against `references`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bleu {
    n: usize,
    smoothing: bool,
}

impl Bleu {
    pub fn new(n: usize, smoothing: bool) -> Self {
        Self { n, smoothing }
    }
}

impl Metric for Bleu {
    fn name(&self) -> &str {
        "bleu"
    }

    fn fullname(&self) -> String {
        format!("bleu_{}", self.n)
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({ "n": self.n, "smoothing": self.smoothing })
    }

    fn requires(&self) -> Vec<Requirement> {
        requires(&[keys::RESPONSES, keys::REFERENCES])
    }

    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
        let hypotheses = resources.token_lists(keys::RESPONSES)?;
        let references = resources.token_lists(keys::REFERENCES)?;
        check_aligned(hypotheses.len(), references.len())?;

        let utterance = hypotheses
            .iter()
            .zip(references)
            .map(|(h, r)| Score::Number(sentence_bleu(h, r, self.n, self.smoothing)))
            .collect();
        let system = corpus_bleu(hypotheses, references, self.n, self.smoothing);

        Ok(MetricResult::PerExample {
            utterance,
            system: Some(Score::Number(system)),
        })
    }
}

pub(crate) fn check_aligned(hypotheses: usize, references: usize) -> Result<(), MetricError> {
    if hypotheses != references {
        return Err(MetricError::Computation(format!(
            "{} responses but {} references",
            hypotheses, references
        )));
    }
    Ok(())
}

/// BLEU of a single hypothesis against a single reference.
pub fn sentence_bleu(hypothesis: &[String], reference: &[String], n: usize, smoothing: bool) -> f64 {
    corpus_bleu(
        std::slice::from_ref(&hypothesis.to_vec()),
        std::slice::from_ref(&reference.to_vec()),
        n,
        smoothing,
    )
}

/// Corpus BLEU with one reference per hypothesis.
///
/// Modified precisions are pooled over the corpus before the geometric mean.
/// Without smoothing any zero precision yields 0.
pub fn corpus_bleu(
    hypotheses: &[Vec<String>],
    references: &[Vec<String>],
    n: usize,
    smoothing: bool,
) -> f64 {
    if n == 0 {
        return 0.0;
    }

    let mut numerators = vec![0usize; n];
    let mut denominators = vec![0usize; n];
    let mut hyp_len = 0usize;
    let mut ref_len = 0usize;

    for (hypothesis, reference) in hypotheses.iter().zip(references) {
        for order in 1..=n {
            numerators[order - 1] += clipped_overlap(hypothesis, reference, order);
            denominators[order - 1] += ngram_total(hypothesis.len(), order).max(1);
        }
        hyp_len += hypothesis.len();
        ref_len += reference.len();
    }

    if numerators[0] == 0 {
        return 0.0;
    }
    if !smoothing && numerators.iter().any(|&count| count == 0) {
        return 0.0;
    }

    let weight = 1.0 / n as f64;
    let log_sum: f64 = numerators
        .iter()
        .zip(&denominators)
        .map(|(&num, &den)| {
            let num = if num == 0 { EPSILON } else { num as f64 };
            weight * (num / den as f64).ln()
        })
        .sum();

    brevity_penalty(hyp_len, ref_len) * log_sum.exp()
}

fn brevity_penalty(hyp_len: usize, ref_len: usize) -> f64 {
    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}
