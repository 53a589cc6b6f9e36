//! ROUGE-N, ROUGE-L and ROUGE-W.
//!
//! Every example is scored as a `{precision, recall, f1_measure}` record and
//! only `f1_measure` is kept. ROUGE-N also reports a corpus score from pooled
//! n-gram counts; L and W leave the system score to the exporter's mean.

use crate::bleu::check_aligned;
use crate::params::{ngram_orders, parse_block, OneOrMany};
use crate::text::{clipped_overlap, ngram_total};
use dialeval_core::{
    keys, requires, ConfigError, Fields, Metric, MetricError, MetricResult, Requirement,
    Resources, Score,
};
use serde::Deserialize;
use std::sync::Arc;

const F1: &str = "f1_measure";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Variant {
    RougeN,
    RougeL,
    RougeW,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RougeConfig {
    #[serde(default = "default_variants")]
    variants: Vec<Variant>,
    #[serde(default = "default_n")]
    n: OneOrMany<usize>,
    #[serde(default = "default_alpha")]
    alpha: f64,
    #[serde(default = "default_weight")]
    weight: f64,
}

fn default_variants() -> Vec<Variant> {
    vec![Variant::RougeN, Variant::RougeL, Variant::RougeW]
}

fn default_n() -> OneOrMany<usize> {
    OneOrMany::Many(vec![1, 2])
}

fn default_alpha() -> f64 {
    0.5
}

fn default_weight() -> f64 {
    1.2
}

/// Registry factory.
pub fn factory(block: &serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
    let config: RougeConfig = parse_block("rouge", block)?;
    if !(0.0..=1.0).contains(&config.alpha) {
        return Err(ConfigError::invalid_metric("rouge", "`alpha` must be in [0, 1]"));
    }
    if config.weight <= 1.0 {
        return Err(ConfigError::invalid_metric("rouge", "`weight` must be greater than 1"));
    }

    let mut metrics: Vec<Arc<dyn Metric>> = Vec::new();
    for variant in &config.variants {
        match variant {
            Variant::RougeN => {
                for n in ngram_orders("rouge", config.n.clone())? {
                    metrics.push(Arc::new(Rouge::new(RougeKind::N(n), config.alpha)));
                }
            }
            Variant::RougeL => metrics.push(Arc::new(Rouge::new(RougeKind::L, config.alpha))),
            Variant::RougeW => metrics.push(Arc::new(Rouge::new(
                RougeKind::W(config.weight),
                config.alpha,
            ))),
        }
    }
    Ok(metrics)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RougeKind {
    /// n-gram overlap
    N(usize),
    /// Longest common subsequence
    L,
    /// Weighted LCS with `f(k) = k^weight`
    W(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rouge {
    kind: RougeKind,
    alpha: f64,
}

impl Rouge {
    pub fn new(kind: RougeKind, alpha: f64) -> Self {
        Self { kind, alpha }
    }

    fn score_pair(&self, hypothesis: &[String], reference: &[String]) -> Prf {
        match self.kind {
            RougeKind::N(n) => {
                let overlap = clipped_overlap(hypothesis, reference, n) as f64;
                Prf::new(
                    ratio(overlap, ngram_total(hypothesis.len(), n) as f64),
                    ratio(overlap, ngram_total(reference.len(), n) as f64),
                    self.alpha,
                )
            }
            RougeKind::L => {
                let lcs = lcs_len(hypothesis, reference) as f64;
                Prf::new(
                    ratio(lcs, hypothesis.len() as f64),
                    ratio(lcs, reference.len() as f64),
                    self.alpha,
                )
            }
            RougeKind::W(weight) => {
                let f = |k: f64| k.powf(weight);
                let f_inv = |x: f64| x.powf(1.0 / weight);
                let wlcs = wlcs(hypothesis, reference, weight);
                Prf::new(
                    f_inv(ratio(wlcs, f(hypothesis.len() as f64))),
                    f_inv(ratio(wlcs, f(reference.len() as f64))),
                    self.alpha,
                )
            }
        }
    }

    fn pooled(&self, n: usize, hypotheses: &[Vec<String>], references: &[Vec<String>]) -> Prf {
        let (mut overlap, mut hyp_total, mut ref_total) = (0usize, 0usize, 0usize);
        for (h, r) in hypotheses.iter().zip(references) {
            overlap += clipped_overlap(h, r, n);
            hyp_total += ngram_total(h.len(), n);
            ref_total += ngram_total(r.len(), n);
        }
        Prf::new(
            ratio(overlap as f64, hyp_total as f64),
            ratio(overlap as f64, ref_total as f64),
            self.alpha,
        )
    }
}

impl Metric for Rouge {
    fn name(&self) -> &str {
        "rouge"
    }

    fn fullname(&self) -> String {
        match self.kind {
            RougeKind::N(n) => format!("rouge_{}", n),
            RougeKind::L => "rouge_l".to_string(),
            RougeKind::W(_) => "rouge_w".to_string(),
        }
    }

    fn params(&self) -> serde_json::Value {
        match self.kind {
            RougeKind::N(n) => serde_json::json!({ "variant": "rouge_n", "n": n, "alpha": self.alpha }),
            RougeKind::L => serde_json::json!({ "variant": "rouge_l", "alpha": self.alpha }),
            RougeKind::W(weight) => serde_json::json!({
                "variant": "rouge_w",
                "alpha": self.alpha,
                "weight": weight
            }),
        }
    }

    fn requires(&self) -> Vec<Requirement> {
        requires(&[keys::RESPONSES, keys::REFERENCES])
    }

    fn utterance_field(&self) -> Fields {
        Fields::one(F1)
    }

    fn system_field(&self) -> Fields {
        Fields::one(F1)
    }

    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
        let hypotheses = resources.token_lists(keys::RESPONSES)?;
        let references = resources.token_lists(keys::REFERENCES)?;
        check_aligned(hypotheses.len(), references.len())?;

        let utterance = hypotheses
            .iter()
            .zip(references)
            .map(|(h, r)| self.score_pair(h, r).into_score())
            .collect();
        let system = match self.kind {
            RougeKind::N(n) => Some(self.pooled(n, hypotheses, references).into_score()),
            RougeKind::L | RougeKind::W(_) => None,
        };

        Ok(MetricResult::PerExample { utterance, system })
    }
}

#[derive(Debug, Clone, Copy)]
struct Prf {
    precision: f64,
    recall: f64,
    f1_measure: f64,
}

impl Prf {
    fn new(precision: f64, recall: f64, alpha: f64) -> Self {
        let f1_measure = if precision == 0.0 || recall == 0.0 {
            0.0
        } else {
            precision * recall / ((1.0 - alpha) * precision + alpha * recall)
        };
        Self {
            precision,
            recall,
            f1_measure,
        }
    }

    fn into_score(self) -> Score {
        Score::object([
            ("precision", self.precision),
            ("recall", self.recall),
            (F1, self.f1_measure),
        ])
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Length of the longest common subsequence.
pub fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            current[j + 1] = if x == y {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Weighted LCS score, rewarding consecutive matches.
pub fn wlcs(a: &[String], b: &[String], weight: f64) -> f64 {
    let f = |k: f64| k.powf(weight);
    let cols = b.len() + 1;
    let mut score = vec![0.0f64; (a.len() + 1) * cols];
    let mut run = vec![0usize; (a.len() + 1) * cols];

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let here = i * cols + j;
            if a[i - 1] == b[j - 1] {
                let diag = (i - 1) * cols + (j - 1);
                let k = run[diag] as f64;
                score[here] = score[diag] + f(k + 1.0) - f(k);
                run[here] = run[diag] + 1;
            } else {
                let up = score[(i - 1) * cols + j];
                let left = score[i * cols + (j - 1)];
                score[here] = up.max(left);
                run[here] = 0;
            }
        }
    }
    score[a.len() * cols + b.len()]
}
