//! Scores over N-best hypothesis sets against multi-reference sets.
//!
//! For every example the metric computes three numbers from smoothed
//! BLEU-2 similarities:
//!
//! - `max_bleu`: mean over hypotheses of the best match among references
//! - `mds`: one minus the mean BLEU between pairs of distinct hypotheses
//! - `pds`: share of references that are the best match of some hypothesis
//!
//! Each instance keeps one of the three.

use crate::bleu::sentence_bleu;
use crate::params::parse_block;
use dialeval_core::{
    keys, ConfigError, Dataset, Fields, Format, Metric, MetricError, MetricResult, Model,
    Requirement, Resources, Score, Source, SourceValue,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

const BLEU_ORDER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    MaxBleu,
    Mds,
    Pds,
}

impl Variant {
    fn field(self) -> &'static str {
        match self {
            Variant::MaxBleu => "max_bleu",
            Variant::Mds => "mds",
            Variant::Pds => "pds",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LsdsccConfig {
    #[serde(default = "default_variants")]
    variants: Vec<Variant>,
    reference_sets: PathBuf,
}

fn default_variants() -> Vec<Variant> {
    vec![Variant::MaxBleu, Variant::Mds, Variant::Pds]
}

pub fn factory(block: &serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
    let config: LsdsccConfig = parse_block("lsdscc", block)?;
    Ok(config
        .variants
        .into_iter()
        .map(|variant| Arc::new(Lsdscc::new(variant, config.reference_sets.clone())) as Arc<dyn Metric>)
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lsdscc {
    variant: Variant,
    reference_sets: PathBuf,
}

impl Lsdscc {
    pub fn new(variant: Variant, reference_sets: impl Into<PathBuf>) -> Self {
        Self {
            variant,
            reference_sets: reference_sets.into(),
        }
    }
}

impl Metric for Lsdscc {
    fn name(&self) -> &str {
        "lsdscc"
    }

    fn fullname(&self) -> String {
        format!("lsdscc_{}", self.variant.field())
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "variant": self.variant.field(),
            "reference_sets": self.reference_sets
        })
    }

    fn requires(&self) -> Vec<Requirement> {
        vec![
            Requirement::key(keys::HYPOTHESIS_SETS),
            Requirement::with_source(
                keys::REFERENCE_SETS,
                Source::Metric(keys::REFERENCE_SETS.to_string()),
                Some(Format::TokenSets),
            ),
        ]
    }

    fn utterance_field(&self) -> Fields {
        Fields::one(self.variant.field())
    }

    fn system_field(&self) -> Fields {
        Fields::one(self.variant.field())
    }

    fn source(&self, name: &str) -> Option<SourceValue> {
        (name == keys::REFERENCE_SETS).then(|| SourceValue::Path(self.reference_sets.clone()))
    }

    fn compatible(&self, model: &Model, _dataset: &Dataset) -> bool {
        model.multi_responses.is_some()
    }

    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
        let hypothesis_sets = resources.token_sets(keys::HYPOTHESIS_SETS)?;
        let reference_sets = resources.token_sets(keys::REFERENCE_SETS)?;
        if hypothesis_sets.len() != reference_sets.len() {
            return Err(MetricError::Computation(format!(
                "{} hypothesis sets but {} reference sets",
                hypothesis_sets.len(),
                reference_sets.len()
            )));
        }

        let utterance = hypothesis_sets
            .iter()
            .zip(reference_sets)
            .map(|(hyps, refs)| {
                Score::object([
                    ("max_bleu", max_bleu(hyps, refs)),
                    ("mds", mds(hyps)),
                    ("pds", pds(hyps, refs)),
                ])
            })
            .collect();

        Ok(MetricResult::PerExample {
            utterance,
            system: None,
        })
    }
}

fn similarity(a: &[String], b: &[String]) -> f64 {
    sentence_bleu(a, b, BLEU_ORDER, true)
}

/// Index and score of the closest reference.
fn best_reference(hypothesis: &[String], references: &[Vec<String>]) -> Option<(usize, f64)> {
    references
        .iter()
        .map(|r| similarity(hypothesis, r))
        .enumerate()
        .fold(None, |best, (i, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((i, score)),
        })
}

pub fn max_bleu(hypotheses: &[Vec<String>], references: &[Vec<String>]) -> f64 {
    if hypotheses.is_empty() || references.is_empty() {
        return 0.0;
    }
    let total: f64 = hypotheses
        .iter()
        .filter_map(|h| best_reference(h, references))
        .map(|(_, score)| score)
        .sum();
    total / hypotheses.len() as f64
}

pub fn mds(hypotheses: &[Vec<String>]) -> f64 {
    if hypotheses.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in hypotheses.iter().enumerate() {
        for (j, b) in hypotheses.iter().enumerate() {
            if i != j {
                total += similarity(a, b);
                pairs += 1;
            }
        }
    }
    1.0 - total / pairs as f64
}

pub fn pds(hypotheses: &[Vec<String>], references: &[Vec<String>]) -> f64 {
    if references.is_empty() {
        return 0.0;
    }
    let covered: BTreeSet<usize> = hypotheses
        .iter()
        .filter_map(|h| best_reference(h, references))
        .filter(|&(_, score)| score > 0.0)
        .map(|(i, _)| i)
        .collect();
    covered.len() as f64 / references.len() as f64
}
