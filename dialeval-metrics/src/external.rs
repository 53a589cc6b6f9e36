//! Metrics computed by an external program.
//!
//! The command is configured as `[program, args...]`. Arguments may contain
//! the placeholders `{responses}`, `{references}`, `{contexts}` and
//! `{weights}`, which are replaced by the resolved file paths. The program
//! prints whitespace-separated scores on stdout.

use crate::params::parse_block;
use dialeval_core::{
    keys, ConfigError, Dataset, Format, Metric, MetricError, MetricResult, Model, Requirement,
    Resources, Score,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Command;
use std::sync::Arc;

/// The tool-backed metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Meteor,
    Adem,
    Perplexity,
}

impl ExternalKind {
    pub fn name(self) -> &'static str {
        match self {
            ExternalKind::Meteor => "meteor",
            ExternalKind::Adem => "adem",
            ExternalKind::Perplexity => "perplexity",
        }
    }

    /// `(placeholder, resource key)` pairs this metric provides.
    fn placeholders(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ExternalKind::Meteor => &[
                ("responses", keys::RAW_RESPONSES),
                ("references", keys::RAW_REFERENCES),
            ],
            ExternalKind::Adem => &[
                ("contexts", keys::RAW_CONTEXTS),
                ("responses", keys::RAW_RESPONSES),
                ("references", keys::RAW_REFERENCES),
            ],
            ExternalKind::Perplexity => &[
                ("weights", keys::WEIGHTS),
                ("references", keys::REFERENCES),
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalConfig {
    command: Vec<String>,
}

/// Build the registry factory for one tool-backed metric.
pub fn factory(
    kind: ExternalKind,
) -> impl Fn(&serde_json::Value) -> Result<Vec<Arc<dyn Metric>>, ConfigError> + Send + Sync + 'static
{
    move |block| {
        let config: ExternalConfig = parse_block(kind.name(), block)?;
        if config.command.is_empty() {
            return Err(ConfigError::invalid_metric(
                kind.name(),
                "`command` must name a program",
            ));
        }
        Ok(vec![Arc::new(ExternalMetric::new(kind, config.command)) as Arc<dyn Metric>])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalMetric {
    kind: ExternalKind,
    command: Vec<String>,
}

impl ExternalMetric {
    pub fn new(kind: ExternalKind, command: Vec<String>) -> Self {
        Self { kind, command }
    }

    fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    fn run(&self, resources: &Resources) -> Result<Vec<f64>, MetricError> {
        let mut values = BTreeMap::new();
        for (placeholder, key) in self.kind.placeholders() {
            values.insert(*placeholder, resources.path(key)?.display().to_string());
        }
        let args: Vec<String> = self
            .command
            .get(1..)
            .unwrap_or_default()
            .iter()
            .map(|arg| substitute(arg, &values))
            .collect();

        log::debug!("Running {} {:?}", self.program(), args);
        let output = Command::new(self.program())
            .args(&args)
            .output()
            .map_err(|e| self.failure(format!("failed to spawn: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("{}: {}", output.status, stderr.trim())));
        }

        parse_scores(&String::from_utf8_lossy(&output.stdout)).map_err(|e| self.failure(e))
    }

    fn failure(&self, message: String) -> MetricError {
        MetricError::External {
            command: self.program().to_string(),
            message,
        }
    }
}

impl Metric for ExternalMetric {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({ "command": self.command })
    }

    fn requires(&self) -> Vec<Requirement> {
        self.kind
            .placeholders()
            .iter()
            .map(|(_, key)| match *key {
                keys::WEIGHTS => Requirement::key(*key),
                _ => Requirement::with_format(*key, Format::Path),
            })
            .collect()
    }

    fn compatible(&self, model: &Model, _dataset: &Dataset) -> bool {
        match self.kind {
            ExternalKind::Perplexity => model.weights.is_some(),
            ExternalKind::Meteor | ExternalKind::Adem => true,
        }
    }

    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
        let scores = self.run(resources)?;
        match self.kind {
            ExternalKind::Perplexity => match scores.as_slice() {
                [value] => Ok(MetricResult::Scalar(Score::Number(*value))),
                other => Err(self.failure(format!("expected one value, got {}", other.len()))),
            },
            ExternalKind::Meteor | ExternalKind::Adem => Ok(MetricResult::from_values(scores)),
        }
    }
}

/// Replace every `{name}` in `arg` with its value.
pub fn substitute(arg: &str, values: &BTreeMap<&str, String>) -> String {
    values.iter().fold(arg.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

/// Parse whitespace-separated floats.
pub fn parse_scores(stdout: &str) -> Result<Vec<f64>, String> {
    stdout
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| format!("unparsable output '{}'", token))
        })
        .collect()
}
