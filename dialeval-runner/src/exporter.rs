//! Score records and where they are written.
//!
//! A raw [`MetricResult`] is normalized into a [`ScoreRecord`] by keeping the
//! metric's utterance and system fields, then written as JSON under the save
//! directory. Writes go through a temporary file in the target directory
//! followed by a rename, so a record is either complete or absent.

use crate::resolve::Manifest;
use dialeval_core::{EvaluationUnit, Fields, MetricResult, Score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the run manifest.
pub const MANIFEST_FILE: &str = "config.json";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize score record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A selected field is absent, or a field was selected from a plain number
    #[error("Field '{field}' not found in score {score}")]
    MissingField { field: String, score: String },

    /// Per-example scores mix numbers and records, so no mean can be taken
    #[error("Cannot average scores of mixed shapes")]
    MixedShapes,
}

/// How score files are arranged under the save directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `save_dir/<prefix>.json`
    #[default]
    Flat,
    /// `save_dir/<metric>/<model>/<dataset>/<prefix>.json`
    Nested,
}

/// The persisted result of one evaluation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Per-example values; empty for scalar metrics
    pub utterance: Vec<serde_json::Value>,
    /// Corpus-level value; `null` when undefined
    pub system: serde_json::Value,
    /// Metric instance name
    pub metric: String,
    pub model: String,
    pub dataset: String,
}

/// Writes score records and the run manifest.
#[derive(Debug, Clone)]
pub struct Exporter {
    save_dir: PathBuf,
    layout: Layout,
}

impl Exporter {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            layout: Layout::Flat,
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Where `unit`'s record lives.
    pub fn output_path(&self, unit: &EvaluationUnit) -> PathBuf {
        let file = format!("{}.json", unit.prefix());
        match self.layout {
            Layout::Flat => self.save_dir.join(file),
            Layout::Nested => self
                .save_dir
                .join(unit.metric().fullname())
                .join(&unit.model().name)
                .join(&unit.dataset().name)
                .join(file),
        }
    }

    /// Normalize and write `result`, returning the path written.
    pub fn export_json(
        &self,
        result: &MetricResult,
        unit: &EvaluationUnit,
    ) -> Result<PathBuf, ExportError> {
        let record = process_result(result, unit)?;
        let path = self.output_path(unit);
        write_atomic(&path, &serde_json::to_vec_pretty(&record)?)?;
        Ok(path)
    }

    /// Write the run manifest to `save_dir/config.json`.
    pub fn export_config(&self, manifest: &Manifest) -> Result<PathBuf, ExportError> {
        let path = self.save_dir.join(MANIFEST_FILE);
        write_atomic(&path, &serde_json::to_vec_pretty(manifest)?)?;
        Ok(path)
    }
}

/// Turn a raw result into a record.
pub fn process_result(
    result: &MetricResult,
    unit: &EvaluationUnit,
) -> Result<ScoreRecord, ExportError> {
    let metric = unit.metric();
    let (utterance, system) = match result {
        MetricResult::PerExample { utterance, system } => {
            let utterance_field = metric.utterance_field();
            let extracted = utterance
                .iter()
                .map(|score| extract_fields(score, &utterance_field))
                .collect::<Result<Vec<_>, _>>()?;
            let system = match system {
                Some(score) => Some(extract_fields(score, &metric.system_field())?),
                None => mean(&extracted)?,
            };
            (extracted, system)
        }
        MetricResult::Scalar(score) => (
            Vec::new(),
            Some(extract_fields(score, &metric.system_field())?),
        ),
    };

    Ok(ScoreRecord {
        utterance: utterance.iter().map(score_to_json).collect(),
        system: system.as_ref().map_or(serde_json::Value::Null, score_to_json),
        metric: metric.fullname(),
        model: unit.model().name.clone(),
        dataset: unit.dataset().name.clone(),
    })
}

/// Keep the selected part of a score.
pub fn extract_fields(score: &Score, fields: &Fields) -> Result<Score, ExportError> {
    let missing = |field: &str| ExportError::MissingField {
        field: field.to_string(),
        score: format!("{:?}", score),
    };

    match fields {
        Fields::Whole => Ok(score.clone()),
        Fields::One(field) => score.field(field).map(Score::Number).ok_or_else(|| missing(field)),
        Fields::Many(names) => names
            .iter()
            .map(|name| {
                score
                    .field(name)
                    .map(|value| (name.clone(), value))
                    .ok_or_else(|| missing(name))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Score::Object),
    }
}

/// Arithmetic mean; field-wise for records. `None` for no scores.
pub fn mean(scores: &[Score]) -> Result<Option<Score>, ExportError> {
    if scores.is_empty() {
        return Ok(None);
    }

    if scores.iter().all(|s| matches!(s, Score::Number(_))) {
        let total: f64 = scores.iter().filter_map(Score::as_number).sum();
        return Ok(Some(Score::Number(total / scores.len() as f64)));
    }

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for score in scores {
        let Score::Object(fields) = score else {
            return Err(ExportError::MixedShapes);
        };
        for (name, value) in fields {
            let entry = sums.entry(name.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    Ok(Some(Score::Object(
        sums.into_iter()
            .map(|(name, (sum, count))| (name, sum / count as f64))
            .collect(),
    )))
}

fn number_to_json(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Non-finite numbers become `null`.
fn score_to_json(score: &Score) -> serde_json::Value {
    match score {
        Score::Number(value) => number_to_json(*value),
        Score::Object(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), number_to_json(*value)))
                .collect(),
        ),
    }
}

/// Write `bytes` to `path` via a temporary file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_error)?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(bytes).map_err(io_error)?;
    file.flush().map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}
