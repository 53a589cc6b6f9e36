//! Reading score records back from an output directory.

use crate::exporter::{ScoreRecord, MANIFEST_FILE};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Score records found under an output directory.
///
/// Works with both the flat and the nested layout: every `.json` file under
/// the directory is read, except the run manifest. Files that are not score
/// records are skipped with a warning.
#[derive(Debug, Clone, Default)]
pub struct ScoreStore {
    records: Vec<ScoreRecord>,
}

impl ScoreStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut records = Vec::new();
        collect(dir.as_ref(), true, &mut records)?;

        // Sort for deterministic ordering
        records.sort_by(|a, b| {
            (&a.model, &a.dataset, &a.metric).cmp(&(&b.model, &b.dataset, &b.metric))
        });
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, model: &str, dataset: &str, metric: &str) -> Option<&ScoreRecord> {
        self.records
            .iter()
            .find(|r| r.model == model && r.dataset == dataset && r.metric == metric)
    }

    /// System scores as one row per (model, dataset) and one column per
    /// metric. Object-valued system scores get one column per field, named
    /// `<metric>.<field>`.
    pub fn summary(&self) -> SummaryTable {
        let mut columns = BTreeSet::new();
        let mut rows: BTreeMap<(String, String), BTreeMap<String, Value>> = BTreeMap::new();

        for record in &self.records {
            let row = rows
                .entry((record.model.clone(), record.dataset.clone()))
                .or_default();
            match &record.system {
                Value::Object(fields) => {
                    for (field, value) in fields {
                        let column = format!("{}.{}", record.metric, field);
                        columns.insert(column.clone());
                        row.insert(column, value.clone());
                    }
                }
                value => {
                    columns.insert(record.metric.clone());
                    row.insert(record.metric.clone(), value.clone());
                }
            }
        }

        SummaryTable {
            columns: columns.into_iter().collect(),
            rows: rows
                .into_iter()
                .map(|((model, dataset), scores)| SummaryRow {
                    model,
                    dataset,
                    scores,
                })
                .collect(),
        }
    }
}

fn collect(dir: &Path, top: bool, records: &mut Vec<ScoreRecord>) -> Result<(), StoreError> {
    let io_error = |source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            collect(&path, false, records)?;
            continue;
        }

        // Only process .json files
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if top && path.file_name().and_then(|s| s.to_str()) == Some(MANIFEST_FILE) {
            continue;
        }

        let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        match serde_json::from_str::<ScoreRecord>(&contents) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping {}: not a score record ({})", path.display(), e),
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub model: String,
    pub dataset: String,
    /// Column name to system score; absent when the unit has no record
    pub scores: BTreeMap<String, Value>,
}

/// System scores across every (model, dataset) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub columns: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Render as CSV with a `model,dataset,<columns...>` header. Missing and
    /// null scores are empty cells.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("model,dataset");
        for column in &self.columns {
            out.push(',');
            out.push_str(column);
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&row.model);
            out.push(',');
            out.push_str(&row.dataset);
            for column in &self.columns {
                out.push(',');
                out.push_str(&cell(row.scores.get(column)));
            }
            out.push('\n');
        }
        out
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => format!("{:.4}", f),
            None => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<String> = ["model", "dataset"]
            .iter()
            .map(|s| s.to_string())
            .chain(self.columns.iter().cloned())
            .collect();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                [row.model.clone(), row.dataset.clone()]
                    .into_iter()
                    .chain(self.columns.iter().map(|c| {
                        let text = cell(row.scores.get(c));
                        if text.is_empty() { "-".to_string() } else { text }
                    }))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                body.iter()
                    .map(|r| r[i].len())
                    .chain(std::iter::once(header[i].len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for line in std::iter::once(&header).chain(body.iter()) {
            let cells: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(text, width)| format!("{:<width$}", text, width = width))
                .collect();
            writeln!(f, "{}", cells.join("  ").trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_record(path: &Path, model: &str, dataset: &str, metric: &str, system: Value) {
        let record = ScoreRecord {
            utterance: vec![],
            system,
            metric: metric.to_string(),
            model: model.to_string(),
            dataset: dataset.to_string(),
        };
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string(&record).unwrap()).unwrap();
    }

    #[test]
    fn test_reads_flat_layout_and_skips_manifest() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_record(&root.join("a-x-bleu_1.json"), "a", "x", "bleu_1", json!(0.25));
        write_record(&root.join("a-x-distinct_1.json"), "a", "x", "distinct_1", json!(0.5));
        fs::write(root.join(MANIFEST_FILE), r#"{"models": []}"#).unwrap();
        fs::write(root.join("notes.txt"), "ignore me").unwrap();

        let store = ScoreStore::open(root).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get("a", "x", "bleu_1").unwrap().system,
            json!(0.25)
        );
    }

    #[test]
    fn test_reads_nested_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_record(
            &root.join("bleu_1/b/y/b-y-bleu_1.json"),
            "b",
            "y",
            "bleu_1",
            json!(0.1),
        );
        write_record(
            &root.join("bleu_1/a/x/a-x-bleu_1.json"),
            "a",
            "x",
            "bleu_1",
            json!(0.2),
        );

        let store = ScoreStore::open(root).unwrap();
        let models: Vec<_> = store.records().iter().map(|r| r.model.as_str()).collect();
        assert_eq!(models, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_json_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let store = ScoreStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ScoreStore::open(dir.path().join("absent")),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn test_summary_table() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_record(&root.join("a-x-bleu_1.json"), "a", "x", "bleu_1", json!(0.25));
        write_record(&root.join("b-y-bleu_1.json"), "b", "y", "bleu_1", json!(null));
        write_record(
            &root.join("a-x-embedding_based_average.json"),
            "a",
            "x",
            "embedding_based_average",
            json!({"mean": 0.5, "std": 0.125}),
        );

        let table = ScoreStore::open(root).unwrap().summary();
        assert_eq!(
            table.columns,
            vec![
                "bleu_1",
                "embedding_based_average.mean",
                "embedding_based_average.std"
            ]
        );
        assert_eq!(table.rows.len(), 2);

        assert_eq!(
            table.to_csv(),
            "model,dataset,bleu_1,embedding_based_average.mean,embedding_based_average.std\n\
             a,x,0.2500,0.5000,0.1250\n\
             b,y,,,\n"
        );

        let text = table.to_string();
        assert!(text.lines().next().unwrap().starts_with("model  dataset  bleu_1"));
        assert!(text.contains("b      y        -"));
    }
}
