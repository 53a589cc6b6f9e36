//! Per-unit outcomes and the run summary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// What happened to one evaluation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// A score record was written
    Written { path: PathBuf },
    /// The existing record is newer than every input
    UpToDate,
    /// A required resource could not be loaded
    ResourcesUnavailable,
    /// Computation or export failed
    Failed { error: String },
    /// Computation was interrupted and its result discarded
    Interrupted,
}

impl UnitOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            UnitOutcome::Written { .. } => "written",
            UnitOutcome::UpToDate => "up to date",
            UnitOutcome::ResourcesUnavailable => "skipped",
            UnitOutcome::Failed { .. } => "failed",
            UnitOutcome::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOutcome::Written { path } => write!(f, "written to {}", path.display()),
            UnitOutcome::Failed { error } => write!(f, "failed: {}", error),
            other => f.write_str(other.label()),
        }
    }
}

/// Outcome of one unit, keyed by its prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    pub prefix: String,
    #[serde(flatten)]
    pub outcome: UnitOutcome,
}

/// Summary of an entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Units in the plan
    pub total: usize,

    pub written: usize,

    pub up_to_date: usize,

    /// Units skipped because a resource was unavailable
    pub skipped: usize,

    pub failed: usize,

    pub interrupted: usize,

    /// Outcomes in run order
    pub units: Vec<UnitReport>,

    /// Wall-clock time of the run, stored as `duration_ms`
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,
}

impl RunSummary {
    pub fn from_reports(units: Vec<UnitReport>, duration: Duration) -> Self {
        let count = |pred: fn(&UnitOutcome) -> bool| {
            units.iter().filter(|u| pred(&u.outcome)).count()
        };

        Self {
            total: units.len(),
            written: count(|o| matches!(o, UnitOutcome::Written { .. })),
            up_to_date: count(|o| matches!(o, UnitOutcome::UpToDate)),
            skipped: count(|o| matches!(o, UnitOutcome::ResourcesUnavailable)),
            failed: count(|o| matches!(o, UnitOutcome::Failed { .. })),
            interrupted: count(|o| matches!(o, UnitOutcome::Interrupted)),
            units,
            duration,
        }
    }

    /// Outcome recorded for `prefix`.
    pub fn outcome(&self, prefix: &str) -> Option<&UnitOutcome> {
        self.units
            .iter()
            .find(|u| u.prefix == prefix)
            .map(|u| &u.outcome)
    }

    /// Whether every unit was written or already up to date.
    pub fn is_complete(&self) -> bool {
        self.written + self.up_to_date == self.total
    }

    /// Print a summary to stdout.
    pub fn print_summary(&self) {
        println!();
        println!("=== Run Summary ===");
        println!(
            "Units: {} total, {} written, {} up to date",
            self.total, self.written, self.up_to_date
        );
        if self.skipped + self.failed + self.interrupted > 0 {
            println!(
                "Problems: {} skipped, {} failed, {} interrupted",
                self.skipped, self.failed, self.interrupted
            );
            for unit in &self.units {
                match unit.outcome {
                    UnitOutcome::Written { .. } | UnitOutcome::UpToDate => {}
                    ref outcome => println!("  {}: {}", unit.prefix, outcome),
                }
            }
        }
        println!("Duration: {:.1}s", self.duration.as_secs_f64());
    }

    /// Write the summary to a JSON file.
    pub fn write_json(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// A `Duration` as whole milliseconds.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
