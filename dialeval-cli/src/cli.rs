//! Command-line argument parsing.

use clap::{Parser, ValueEnum};
use dialeval_core::RunConfig;
use dialeval_runner::{EngineConfig, Layout};
use std::path::PathBuf;

/// Evaluate dialogue response generators with automatic metrics
#[derive(Parser, Debug)]
#[command(name = "dialeval")]
#[command(about = "Evaluate dialogue response generators with automatic metrics", long_about = None)]
#[command(version)]
pub struct Args {
    /// Run configuration (.json, .toml, .yaml or .yml)
    pub config: Option<PathBuf>,

    /// Directory score files are written to (overrides output_dir in the config)
    #[arg(short, long, env = "DIALEVAL_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Recompute every unit even when its output is up to date
    #[arg(long)]
    pub force: bool,

    /// Number of compute threads (overrides workers in the config)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// How score files are arranged in the output directory
    #[arg(long, value_enum, default_value_t = LayoutArg::Flat)]
    pub layout: LayoutArg,

    /// Print the evaluation units without running them
    #[arg(long)]
    pub dry_run: bool,

    /// List the available metrics and exit
    #[arg(long)]
    pub list_metrics: bool,

    /// Print the system scores found in the output directory
    #[arg(long)]
    pub summary: bool,

    /// Write the system scores found in the output directory as CSV
    #[arg(long, value_name = "PATH")]
    pub summary_csv: Option<PathBuf>,

    /// Write the outcome of every unit as JSON once the run finishes
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// <output>/<model>-<dataset>-<metric>.json
    Flat,
    /// <output>/<metric>/<model>/<dataset>/<model>-<dataset>-<metric>.json
    Nested,
}

impl From<LayoutArg> for Layout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Flat => Layout::Flat,
            LayoutArg::Nested => Layout::Nested,
        }
    }
}

impl Args {
    /// Validate argument combinations clap cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("--workers must be at least 1".to_string());
        }
        if self.config.is_none() && !self.list_metrics {
            if !self.wants_scores() {
                return Err("a config file is required (or use --list-metrics)".to_string());
            }
            if self.output_dir.is_none() {
                return Err("--summary without a config file needs --output-dir".to_string());
            }
            if self.report.is_some() {
                return Err("--report needs a config file to run".to_string());
            }
        }
        Ok(())
    }

    /// Whether the score table is printed or exported after the run.
    pub fn wants_scores(&self) -> bool {
        self.summary || self.summary_csv.is_some()
    }

    /// The output directory, preferring the command line over the config.
    pub fn output_dir(&self, config: &RunConfig) -> Option<PathBuf> {
        self.output_dir.clone().or_else(|| config.output_dir.clone())
    }

    /// Build the engine configuration. `force` is set by either source;
    /// `--workers` wins over the config.
    pub fn engine_config(&self, config: &RunConfig) -> EngineConfig {
        EngineConfig::new()
            .with_force(self.force || config.force)
            .with_workers(self.workers.or(config.workers).unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialeval_core::{DatasetsSpec, MetricsSpec};

    fn args(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("dialeval").chain(extra.iter().copied()))
    }

    fn config() -> RunConfig {
        RunConfig::new(
            Vec::new(),
            DatasetsSpec::List(Vec::new()),
            MetricsSpec::List(Vec::new()),
        )
    }

    #[test]
    fn test_config_required() {
        assert!(args(&[]).validate().is_err());
        assert!(args(&["--list-metrics"]).validate().is_ok());
        assert!(args(&["run.toml"]).validate().is_ok());
    }

    #[test]
    fn test_summary_alone_needs_output_dir() {
        assert!(args(&["--summary"]).validate().is_err());
        assert!(args(&["--summary", "-o", "scores"]).validate().is_ok());
        assert!(args(&["--summary-csv", "s.csv"]).validate().is_err());
        assert!(args(&["--summary-csv", "s.csv", "-o", "scores"])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_report_needs_config() {
        assert!(args(&["--summary", "-o", "scores", "--report", "r.json"])
            .validate()
            .is_err());
        assert!(args(&["run.toml", "--report", "r.json"]).validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = args(&["run.toml", "--workers", "0"]).validate().unwrap_err();
        assert!(err.contains("workers"));
    }

    #[test]
    fn test_command_line_overrides_config() {
        let mut config = config();
        config.output_dir = Some(PathBuf::from("from-config"));
        config.workers = Some(2);

        let plain = args(&["run.toml"]);
        assert_eq!(plain.output_dir(&config), Some(PathBuf::from("from-config")));
        assert_eq!(plain.engine_config(&config).workers, 2);
        assert!(!plain.engine_config(&config).force);

        let overridden = args(&["run.toml", "-o", "cli", "-w", "4", "--force"]);
        assert_eq!(overridden.output_dir(&config), Some(PathBuf::from("cli")));
        assert_eq!(overridden.engine_config(&config).workers, 4);
        assert!(overridden.engine_config(&config).force);
    }

    #[test]
    fn test_config_force_applies() {
        let config = config().with_force(true);
        assert!(args(&["run.toml"]).engine_config(&config).force);
    }

    #[test]
    fn test_layout_arg() {
        assert_eq!(Layout::from(args(&["run.toml"]).layout), Layout::Flat);
        assert_eq!(
            Layout::from(args(&["run.toml", "--layout", "nested"]).layout),
            Layout::Nested
        );
    }
}
