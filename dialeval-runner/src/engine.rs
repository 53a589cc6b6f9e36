//! The evaluation engine.
//!
//! The [`Engine`] walks a [`Plan`]'s units, skips those whose output is
//! already up to date, loads resources through a caching
//! [`ResourceLoader`], computes the metric and hands the result to the
//! [`Exporter`]. Failures are contained per unit; only a failure to prepare
//! the output directory aborts a run.

use crate::exporter::{ExportError, Exporter};
use crate::freshness::is_up_to_date;
use crate::interrupt::Interrupt;
use crate::loader::{CacheStats, ResourceLoader};
use crate::pool::{group_units, Job, PoolError, WorkerPool};
use crate::resolve::Plan;
use crate::summary::{RunSummary, UnitOutcome, UnitReport};
use dialeval_core::{EvaluationUnit, MetricError, MetricResult, Resources};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("Cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write run manifest: {0}")]
    Manifest(#[source] ExportError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum EngineProgress {
    /// Manifest written, units about to run.
    Started {
        /// Number of units in the plan.
        total: usize,
    },
    /// A unit reached its final outcome.
    UnitFinished {
        /// Units finished so far, including this one.
        completed: usize,
        total: usize,
        prefix: String,
        outcome: UnitOutcome,
    },
}

/// Configuration for the engine.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct EngineConfig {
    /// Recompute units even when their output is up to date (default: false)
    pub force: bool,

    /// Compute threads; 1 runs every unit on the calling thread (default: 1)
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            force: false,
            workers: 1,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Runs every unit of a plan and exports the results.
///
/// # Example
///
/// ```no_run
/// use dialeval_runner::{parse_config, Engine, EngineConfig, Exporter};
/// use dialeval_core::RunConfig;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RunConfig::from_file("eval.yaml")?;
/// let plan = parse_config(&config, &dialeval_metrics::default_registry())?;
///
/// let mut engine = Engine::new(plan, Exporter::new("scores"), EngineConfig::default());
/// let summary = engine.run()?;
/// summary.print_summary();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Engine {
    plan: Plan,
    exporter: Exporter,
    config: EngineConfig,
    loader: ResourceLoader,
    interrupt: Interrupt,
}

impl Engine {
    pub fn new(plan: Plan, exporter: Exporter, config: EngineConfig) -> Self {
        Self {
            plan,
            exporter,
            config,
            loader: ResourceLoader::new(),
            interrupt: Interrupt::new(),
        }
    }

    /// Share `interrupt` with whoever listens for signals.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.loader.stats()
    }

    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        self.run_with_progress(|_| {})
    }

    /// Run every unit, reporting progress through `on_progress`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only when the output directory or manifest
    /// cannot be written, or the worker pool cannot start. Per-unit failures
    /// are recorded in the returned [`RunSummary`].
    pub fn run_with_progress<F>(&mut self, mut on_progress: F) -> Result<RunSummary, EngineError>
    where
        F: FnMut(EngineProgress),
    {
        let start_time = Instant::now();
        let save_dir = self.exporter.save_dir().to_path_buf();
        std::fs::create_dir_all(&save_dir).map_err(|source| EngineError::OutputDir {
            path: save_dir.clone(),
            source,
        })?;

        let mut manifest = self.plan.manifest();
        manifest.force = self.config.force;
        manifest.workers = self.config.workers;
        self.exporter
            .export_config(&manifest)
            .map_err(EngineError::Manifest)?;

        let units = self.plan.units().to_vec();
        let total = units.len();
        log::info!(
            "Running {} unit(s) with {} worker(s) into {}",
            total,
            self.config.workers,
            save_dir.display()
        );
        on_progress(EngineProgress::Started { total });

        let mut reports = Vec::with_capacity(total);
        let mut record = |prefix: &str, outcome: UnitOutcome| {
            reports.push(UnitReport {
                prefix: prefix.to_string(),
                outcome: outcome.clone(),
            });
            on_progress(EngineProgress::UnitFinished {
                completed: reports.len(),
                total,
                prefix: prefix.to_string(),
                outcome,
            });
        };

        if self.config.workers <= 1 {
            for unit in &units {
                let outcome = match self.prepare(unit) {
                    Ok(resources) => self.compute(unit, &resources),
                    Err(outcome) => outcome,
                };
                record(unit.prefix(), outcome);
            }
        } else {
            let pool = WorkerPool::new(self.config.workers)?;
            for group in group_units(&units) {
                log::debug!("Computing group {}", group);
                let mut jobs = Vec::new();
                for &index in &group.indices {
                    let unit = &units[index];
                    match self.prepare(unit) {
                        Ok(resources) => jobs.push(Job {
                            index,
                            metric: unit.metric().clone(),
                            resources,
                        }),
                        Err(outcome) => record(unit.prefix(), outcome),
                    }
                }
                if jobs.is_empty() {
                    continue;
                }

                self.clear_stale_interrupt();
                let results = pool.compute(jobs);
                let interrupted = self.interrupt.take();
                if interrupted {
                    log::warn!("Interrupted while computing {}; results discarded", group);
                }
                for (index, result) in results {
                    let unit = &units[index];
                    let outcome = if interrupted {
                        UnitOutcome::Interrupted
                    } else {
                        self.finish(unit, result)
                    };
                    record(unit.prefix(), outcome);
                }
            }
        }
        let summary = RunSummary::from_reports(reports, start_time.elapsed());
        let stats = self.loader.stats();
        log::info!(
            "all done: {} written, {} up to date, {} skipped, {} failed, {} interrupted \
             ({} resource load(s), {} cache hit(s))",
            summary.written,
            summary.up_to_date,
            summary.skipped,
            summary.failed,
            summary.interrupted,
            stats.misses,
            stats.hits
        );
        Ok(summary)
    }

    /// Decide whether `unit` needs computing and load its resources.
    ///
    /// `Err` carries the final outcome of a unit that will not be computed.
    fn prepare(&mut self, unit: &EvaluationUnit) -> Result<Resources, UnitOutcome> {
        let output = self.exporter.output_path(unit);
        if !self.config.force && self.is_up_to_date(unit, &output) {
            log::info!("{}: up to date", unit.prefix());
            return Err(UnitOutcome::UpToDate);
        }

        self.loader
            .load_resources(unit)
            .ok_or(UnitOutcome::ResourcesUnavailable)
    }

    fn is_up_to_date(&self, unit: &EvaluationUnit, output: &Path) -> bool {
        match self.loader.get_filenames(unit) {
            Ok(inputs) => is_up_to_date(output, inputs.values().map(PathBuf::as_path)),
            Err(e) => {
                log::debug!("{}: cannot resolve inputs ({}), treating as stale", unit, e);
                false
            }
        }
    }

    fn compute(&self, unit: &EvaluationUnit, resources: &Resources) -> UnitOutcome {
        log::info!("{}: computing", unit.prefix());
        self.clear_stale_interrupt();
        let result = unit.metric().compute(resources);
        if self.interrupt.take() {
            log::warn!("{}: interrupted; result discarded", unit.prefix());
            return UnitOutcome::Interrupted;
        }
        self.finish(unit, result)
    }

    fn finish(
        &self,
        unit: &EvaluationUnit,
        result: Result<MetricResult, MetricError>,
    ) -> UnitOutcome {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{}: metric failed: {}", unit.prefix(), e);
                return UnitOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match self.exporter.export_json(&result, unit) {
            Ok(path) => {
                log::info!("{}: wrote {}", unit.prefix(), path.display());
                UnitOutcome::Written { path }
            }
            Err(e) => {
                log::warn!("{}: export failed: {}", unit.prefix(), e);
                UnitOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Interrupts raised outside a computation do not affect the next unit.
    fn clear_stale_interrupt(&self) {
        if self.interrupt.take() {
            log::debug!("Ignoring interrupt raised between units");
        }
    }
}
