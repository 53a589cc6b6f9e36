//! Worker pool for computing metric groups in parallel.
//!
//! Units sharing a metric class, model and dataset form a [`UnitGroup`]. The
//! engine loads a group's resources on its own thread, then hands the
//! computations to a [`WorkerPool`], which returns results in input order.

use dialeval_core::{EvaluationUnit, Metric, MetricError, MetricResult, Resources};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to start worker pool: {0}")]
pub struct PoolError(#[from] rayon::ThreadPoolBuildError);

/// Units of one metric class on one (model, dataset) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitGroup {
    pub metric: String,
    pub model: String,
    pub dataset: String,
    /// Indices into the unit list, in order
    pub indices: Vec<usize>,
}

impl fmt::Display for UnitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}/{} ({} unit(s))",
            self.metric,
            self.model,
            self.dataset,
            self.indices.len()
        )
    }
}

/// Group units by (metric name, model, dataset), in order of first occurrence.
pub fn group_units(units: &[EvaluationUnit]) -> Vec<UnitGroup> {
    let mut groups: Vec<UnitGroup> = Vec::new();
    let mut positions: HashMap<(String, String, String), usize> = HashMap::new();

    for (index, unit) in units.iter().enumerate() {
        let key = (
            unit.metric().name().to_string(),
            unit.model().name.clone(),
            unit.dataset().name.clone(),
        );
        match positions.get(&key) {
            Some(&position) => groups[position].indices.push(index),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(UnitGroup {
                    metric: key.0,
                    model: key.1,
                    dataset: key.2,
                    indices: vec![index],
                });
            }
        }
    }
    groups
}

/// One computation handed to the pool.
#[derive(Debug, Clone)]
pub struct Job {
    pub index: usize,
    pub metric: Arc<dyn Metric>,
    pub resources: Resources,
}

/// A bounded pool of compute threads.
pub struct WorkerPool {
    workers: usize,
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("dialeval-worker-{}", i))
            .build()?;
        Ok(Self { workers, pool })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Compute every job, returning `(index, result)` in input order.
    pub fn compute(&self, jobs: Vec<Job>) -> Vec<(usize, Result<MetricResult, MetricError>)> {
        self.pool.install(|| {
            jobs.into_par_iter()
                .map(|job| (job.index, job.metric.compute(&job.resources)))
                .collect()
        })
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}
