//! # Dialeval Runner
//!
//! Turns a run configuration into score files.
//!
//! ## Pipeline
//!
//! 1. [`parse_config`] expands a [`RunConfig`](dialeval_core::RunConfig) into
//!    a [`Plan`] of evaluation units.
//! 2. The [`Engine`] skips units whose output is up to date, loads resources
//!    through a caching [`ResourceLoader`] and computes each metric,
//!    optionally on a [`WorkerPool`].
//! 3. The [`Exporter`] normalizes results into [`ScoreRecord`]s and writes
//!    them atomically, next to a run manifest.
//! 4. A [`ScoreStore`] reads records back and builds a summary table.
//!
//! ## Architecture
//!
//! ```text
//! dialeval-core (entities, metric trait, registry)
//!     ↓
//! dialeval-metrics (built-in metrics)
//!     ↓
//! dialeval-runner (loader, engine, exporter)  ← this crate
//!     ↓
//! dialeval-cli
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use dialeval_runner::{parse_config, Engine, EngineConfig, Exporter, ScoreStore};
//! use dialeval_core::RunConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::from_file("eval.toml")?;
//! let plan = parse_config(&config, &dialeval_metrics::default_registry())?;
//!
//! let mut engine = Engine::new(
//!     plan,
//!     Exporter::new("scores"),
//!     EngineConfig::default().with_workers(4),
//! );
//! engine.run()?.print_summary();
//!
//! print!("{}", ScoreStore::open("scores")?.summary());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod exporter;
pub mod formats;
pub mod freshness;
pub mod interrupt;
pub mod loader;
pub mod pool;
pub mod resolve;
pub mod store;
pub mod summary;

// Re-export public API
pub use engine::{Engine, EngineConfig, EngineError, EngineProgress};
pub use exporter::{ExportError, Exporter, Layout, ScoreRecord, MANIFEST_FILE};
pub use freshness::{is_up_to_date, FileStamp};
pub use interrupt::Interrupt;
pub use loader::{CacheStats, ResourceLoader};
pub use pool::{group_units, PoolError, UnitGroup, WorkerPool};
pub use resolve::{
    pair_models_and_datasets, parse_config, parse_datasets, parse_metrics, parse_models,
    parse_models_and_datasets, Manifest, MetricInfo, Plan,
};
pub use store::{ScoreStore, StoreError, SummaryRow, SummaryTable};
pub use summary::{RunSummary, UnitOutcome, UnitReport};
