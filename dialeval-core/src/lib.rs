//! # Dialeval Core
//!
//! Shared types for evaluating dialogue response generators with automatic
//! metrics.
//!
//! ## Overview
//!
//! - **Entities**: [`Model`] and [`Dataset`] describe what is evaluated;
//!   an [`EvaluationUnit`] pairs them with one metric instance.
//! - **Metrics**: the [`Metric`] trait declares required resources and
//!   computes a [`MetricResult`] from a loaded [`Resources`] map.
//! - **Registry**: [`MetricRegistry`] maps metric names to factories that
//!   turn one configuration block into metric instances.
//! - **Configuration**: [`RunConfig`] is the declarative run description
//!   read from JSON, TOML or YAML.
//!
//! ## Architecture
//!
//! ```text
//! dialeval-core (entities, metric trait, registry)  ← this crate
//!     ↓
//! dialeval-metrics (built-in metrics)
//!     ↓
//! dialeval-runner (loader, engine, exporter)
//!     ↓
//! dialeval-cli
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod metric;
pub mod registry;
pub mod resource;
pub mod unit;

pub use config::{
    ConfigFormat, DatasetFiles, DatasetsSpec, MetricEntry, MetricsSpec, ModelSpec, RunConfig,
};
pub use entity::{Dataset, Model};
pub use error::{ConfigError, MetricError, ResourceError};
pub use metric::{Fields, Metric, MetricResult, Score};
pub use registry::{MetricFactory, MetricRegistry};
pub use resource::{
    keys, requires, DatasetField, Embeddings, Format, LoadFn, ModelField, Requirement, Resource,
    Resources, Source, SourceValue,
};
pub use unit::{EvaluationUnit, SEPARATOR};
