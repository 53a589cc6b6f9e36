//! Expanding a run configuration into evaluation units.

use crate::loader::validate_requirements;
use dialeval_core::{
    ConfigError, Dataset, DatasetsSpec, EvaluationUnit, Metric, MetricRegistry, MetricsSpec,
    Model, ModelSpec, RunConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Build every metric instance the config declares, in declaration order.
pub fn parse_metrics(
    spec: &MetricsSpec,
    registry: &MetricRegistry,
) -> Result<Vec<Arc<dyn Metric>>, ConfigError> {
    let mut metrics = Vec::new();
    for (name, block) in spec.entries() {
        let instances = registry.parse(&name, &block)?;
        log::debug!("Metric '{}' yields {} instance(s)", name, instances.len());
        metrics.extend(instances);
    }
    Ok(metrics)
}

pub fn parse_models(specs: &[ModelSpec]) -> Result<Vec<Model>, ConfigError> {
    specs.iter().map(ModelSpec::to_model).collect()
}

pub fn parse_datasets(spec: &DatasetsSpec) -> Vec<Dataset> {
    spec.to_datasets()
}

/// Pair every model with the dataset it was trained on.
///
/// # Errors
///
/// [`ConfigError::UnknownDataset`] if a model's `trained_on` names no
/// declared dataset.
pub fn pair_models_and_datasets(
    models: &[Arc<Model>],
    datasets: &[Arc<Dataset>],
) -> Result<Vec<(Arc<Model>, Arc<Dataset>)>, ConfigError> {
    let names: HashSet<&str> = datasets.iter().map(|d| d.name.as_str()).collect();
    if let Some(model) = models.iter().find(|m| !names.contains(m.trained_on.as_str())) {
        return Err(ConfigError::UnknownDataset {
            model: model.name.clone(),
            dataset: model.trained_on.clone(),
        });
    }

    let mut pairs = Vec::new();
    for model in models {
        for dataset in datasets {
            if model.trained_on == dataset.name {
                pairs.push((Arc::clone(model), Arc::clone(dataset)));
            }
        }
    }
    Ok(pairs)
}

pub fn parse_models_and_datasets(
    config: &RunConfig,
) -> Result<Vec<(Arc<Model>, Arc<Dataset>)>, ConfigError> {
    let models: Vec<_> = parse_models(&config.models)?
        .into_iter()
        .map(Arc::new)
        .collect();
    let datasets: Vec<_> = parse_datasets(&config.datasets)
        .into_iter()
        .map(Arc::new)
        .collect();
    pair_models_and_datasets(&models, &datasets)
}

/// Resolve a whole configuration.
pub fn parse_config(config: &RunConfig, registry: &MetricRegistry) -> Result<Plan, ConfigError> {
    let metrics = parse_metrics(&config.metrics, registry)?;
    let models = parse_models(&config.models)?;
    let datasets = parse_datasets(&config.datasets);
    Plan::from_parts(metrics, models, datasets)
}

/// The resolved units of a run, plus what they were built from.
#[derive(Debug, Clone)]
pub struct Plan {
    metrics: Vec<Arc<dyn Metric>>,
    models: Vec<Arc<Model>>,
    datasets: Vec<Arc<Dataset>>,
    units: Vec<EvaluationUnit>,
}

impl Plan {
    /// Build the units for pre-built metrics, models and datasets.
    ///
    /// Units are ordered metric-major, then by (model, dataset) declaration
    /// order. Pairs a metric is not compatible with are dropped.
    pub fn from_parts(
        metrics: Vec<Arc<dyn Metric>>,
        models: Vec<Model>,
        datasets: Vec<Dataset>,
    ) -> Result<Self, ConfigError> {
        let models: Vec<_> = models.into_iter().map(Arc::new).collect();
        let datasets: Vec<_> = datasets.into_iter().map(Arc::new).collect();
        let pairs = pair_models_and_datasets(&models, &datasets)?;

        for metric in &metrics {
            validate_requirements(metric.as_ref())?;
        }

        let mut units = Vec::new();
        for metric in &metrics {
            for (model, dataset) in &pairs {
                if !metric.compatible(model, dataset) {
                    log::info!(
                        "Skipping {} on {}/{}: not compatible",
                        metric.fullname(),
                        model.name,
                        dataset.name
                    );
                    continue;
                }
                units.push(EvaluationUnit::new(
                    Arc::clone(metric),
                    Arc::clone(model),
                    Arc::clone(dataset),
                )?);
            }
        }

        Ok(Self {
            metrics,
            models,
            datasets,
            units,
        })
    }

    pub fn units(&self) -> &[EvaluationUnit] {
        &self.units
    }

    pub fn metrics(&self) -> &[Arc<dyn Metric>] {
        &self.metrics
    }

    pub fn models(&self) -> &[Arc<Model>] {
        &self.models
    }

    pub fn datasets(&self) -> &[Arc<Dataset>] {
        &self.datasets
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Describe the run for `config.json`.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            models: self.models.iter().map(|m| Model::clone(m)).collect(),
            datasets: self.datasets.iter().map(|d| Dataset::clone(d)).collect(),
            metrics: self
                .metrics
                .iter()
                .map(|m| MetricInfo {
                    name: m.name().to_string(),
                    fullname: m.fullname(),
                    params: m.params(),
                })
                .collect(),
            units: self.units.iter().map(|u| u.prefix().to_string()).collect(),
            force: false,
            workers: 1,
        }
    }
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub models: Vec<Model>,
    pub datasets: Vec<Dataset>,
    pub metrics: Vec<MetricInfo>,
    /// Unit prefixes, in run order
    pub units: Vec<String>,
    pub force: bool,
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricInfo {
    pub name: String,
    pub fullname: String,
    pub params: serde_json::Value,
}
