//! Benchmark configuration

use crate::error::{BenchError, Result};
use crate::evaluation::Metric;
use crate::training::ModelFamily;
use crate::tuning::{HyperParam, ModelSpec, TuningRunner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Settings shared by every pipeline of a benchmark run.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Seed for the split, the fold plan and stochastic models
    pub seed: u64,

    /// Fraction of rows in the training partition
    pub train_prop: f64,

    /// Cross-validation folds
    pub folds: usize,

    /// Absolute correlation above which a predictor is dropped
    pub corr_threshold: f64,

    /// Outcome column of the raw dataset
    pub target_column: String,

    /// Outcome class counted as positive
    pub positive_class: String,

    /// Points per range in regular grids
    pub grid_levels: usize,

    /// Metric the selector maximises
    pub metric: Metric,

    /// Tuning pool size; `None` uses all cores but one
    pub n_workers: Option<usize>,

    /// Tune on a worker pool rather than the calling thread
    pub parallel: bool,

    /// Run the model pipelines concurrently
    pub concurrent_pipelines: bool,

    /// Keep held-out fold predictions in the tuning result
    pub save_predictions: bool,

    /// Write `<family>_tuning.json` next to the metrics
    pub save_tuning: bool,

    /// Families to benchmark, in report order
    pub families: Vec<ModelFamily>,

    /// Per-family hyperparameter overrides
    pub overrides: BTreeMap<ModelFamily, BTreeMap<String, HyperParam>>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            train_prop: 0.75,
            folds: 10,
            corr_threshold: 0.9,
            target_column: "Recurred".to_string(),
            positive_class: "Yes".to_string(),
            grid_levels: 3,
            metric: Metric::Accuracy,
            n_workers: None,
            parallel: true,
            concurrent_pipelines: false,
            save_predictions: false,
            save_tuning: false,
            families: ModelFamily::ALL.to_vec(),
            overrides: BTreeMap::new(),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file and validate
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            BenchError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_prop > 0.0 && self.train_prop < 1.0) {
            return Err(invalid("train_prop", self.train_prop, "must lie strictly between 0 and 1"));
        }
        if self.folds < 2 {
            return Err(invalid("folds", self.folds, "need at least 2 folds"));
        }
        if !(self.corr_threshold > 0.0 && self.corr_threshold <= 1.0) {
            return Err(invalid("corr_threshold", self.corr_threshold, "must lie in (0, 1]"));
        }
        if self.grid_levels == 0 {
            return Err(invalid("grid_levels", self.grid_levels, "must be at least 1"));
        }
        if self.families.is_empty() {
            return Err(BenchError::ConfigError("no model families selected".to_string()));
        }
        for (family, overrides) in &self.overrides {
            ModelSpec::new(*family).with_overrides(overrides)?;
        }
        Ok(())
    }

    /// Default specification of `family` with this config's overrides and seed
    pub fn model_spec(&self, family: ModelFamily) -> Result<ModelSpec> {
        let spec = ModelSpec::new(family).with_seed(self.seed);
        match self.overrides.get(&family) {
            Some(overrides) => spec.with_overrides(overrides),
            None => Ok(spec),
        }
    }

    /// Tuning runner with this config's grid, pool and prediction settings
    pub fn runner(&self) -> TuningRunner {
        let runner = TuningRunner::new()
            .with_levels(self.grid_levels)
            .with_parallel(self.parallel)
            .with_save_predictions(self.save_predictions);
        match self.n_workers {
            Some(n) => runner.with_workers(n),
            None => runner,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_grid_levels(mut self, levels: usize) -> Self {
        self.grid_levels = levels;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_workers(mut self, n_workers: usize) -> Self {
        self.n_workers = Some(n_workers);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_concurrent_pipelines(mut self, concurrent: bool) -> Self {
        self.concurrent_pipelines = concurrent;
        self
    }

    pub fn with_families(mut self, families: Vec<ModelFamily>) -> Self {
        self.families = families;
        self
    }

    /// Override one hyperparameter of one family
    pub fn with_override(mut self, family: ModelFamily, name: &str, param: HyperParam) -> Self {
        self.overrides
            .entry(family)
            .or_default()
            .insert(name.to_string(), param);
        self
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> BenchError {
    BenchError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
