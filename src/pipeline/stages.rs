//! One model pipeline as a chain of consuming stage transitions
//!
//! `ModelPipeline<Specified>` → `tune` → `ModelPipeline<Tuned>` → `select` →
//! `ModelPipeline<Selected>` → `fit` → `ModelPipeline<Fitted>` → `evaluate`
//! → `ModelPipeline<Evaluated>`. Each transition consumes the previous stage,
//! so steps cannot be skipped or repeated.

use crate::data::Artifacts;
use crate::error::Result;
use crate::evaluation::{Metric, MetricsReport};
use crate::preprocessing::FittedRecipe;
use crate::training::Classifier;
use crate::tuning::{select_best, CandidateResult, ModelSpec, TuningResult, TuningRunner};
use ndarray::Array1;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Specification declared, nothing run yet
pub struct Specified;

/// Cross-validated scores for every grid point
pub struct Tuned {
    result: TuningResult,
}

/// Best grid point chosen and merged into a fully fixed specification
pub struct Selected {
    result: TuningResult,
    best: CandidateResult,
    final_spec: ModelSpec,
}

/// Recipe and classifier fitted on the whole training partition
pub struct Fitted {
    result: TuningResult,
    best: CandidateResult,
    final_spec: ModelSpec,
    recipe: FittedRecipe,
    model: Box<dyn Classifier>,
    predictions: Array1<f64>,
}

/// Test-set metrics computed
pub struct Evaluated {
    result: TuningResult,
    best: CandidateResult,
    final_spec: ModelSpec,
    predictions: Array1<f64>,
    report: MetricsReport,
}

/// Files written by [`ModelPipeline::write`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutputs {
    pub metrics: PathBuf,
    pub tuning: Option<PathBuf>,
}

/// `<name>_metrics.csv` in `dir`
pub fn metrics_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}_metrics.csv", name))
}

/// `<name>_tuning.json` in `dir`
pub fn tuning_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}_tuning.json", name))
}

/// Delete a file if present
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove the files an earlier run of `name` left in `dir`, so a pipeline
/// that halts leaves no metrics behind
pub fn clear_outputs(dir: &Path, name: &str) -> Result<()> {
    for path in [metrics_path(dir, name), tuning_path(dir, name)] {
        if remove_if_exists(&path)? {
            debug!(path = %path.display(), "stale output removed");
        }
    }
    Ok(())
}

/// Tune, select, refit and evaluate one model family
pub struct ModelPipeline<S> {
    spec: ModelSpec,
    artifacts: Arc<Artifacts>,
    state: S,
}

impl<S> ModelPipeline<S> {
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// File-name stem of this pipeline's outputs
    pub fn name(&self) -> &'static str {
        self.spec.family().name()
    }
}

impl ModelPipeline<Specified> {
    pub fn new(spec: ModelSpec, artifacts: Arc<Artifacts>) -> Self {
        Self {
            spec,
            artifacts,
            state: Specified,
        }
    }

    /// Grid search over the shared fold plan
    pub fn tune(self, runner: &TuningRunner) -> Result<ModelPipeline<Tuned>> {
        let train = &self.artifacts.split.train;
        let result = runner.run(&self.spec, train, &self.artifacts.folds, &self.artifacts.recipe)?;
        Ok(ModelPipeline {
            spec: self.spec,
            artifacts: self.artifacts,
            state: Tuned { result },
        })
    }
}

impl ModelPipeline<Tuned> {
    pub fn tuning(&self) -> &TuningResult {
        &self.state.result
    }

    /// Pick the best point under `metric` and fix every tunable to it
    pub fn select(self, metric: Metric) -> Result<ModelPipeline<Selected>> {
        let best = select_best(&self.state.result, metric)?.clone();
        let final_spec = self.spec.finalize(&best.point)?;
        info!(
            model = self.name(),
            point = %best.point,
            metric = %metric,
            score = best.mean(metric).unwrap_or(f64::NAN),
            "best point selected"
        );
        Ok(ModelPipeline {
            spec: self.spec,
            artifacts: self.artifacts,
            state: Selected {
                result: self.state.result,
                best,
                final_spec,
            },
        })
    }
}

impl ModelPipeline<Selected> {
    pub fn best(&self) -> &CandidateResult {
        &self.state.best
    }

    pub fn final_spec(&self) -> &ModelSpec {
        &self.state.final_spec
    }

    /// Prep the recipe and fit the classifier on the whole training
    /// partition, then predict the test partition
    pub fn fit(self) -> Result<ModelPipeline<Fitted>> {
        let start = Instant::now();
        let split = &self.artifacts.split;

        let recipe = self.artifacts.recipe.prep(&split.train.predictors)?;
        let x_train = recipe.bake(&split.train.predictors)?;
        let x_test = recipe.bake(&split.test.predictors)?;

        let mut model = self.state.final_spec.build_fixed()?;
        model.fit(&x_train, &split.train.labels)?;
        let predictions = model.predict(&x_test)?;

        info!(
            model = self.name(),
            features = recipe.n_features(),
            test_rows = predictions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "final model fitted"
        );

        let Selected {
            result,
            best,
            final_spec,
        } = self.state;
        Ok(ModelPipeline {
            spec: self.spec,
            artifacts: self.artifacts,
            state: Fitted {
                result,
                best,
                final_spec,
                recipe,
                model,
                predictions,
            },
        })
    }
}

impl ModelPipeline<Fitted> {
    /// Predicted test labels, `1.0` for the positive class
    pub fn predictions(&self) -> &Array1<f64> {
        &self.state.predictions
    }

    pub fn recipe(&self) -> &FittedRecipe {
        &self.state.recipe
    }

    pub fn model(&self) -> &dyn Classifier {
        self.state.model.as_ref()
    }

    /// Score the test predictions
    pub fn evaluate(self) -> Result<ModelPipeline<Evaluated>> {
        let truth = &self.artifacts.split.test.labels;
        let report = MetricsReport::from_predictions(self.name(), truth, &self.state.predictions)?;

        let Fitted {
            result,
            best,
            final_spec,
            predictions,
            ..
        } = self.state;
        Ok(ModelPipeline {
            spec: self.spec,
            artifacts: self.artifacts,
            state: Evaluated {
                result,
                best,
                final_spec,
                predictions,
                report,
            },
        })
    }
}

impl ModelPipeline<Evaluated> {
    pub fn report(&self) -> &MetricsReport {
        &self.state.report
    }

    pub fn tuning(&self) -> &TuningResult {
        &self.state.result
    }

    pub fn best(&self) -> &CandidateResult {
        &self.state.best
    }

    pub fn final_spec(&self) -> &ModelSpec {
        &self.state.final_spec
    }

    pub fn predictions(&self) -> &Array1<f64> {
        &self.state.predictions
    }

    /// Write `<name>_metrics.csv` and, if asked, `<name>_tuning.json` into `dir`
    pub fn write(&self, dir: &Path, save_tuning: bool) -> Result<PipelineOutputs> {
        let metrics = metrics_path(dir, self.name());
        self.state.report.write_csv(&metrics)?;

        let tuning = if save_tuning {
            let path = tuning_path(dir, self.name());
            self.state.result.save_json(&path)?;
            Some(path)
        } else {
            None
        };

        info!(model = self.name(), path = %metrics.display(), "metrics written");
        Ok(PipelineOutputs { metrics, tuning })
    }

    /// Consume the pipeline, keeping the metric report
    pub fn into_report(self) -> MetricsReport {
        self.state.report
    }
}
