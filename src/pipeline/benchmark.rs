//! Running every configured model pipeline over shared artifacts

use super::stages::{clear_outputs, remove_if_exists, ModelPipeline, PipelineOutputs};
use crate::config::BenchConfig;
use crate::data::Artifacts;
use crate::error::Result;
use crate::evaluation::{write_comparison, MetricsReport};
use crate::training::ModelFamily;
use crate::tuning::GridPoint;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// What one successful pipeline produced
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub family: ModelFamily,
    pub report: MetricsReport,
    pub best_point: GridPoint,
    /// Mean cross-validated score of `best_point` under the tuning metric
    pub cv_score: f64,
    pub outputs: PipelineOutputs,
    pub elapsed: Duration,
}

/// Per-family outcomes, in configured family order
#[derive(Debug)]
pub struct BenchmarkReport {
    pub outcomes: Vec<(ModelFamily, Result<PipelineSummary>)>,
    /// `comparison.csv`, written when at least one pipeline succeeded
    pub comparison: Option<PathBuf>,
}

impl BenchmarkReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &PipelineSummary> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn n_failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }
}

/// Runs the model pipelines of a [`BenchConfig`] over one set of artifacts
pub struct Benchmark {
    config: BenchConfig,
    artifacts: Arc<Artifacts>,
}

impl Benchmark {
    pub fn new(config: BenchConfig, artifacts: Arc<Artifacts>) -> Self {
        Self { config, artifacts }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run one family's pipeline end to end and write its outputs to `out_dir`
    pub fn run_family(&self, family: ModelFamily, out_dir: &Path) -> Result<PipelineSummary> {
        let start = Instant::now();
        info!(model = family.name(), "pipeline started");
        clear_outputs(out_dir, family.name())?;

        let spec = self.config.model_spec(family)?;
        let evaluated = ModelPipeline::new(spec, Arc::clone(&self.artifacts))
            .tune(&self.config.runner())?
            .select(self.config.metric)?
            .fit()?
            .evaluate()?;
        let outputs = evaluated.write(out_dir, self.config.save_tuning)?;

        let elapsed = start.elapsed();
        info!(
            model = family.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            "pipeline finished"
        );
        Ok(PipelineSummary {
            family,
            best_point: evaluated.best().point.clone(),
            cv_score: evaluated.best().mean(self.config.metric).unwrap_or(f64::NAN),
            report: evaluated.into_report(),
            outputs,
            elapsed,
        })
    }

    /// Run every configured family. A failing pipeline is logged and kept in
    /// the report; the others still run and write their metrics. Outputs of
    /// an earlier run in `out_dir` are replaced, never reused.
    pub fn run(&self, out_dir: &Path) -> Result<BenchmarkReport> {
        std::fs::create_dir_all(out_dir)?;
        let comparison_path = out_dir.join("comparison.csv");
        remove_if_exists(&comparison_path)?;
        let families = &self.config.families;

        let run_one = |&family: &ModelFamily| {
            let outcome = self.run_family(family, out_dir);
            if let Err(e) = &outcome {
                error!(model = family.name(), error = %e, "pipeline halted");
            }
            (family, outcome)
        };

        let outcomes: Vec<(ModelFamily, Result<PipelineSummary>)> = if self.config.concurrent_pipelines {
            families.par_iter().map(run_one).collect()
        } else {
            families.iter().map(run_one).collect()
        };

        let reports: Vec<MetricsReport> = outcomes
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok().map(|s| s.report.clone()))
            .collect();
        let comparison = if reports.is_empty() {
            None
        } else {
            write_comparison(&reports, &comparison_path)?;
            Some(comparison_path)
        };

        let report = BenchmarkReport {
            outcomes,
            comparison,
        };
        info!(
            pipelines = report.outcomes.len(),
            failed = report.n_failed(),
            "benchmark finished"
        );
        Ok(report)
    }
}
