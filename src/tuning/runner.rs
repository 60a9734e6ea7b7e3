//! Grid search over cross-validation folds on a scoped worker pool

use super::result::{CandidateResult, FoldPredictions, TuningResult};
use super::search_space::GridPoint;
use super::spec::EstimatorFactory;
use crate::data::Dataset;
use crate::error::{BenchError, Result};
use crate::evaluation::{ConfusionMatrix, Metric};
use crate::preprocessing::Recipe;
use crate::training::{CVResults, FoldPlan};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default worker count: all cores but one, at least one
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// One fold after the recipe was prepped on its held-in rows
struct BakedFold {
    fold_idx: usize,
    x_in: Array2<f64>,
    y_in: Array1<f64>,
    x_out: Array2<f64>,
    y_out: Array1<f64>,
    held_out: Vec<usize>,
}

/// Outcome of one (grid point, fold) evaluation
struct FoldOutcome {
    scores: BTreeMap<Metric, f64>,
    rows: Vec<usize>,
    predicted: Vec<f64>,
}

/// Evaluates a model specification across a grid and a fold plan
#[derive(Debug, Clone)]
pub struct TuningRunner {
    levels: usize,
    metrics: Vec<Metric>,
    n_workers: Option<usize>,
    parallel: bool,
    save_predictions: bool,
    live_workers: Arc<AtomicUsize>,
}

impl Default for TuningRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TuningRunner {
    pub fn new() -> Self {
        Self {
            levels: 3,
            metrics: Metric::ALL.to_vec(),
            n_workers: None,
            parallel: true,
            save_predictions: false,
            live_workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Points per range in regular grids
    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    /// Metrics computed on every held-out fold
    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Explicit pool size; 0 is rejected when the run starts
    pub fn with_workers(mut self, n_workers: usize) -> Self {
        self.n_workers = Some(n_workers);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Keep every fold's held-out predictions in the result
    pub fn with_save_predictions(mut self, save: bool) -> Self {
        self.save_predictions = save;
        self
    }

    /// Pool threads currently alive. Zero whenever `run` is not executing.
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    fn resolve_workers(&self) -> Result<usize> {
        match self.n_workers {
            Some(0) => Err(BenchError::ResourceError(
                "worker pool needs at least one thread".to_string(),
            )),
            Some(n) => Ok(n),
            None => Ok(default_workers()),
        }
    }

    /// Evaluate every grid point of `factory` on every fold of `folds`.
    ///
    /// `data` is the training partition the plan indexes into. A failing or
    /// panicking (point, fold) pair only loses that fold's score; the run
    /// fails if no point scored at all.
    pub fn run<F>(&self, factory: &F, data: &Dataset, folds: &FoldPlan, recipe: &Recipe) -> Result<TuningResult>
    where
        F: EstimatorFactory + ?Sized,
    {
        if self.metrics.is_empty() {
            return Err(BenchError::ConfigError("no tuning metrics configured".to_string()));
        }
        if folds.n_rows != data.n_rows() {
            return Err(BenchError::DataError(format!(
                "fold plan covers {} rows but the training partition has {}",
                folds.n_rows,
                data.n_rows()
            )));
        }
        folds.validate()?;

        let n_predictors = recipe.prep(&data.predictors)?.n_features();
        let grid = factory.grid(self.levels, n_predictors)?;
        if grid.is_empty() {
            return Err(BenchError::ConfigError(format!("{} has an empty grid", factory.label())));
        }

        let label = factory.label();
        let start = Instant::now();
        info!(
            model = %label,
            points = grid.len(),
            folds = folds.len(),
            predictors = n_predictors,
            "tuning started"
        );

        let outcomes = if self.parallel {
            let n_workers = self.resolve_workers()?;
            let started = Arc::clone(&self.live_workers);
            let exited = Arc::clone(&self.live_workers);

            // Scoped threads are joined before build_scoped returns, on
            // every exit path
            rayon::ThreadPoolBuilder::new()
                .num_threads(n_workers)
                .thread_name(|i| format!("tune-worker-{}", i))
                .start_handler(move |_| {
                    started.fetch_add(1, Ordering::SeqCst);
                })
                .exit_handler(move |_| {
                    exited.fetch_sub(1, Ordering::SeqCst);
                })
                .build_scoped(
                    |thread| thread.run(),
                    |pool| pool.install(|| self.evaluate_all(factory, data, folds, recipe, &grid, true)),
                )??
        } else {
            self.evaluate_all(factory, data, folds, recipe, &grid, false)?
        };

        let result = self.aggregate(label.clone(), folds.len(), grid, outcomes)?;
        info!(
            model = %label,
            scored = result.n_scored(),
            points = result.candidates.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tuning finished"
        );
        Ok(result)
    }

    fn evaluate_all<F>(
        &self,
        factory: &F,
        data: &Dataset,
        folds: &FoldPlan,
        recipe: &Recipe,
        grid: &[GridPoint],
        parallel: bool,
    ) -> Result<Vec<(usize, usize, Option<FoldOutcome>)>>
    where
        F: EstimatorFactory + ?Sized,
    {
        let bake = |fold: &crate::training::Fold| -> Result<BakedFold> {
            let held_in = data.take(&fold.held_in);
            let held_out = data.take(&fold.held_out);
            let fitted = recipe.prep(&held_in.predictors)?;
            Ok(BakedFold {
                fold_idx: fold.fold_idx,
                x_in: fitted.bake(&held_in.predictors)?,
                y_in: held_in.labels,
                x_out: fitted.bake(&held_out.predictors)?,
                y_out: held_out.labels,
                held_out: fold.held_out.clone(),
            })
        };

        // The recipe depends only on the fold, so each fold is baked once
        let baked: Vec<BakedFold> = if parallel {
            folds.folds.par_iter().map(bake).collect::<Result<_>>()?
        } else {
            folds.folds.iter().map(bake).collect::<Result<_>>()?
        };

        let tasks: Vec<(usize, usize)> = (0..grid.len())
            .flat_map(|p| (0..baked.len()).map(move |f| (p, f)))
            .collect();

        let run_task = |&(p, f): &(usize, usize)| {
            let fold = &baked[f];
            let point = &grid[p];
            let outcome = catch_unwind(AssertUnwindSafe(|| self.evaluate(factory, point, fold)));
            let outcome = match outcome {
                Ok(Ok(outcome)) => Some(outcome),
                Ok(Err(e)) => {
                    warn!(point = %point, fold = fold.fold_idx, error = %e, "fit failed, fold score dropped");
                    None
                }
                Err(_) => {
                    warn!(point = %point, fold = fold.fold_idx, "fit panicked, fold score dropped");
                    None
                }
            };
            (p, fold.fold_idx, outcome)
        };

        Ok(if parallel {
            tasks.par_iter().map(run_task).collect()
        } else {
            tasks.iter().map(run_task).collect()
        })
    }

    fn evaluate<F>(&self, factory: &F, point: &GridPoint, fold: &BakedFold) -> Result<FoldOutcome>
    where
        F: EstimatorFactory + ?Sized,
    {
        let mut model = factory.build(point)?;
        model.fit(&fold.x_in, &fold.y_in)?;
        let predicted = model.predict(&fold.x_out)?;
        let cm = ConfusionMatrix::from_labels(&fold.y_out, &predicted)?;

        let scores = self
            .metrics
            .iter()
            .filter_map(|&m| m.compute(&cm).map(|v| (m, v)))
            .collect();
        debug!(point = %point, fold = fold.fold_idx, "fold scored");

        let (rows, predicted) = if self.save_predictions {
            (fold.held_out.clone(), predicted.to_vec())
        } else {
            (Vec::new(), Vec::new())
        };
        Ok(FoldOutcome {
            scores,
            rows,
            predicted,
        })
    }

    /// Group outcomes by grid index, whatever order they completed in
    fn aggregate(
        &self,
        label: String,
        n_folds: usize,
        grid: Vec<GridPoint>,
        mut outcomes: Vec<(usize, usize, Option<FoldOutcome>)>,
    ) -> Result<TuningResult> {
        outcomes.sort_by_key(|(p, f, _)| (*p, *f));

        let mut candidates: Vec<CandidateResult> = grid
            .into_iter()
            .enumerate()
            .map(|(index, point)| CandidateResult {
                index,
                point,
                scores: BTreeMap::new(),
                n_failed: 0,
                predictions: Vec::new(),
            })
            .collect();
        let mut fold_scores: Vec<BTreeMap<Metric, Vec<f64>>> = vec![BTreeMap::new(); candidates.len()];

        for (p, fold_idx, outcome) in outcomes {
            match outcome {
                Some(outcome) => {
                    for (metric, score) in outcome.scores {
                        fold_scores[p].entry(metric).or_default().push(score);
                    }
                    if self.save_predictions {
                        candidates[p].predictions.push(FoldPredictions {
                            fold_idx,
                            rows: outcome.rows,
                            predicted: outcome.predicted,
                        });
                    }
                }
                None => candidates[p].n_failed += 1,
            }
        }

        for (candidate, scores) in candidates.iter_mut().zip(fold_scores) {
            candidate.scores = scores
                .into_iter()
                .filter_map(|(m, s)| CVResults::from_scores(s).map(|cv| (m, cv)))
                .collect();
        }

        if candidates.iter().all(|c| !c.is_scored()) {
            return Err(BenchError::FitError(format!(
                "no grid point of {} could be fitted on any fold",
                label
            )));
        }

        Ok(TuningResult {
            label,
            metrics: self.metrics.clone(),
            n_folds,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClassLabels, Column, Table};
    use crate::training::Classifier;
    use crate::tuning::ParamValue;

    /// Predicts the majority class; optionally fails or panics for chosen
    /// values of `k`
    struct Stub {
        fail_on: Option<i64>,
        panic_on: Option<i64>,
    }

    struct Majority(f64);

    impl Classifier for Majority {
        fn fit(&mut self, _x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
            self.0 = if y.sum() * 2.0 >= y.len() as f64 { 1.0 } else { 0.0 };
            Ok(())
        }

        fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(Array1::from_elem(x.nrows(), self.0))
        }
    }

    impl EstimatorFactory for Stub {
        fn label(&self) -> String {
            "stub".to_string()
        }

        fn grid(&self, _levels: usize, _n_predictors: usize) -> Result<Vec<GridPoint>> {
            Ok((1..=4).map(|k| GridPoint::new().with("k", k as i64)).collect())
        }

        fn build(&self, point: &GridPoint) -> Result<Box<dyn Classifier>> {
            let k = point.get("k").and_then(ParamValue::as_int);
            if k.is_some() && k == self.panic_on {
                panic!("injected panic");
            }
            if k.is_some() && k == self.fail_on {
                return Err(BenchError::FitError("injected failure".to_string()));
            }
            Ok(Box::new(Majority(0.0)))
        }
    }

    fn training_data(n: usize) -> Dataset {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Array1<f64> = (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();
        let table = Table::new().with_column("x", Column::Numeric(x)).unwrap();
        Dataset::new(table, y, ClassLabels::new("Yes", "No")).unwrap()
    }

    fn setup() -> (Dataset, FoldPlan, Recipe) {
        let data = training_data(30);
        let folds = FoldPlan::stratified(&data.labels, 5, 1).unwrap();
        (data, folds, Recipe::new().step_normalize())
    }

    #[test]
    fn test_failed_point_is_unscored() {
        let (data, folds, recipe) = setup();
        let stub = Stub {
            fail_on: Some(2),
            panic_on: None,
        };
        let runner = TuningRunner::new().with_workers(2);
        let result = runner.run(&stub, &data, &folds, &recipe).unwrap();

        assert_eq!(result.candidates.len(), 4);
        assert!(!result.candidates[1].is_scored());
        assert_eq!(result.candidates[1].n_failed, 5);
        assert!(result.candidates[0].is_scored());
        assert_eq!(runner.live_workers(), 0);
    }

    #[test]
    fn test_panicking_point_is_isolated() {
        let (data, folds, recipe) = setup();
        let stub = Stub {
            fail_on: None,
            panic_on: Some(3),
        };
        let runner = TuningRunner::new().with_workers(3);
        let result = runner.run(&stub, &data, &folds, &recipe).unwrap();

        assert!(!result.candidates[2].is_scored());
        assert_eq!(result.n_scored(), 3);
        assert_eq!(runner.live_workers(), 0);
    }

    #[test]
    fn test_zero_workers_is_resource_error() {
        let (data, folds, recipe) = setup();
        let stub = Stub {
            fail_on: None,
            panic_on: None,
        };
        let result = TuningRunner::new().with_workers(0).run(&stub, &data, &folds, &recipe);
        assert!(matches!(result, Err(BenchError::ResourceError(_))));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let (data, folds, recipe) = setup();
        let stub = Stub {
            fail_on: None,
            panic_on: None,
        };
        let parallel = TuningRunner::new().with_workers(4).run(&stub, &data, &folds, &recipe).unwrap();
        let sequential = TuningRunner::new()
            .with_parallel(false)
            .run(&stub, &data, &folds, &recipe)
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_saved_predictions_cover_every_fold() {
        let (data, folds, recipe) = setup();
        let stub = Stub {
            fail_on: None,
            panic_on: None,
        };
        let result = TuningRunner::new()
            .with_workers(2)
            .with_save_predictions(true)
            .run(&stub, &data, &folds, &recipe)
            .unwrap();

        let predictions = &result.candidates[0].predictions;
        assert_eq!(predictions.len(), 5);
        let total: usize = predictions.iter().map(|p| p.predicted.len()).sum();
        assert_eq!(total, 30);
        assert_eq!(predictions[0].rows, folds.folds[0].held_out);
    }

    #[test]
    fn test_mismatched_plan_rejected() {
        let (data, _, recipe) = setup();
        let other = FoldPlan::stratified(&training_data(20).labels, 5, 1).unwrap();
        let stub = Stub {
            fail_on: None,
            panic_on: None,
        };
        assert!(TuningRunner::new().run(&stub, &data, &other, &recipe).is_err());
    }
}
