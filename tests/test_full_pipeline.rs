//! Integration test: full benchmark (load → prepare → tune → fit → evaluate → report)

use polars::prelude::*;
use std::sync::Arc;
use tempfile::tempdir;
use thyroid_bench::config::BenchConfig;
use thyroid_bench::data::{dataset_from_frame, load_csv, Artifacts};
use thyroid_bench::evaluation::{Metric, MetricsReport};
use thyroid_bench::pipeline::{metrics_path, Benchmark, ModelPipeline};
use thyroid_bench::training::{Classifier, ModelFamily};
use thyroid_bench::tuning::{GridPoint, HyperParam, SearchSpace};

/// Small thyroid-like table: recurrence follows risk and treatment response
fn create_thyroid_frame() -> DataFrame {
    let n = 120;
    let mut age = Vec::with_capacity(n);
    let mut gender = Vec::with_capacity(n);
    let mut risk = Vec::with_capacity(n);
    let mut response = Vec::with_capacity(n);
    let mut recurred = Vec::with_capacity(n);

    for i in 0..n {
        let r = ["Low", "Intermediate", "High"][(i * 7) % 3];
        let recur = r == "High" || (r == "Intermediate" && i % 2 == 0);
        let flipped = i % 10 == 0;
        let excellent = recur == flipped;

        age.push(20.0 + ((i * 37) % 60) as f64);
        gender.push(if i % 3 == 0 { "M" } else { "F" });
        risk.push(r);
        response.push(if excellent { "Excellent" } else { "Structural Incomplete" });
        recurred.push(if recur { "Yes" } else { "No" });
    }

    df!(
        "Age" => &age,
        "Gender" => &gender,
        "Risk" => &risk,
        "Response" => &response,
        "Recurred" => &recurred
    )
    .unwrap()
}

/// Default search spaces with the slow fixed costs trimmed
fn small_config() -> BenchConfig {
    BenchConfig::new()
        .with_folds(3)
        .with_grid_levels(2)
        .with_workers(2)
        .with_override(ModelFamily::NeuralNetwork, "epochs", HyperParam::fixed(30i64))
        .with_override(ModelFamily::GradientBoosting, "trees", HyperParam::fixed(20i64))
        .with_override(ModelFamily::GradientBoosting, "tree_depth", HyperParam::fixed(3i64))
        .with_override(ModelFamily::RandomForest, "trees", HyperParam::fixed(30i64))
}

fn artifacts(config: &BenchConfig) -> Arc<Artifacts> {
    let data = dataset_from_frame(&create_thyroid_frame(), "Recurred", "Yes").unwrap();
    Arc::new(Artifacts::prepare(&data, config).unwrap())
}

#[test]
fn test_prepare_from_csv() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("thyroid.csv");
    let mut df = create_thyroid_frame();
    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();

    let data = load_csv(&csv_path, "Recurred", "Yes").unwrap();
    assert_eq!(data.n_rows(), 120);
    assert_eq!(data.predictors.n_cols(), 4);

    let config = small_config();
    let prepared = Artifacts::prepare(&data, &config).unwrap();
    prepared.save(&dir.path().join("artifacts")).unwrap();
    let loaded = Artifacts::load(&dir.path().join("artifacts")).unwrap();
    assert_eq!(loaded, prepared);

    // stratified 75/25 split
    assert_eq!(loaded.split.train.n_rows() + loaded.split.test.n_rows(), 120);
    let train_rate = loaded.split.train.n_positive() as f64 / loaded.split.train.n_rows() as f64;
    let test_rate = loaded.split.test.n_positive() as f64 / loaded.split.test.n_rows() as f64;
    assert!((train_rate - test_rate).abs() < 0.1);
}

#[test]
fn test_full_benchmark() {
    let dir = tempdir().unwrap();
    let config = small_config().with_concurrent_pipelines(true);
    let benchmark = Benchmark::new(config, artifacts(&small_config()));

    let report = benchmark.run(dir.path()).unwrap();
    assert_eq!(report.outcomes.len(), 6);
    for (family, outcome) in &report.outcomes {
        assert!(outcome.is_ok(), "{} failed: {:?}", family, outcome.as_ref().err());
    }

    for summary in report.succeeded() {
        assert!(summary.outputs.metrics.exists());
        for (_, value) in summary.report.values() {
            assert!((0.0..=100.0).contains(value));
        }
        let back = MetricsReport::read_csv(&summary.outputs.metrics, summary.family.name()).unwrap();
        assert_eq!(back.values(), summary.report.values());
    }

    let comparison = std::fs::read_to_string(report.comparison.unwrap()).unwrap();
    let lines: Vec<&str> = comparison.lines().collect();
    assert_eq!(lines[0], "Model,Accuracy,Precision,Recall,Specificity");
    assert_eq!(lines.len(), 7);
    assert!(lines[1].starts_with("neural_network,"));
}

#[test]
fn test_learnable_signal_is_found() {
    let dir = tempdir().unwrap();
    let config = small_config().with_families(vec![ModelFamily::LogisticRegression, ModelFamily::Knn]);
    let report = Benchmark::new(config.clone(), artifacts(&config)).run(dir.path()).unwrap();

    for summary in report.succeeded() {
        let accuracy = summary.report.get(Metric::Accuracy).unwrap();
        assert!(accuracy >= 75.0, "{} accuracy {}", summary.family, accuracy);
    }
}

#[test]
fn test_final_fit_is_deterministic() {
    let config = small_config();
    let shared = artifacts(&config);
    let spec = config.model_spec(ModelFamily::RandomForest).unwrap();
    let runner = config.runner();

    let run = || {
        ModelPipeline::new(spec.clone(), Arc::clone(&shared))
            .tune(&runner)
            .and_then(|p| p.select(Metric::Accuracy))
            .and_then(|p| p.fit())
            .unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first.predictions(), second.predictions());

    let x = first.recipe().bake(&shared.split.test.predictors).unwrap();
    let p1 = first.model().predict_proba(&x).unwrap();
    let p2 = second.model().predict_proba(&x).unwrap();
    assert!(p1.iter().zip(p2.iter()).all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn test_fixed_spec_has_single_point() {
    let config = small_config();
    let spec = config
        .model_spec(ModelFamily::Svm)
        .unwrap()
        .set("cost", HyperParam::fixed(1.0))
        .unwrap()
        .set("rbf_sigma", HyperParam::fixed(0.1))
        .unwrap();

    let tuned = ModelPipeline::new(spec, artifacts(&config))
        .tune(&config.runner())
        .unwrap();
    assert_eq!(tuned.tuning().candidates.len(), 1);
    assert_eq!(tuned.tuning().candidates[0].point, GridPoint::new());

    let evaluated = tuned.select(Metric::Accuracy).unwrap().fit().unwrap().evaluate().unwrap();
    assert_eq!(evaluated.report().values().len(), 4);
}

#[test]
fn test_override_changes_grid() {
    let config = small_config().with_override(
        ModelFamily::Knn,
        "neighbors",
        HyperParam::tune(SearchSpace::values(vec![3i64.into(), 5i64.into(), 7i64.into()])),
    );
    let tuned = ModelPipeline::new(config.model_spec(ModelFamily::Knn).unwrap(), artifacts(&config))
        .tune(&config.runner())
        .unwrap();

    // 3 neighbors x 4 weight functions x 2 dist_power levels
    assert_eq!(tuned.tuning().candidates.len(), 24);
}

#[test]
fn test_halted_rerun_leaves_no_stale_outputs() {
    let dir = tempdir().unwrap();
    let config = small_config()
        .with_families(vec![ModelFamily::Knn])
        .with_parallel(false);
    let shared = artifacts(&config);

    let first = Benchmark::new(config.clone(), Arc::clone(&shared))
        .run(dir.path())
        .unwrap();
    assert_eq!(first.n_failed(), 0);
    assert!(metrics_path(dir.path(), "knn").exists());
    assert!(dir.path().join("comparison.csv").exists());

    // A zero-sized pool is rejected before any fold is fitted
    let broken = config.with_parallel(true).with_workers(0);
    let second = Benchmark::new(broken, shared).run(dir.path()).unwrap();
    assert_eq!(second.n_failed(), 1);
    assert!(second.comparison.is_none());
    assert!(!metrics_path(dir.path(), "knn").exists());
    assert!(!dir.path().join("comparison.csv").exists());
}
