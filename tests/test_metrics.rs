//! Integration test: test-set metrics and their CSV reports

use ndarray::Array1;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;
use thyroid_bench::evaluation::{write_comparison, ConfusionMatrix, Metric, MetricsReport};
use thyroid_bench::BenchError;

#[test]
fn test_golden_confusion() {
    // TP=5, FP=2, FN=1, TN=10
    let truth = Array1::from(vec![
        1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    ]);
    let predicted = Array1::from(vec![
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    ]);

    let report = MetricsReport::from_predictions("svm", &truth, &predicted).unwrap();
    let values: Vec<(Metric, f64)> = report.values().to_vec();
    assert_eq!(
        values,
        vec![
            (Metric::Accuracy, 83.3),
            (Metric::Precision, 71.4),
            (Metric::Recall, 83.3),
            (Metric::Specificity, 83.3),
        ]
    );
}

#[test]
fn test_percentages_in_range() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for _ in 0..50 {
        let n = rng.gen_range(1..40);
        let truth: Array1<f64> = (0..n).map(|_| if rng.gen_bool(0.3) { 1.0 } else { 0.0 }).collect();
        let predicted: Array1<f64> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();

        let report = MetricsReport::from_predictions("m", &truth, &predicted).unwrap();
        for (_, value) in report.values() {
            assert!((0.0..=100.0).contains(value), "{} out of range", value);
        }
    }
}

#[test]
fn test_length_mismatch_is_metric_error() {
    let truth = Array1::from(vec![1.0, 0.0, 1.0]);
    let predicted = Array1::from(vec![1.0, 0.0]);
    let err = MetricsReport::from_predictions("m", &truth, &predicted).unwrap_err();
    assert!(matches!(err, BenchError::MetricError(_)));
}

#[test]
fn test_label_outside_binary_is_metric_error() {
    let truth = Array1::from(vec![1.0, 0.0]);
    let predicted = Array1::from(vec![1.0, 2.0]);
    assert!(matches!(
        MetricsReport::from_predictions("m", &truth, &predicted),
        Err(BenchError::MetricError(_))
    ));
}

#[test]
fn test_csv_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("knn_metrics.csv");
    let report = MetricsReport::from_confusion("knn", &ConfusionMatrix::new(7, 3, 20, 2));
    report.write_csv(&path).unwrap();

    let back = MetricsReport::read_csv(&path, "knn").unwrap();
    assert_eq!(back.values(), report.values());
}

#[test]
fn test_comparison_has_one_row_per_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("comparison.csv");
    let reports: Vec<MetricsReport> = ["svm", "knn", "random_forest"]
        .iter()
        .map(|name| MetricsReport::from_confusion(*name, &ConfusionMatrix::new(4, 1, 10, 2)))
        .collect();
    write_comparison(&reports, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().nth(3).unwrap().starts_with("random_forest,"));
}
