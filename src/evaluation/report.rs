//! Percentage metric reports and their CSV form

use super::metrics::{ConfusionMatrix, Metric};
use crate::error::{BenchError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One `Metric,Value` CSV row
#[derive(Debug, Serialize, Deserialize)]
struct MetricRow {
    #[serde(rename = "Metric")]
    metric: String,
    #[serde(rename = "Value")]
    value: String,
}

/// One `comparison.csv` row
#[derive(Debug, Serialize, Deserialize)]
struct ComparisonRow {
    #[serde(rename = "Model")]
    model: String,
    #[serde(rename = "Accuracy")]
    accuracy: String,
    #[serde(rename = "Precision")]
    precision: String,
    #[serde(rename = "Recall")]
    recall: String,
    #[serde(rename = "Specificity")]
    specificity: String,
}

/// Scale a fraction to a percentage rounded to one decimal place
pub fn to_percent(fraction: f64) -> f64 {
    (fraction * 1000.0).round() / 10.0
}

/// Four test-set metrics for one model, as percentages in fixed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub model: String,
    values: Vec<(Metric, f64)>,
}

impl MetricsReport {
    /// Score predictions against the true test labels
    pub fn from_predictions(
        model: impl Into<String>,
        truth: &Array1<f64>,
        predicted: &Array1<f64>,
    ) -> Result<Self> {
        let cm = ConfusionMatrix::from_labels(truth, predicted)?;
        Ok(Self::from_confusion(model, &cm))
    }

    /// Undefined ratios (zero denominator) are reported as 0.0
    pub fn from_confusion(model: impl Into<String>, cm: &ConfusionMatrix) -> Self {
        let model = model.into();
        let values = Metric::ALL
            .iter()
            .map(|&metric| {
                let value = match metric.compute(cm) {
                    Some(fraction) => to_percent(fraction),
                    None => {
                        warn!(model = %model, metric = %metric, "metric undefined (zero denominator), reporting 0.0");
                        0.0
                    }
                };
                (metric, value)
            })
            .collect();

        Self { model, values }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, v)| *v)
    }

    /// (metric, percentage) pairs in report order
    pub fn values(&self) -> &[(Metric, f64)] {
        &self.values
    }

    /// Write `Metric,Value` rows, replacing any existing file
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for (metric, value) in &self.values {
            writer.serialize(MetricRow {
                metric: metric.label().to_string(),
                value: format!("{:.1}", value),
            })?;
        }
        writer.flush()?;
        debug!(path = %path.display(), "metrics written");
        Ok(())
    }

    /// Read a file written by [`MetricsReport::write_csv`]
    pub fn read_csv(path: &Path, model: impl Into<String>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut values = Vec::new();
        for row in reader.deserialize() {
            let row: MetricRow = row?;
            let metric: Metric = row.metric.parse()?;
            let value: f64 = row.value.trim().parse().map_err(|_| {
                BenchError::DataError(format!(
                    "{}: value '{}' for {} is not a number",
                    path.display(),
                    row.value,
                    row.metric
                ))
            })?;
            values.push((metric, value));
        }

        let found: Vec<Metric> = values.iter().map(|(m, _)| *m).collect();
        if found != Metric::ALL {
            let labels: Vec<&str> = found.iter().map(Metric::label).collect();
            return Err(BenchError::DataError(format!(
                "{}: expected rows Accuracy, Precision, Recall, Specificity, found [{}]",
                path.display(),
                labels.join(", ")
            )));
        }
        Ok(Self {
            model: model.into(),
            values,
        })
    }
}

/// Write one row per model with every metric as a column
pub fn write_comparison(reports: &[MetricsReport], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let fmt = |r: &MetricsReport, m: Metric| {
        r.get(m).map(|v| format!("{:.1}", v)).unwrap_or_default()
    };

    let mut writer = csv::Writer::from_path(path)?;
    for report in reports {
        writer.serialize(ComparisonRow {
            model: report.model.clone(),
            accuracy: fmt(report, Metric::Accuracy),
            precision: fmt(report, Metric::Precision),
            recall: fmt(report, Metric::Recall),
            specificity: fmt(report, Metric::Specificity),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_golden_values() {
        let report = MetricsReport::from_confusion("svm", &ConfusionMatrix::new(5, 2, 10, 1));
        assert_eq!(report.get(Metric::Accuracy), Some(83.3));
        assert_eq!(report.get(Metric::Precision), Some(71.4));
        assert_eq!(report.get(Metric::Recall), Some(83.3));
        assert_eq!(report.get(Metric::Specificity), Some(83.3));
    }

    #[test]
    fn test_fixed_order() {
        let report = MetricsReport::from_confusion("knn", &ConfusionMatrix::new(1, 1, 1, 1));
        let order: Vec<Metric> = report.values().iter().map(|(m, _)| *m).collect();
        assert_eq!(order, Metric::ALL.to_vec());
    }

    #[test]
    fn test_undefined_reported_as_zero() {
        let report = MetricsReport::from_confusion("knn", &ConfusionMatrix::new(0, 0, 5, 3));
        assert_eq!(report.get(Metric::Precision), Some(0.0));
        assert_eq!(report.get(Metric::Specificity), Some(100.0));
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("svm_metrics.csv");
        MetricsReport::from_confusion("svm", &ConfusionMatrix::new(5, 2, 10, 1))
            .write_csv(&path)
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Metric,Value\nAccuracy,83.3\nPrecision,71.4\nRecall,83.3\nSpecificity,83.3\n"
        );
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let report = MetricsReport::from_confusion("m", &ConfusionMatrix::new(3, 0, 3, 0));
        report.write_csv(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        report.write_csv(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_read_rejects_wrong_rows() {
        let dir = tempdir().unwrap();
        let cases = [
            "Metric,Value\nAccuracy,83.3\nPrecision,71.4\nRecall,83.3\n",
            "Metric,Value\nAccuracy,83.3\nRecall,83.3\nPrecision,71.4\nSpecificity,83.3\n",
            "Metric,Value\nAccuracy,83.3\nPrecision,71.4\nRecall,83.3\nSpecificity,83.3\nAccuracy,50.0\n",
        ];
        for (i, text) in cases.iter().enumerate() {
            let path = dir.path().join(format!("bad_{}.csv", i));
            fs::write(&path, text).unwrap();
            let result = MetricsReport::read_csv(&path, "svm");
            assert!(matches!(result, Err(BenchError::DataError(_))), "case {}: {:?}", i, result);
        }
    }

    #[test]
    fn test_comparison_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("comparison.csv");
        let reports = vec![
            MetricsReport::from_confusion("svm", &ConfusionMatrix::new(5, 2, 10, 1)),
            MetricsReport::from_confusion("knn", &ConfusionMatrix::new(6, 0, 12, 0)),
        ];
        write_comparison(&reports, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Model,Accuracy,Precision,Recall,Specificity");
        assert_eq!(lines[1], "svm,83.3,71.4,83.3,83.3");
        assert_eq!(lines[2], "knn,100.0,100.0,100.0,100.0");
    }
}
