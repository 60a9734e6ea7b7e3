//! Confusion matrix and binary classification metrics

use crate::error::{BenchError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Evaluation metric, positive class = `1.0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    Precision,
    Recall,
    Specificity,
}

impl Metric {
    /// Report order
    pub const ALL: [Metric; 4] = [
        Metric::Accuracy,
        Metric::Precision,
        Metric::Recall,
        Metric::Specificity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
            Metric::Specificity => "specificity",
        }
    }

    /// Capitalised label used in CSV files
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Accuracy => "Accuracy",
            Metric::Precision => "Precision",
            Metric::Recall => "Recall",
            Metric::Specificity => "Specificity",
        }
    }

    /// Value as a fraction in [0, 1]; `None` when the denominator is zero
    pub fn compute(&self, cm: &ConfusionMatrix) -> Option<f64> {
        let ratio = |num: usize, den: usize| (den > 0).then(|| num as f64 / den as f64);
        match self {
            Metric::Accuracy => ratio(cm.tp + cm.tn, cm.total()),
            Metric::Precision => ratio(cm.tp, cm.tp + cm.fp),
            Metric::Recall => ratio(cm.tp, cm.tp + cm.fn_),
            Metric::Specificity => ratio(cm.tn, cm.tn + cm.fp),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "accuracy" => Ok(Metric::Accuracy),
            "precision" => Ok(Metric::Precision),
            "recall" | "sensitivity" => Ok(Metric::Recall),
            "specificity" => Ok(Metric::Specificity),
            _ => Err(BenchError::UnknownMetric(s.to_string())),
        }
    }
}

/// Counts of a binary confusion matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn new(tp: usize, fp: usize, tn: usize, fn_: usize) -> Self {
        Self { tp, fp, tn, fn_ }
    }

    /// Tally predictions against truth. Both must be equally long and hold
    /// only `0.0`/`1.0`.
    pub fn from_labels(truth: &Array1<f64>, predicted: &Array1<f64>) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(BenchError::MetricError(format!(
                "{} predictions for {} labels",
                predicted.len(),
                truth.len()
            )));
        }

        let mut cm = Self::default();
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            match (is_positive(t)?, is_positive(p)?) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }
}

fn is_positive(label: f64) -> Result<bool> {
    if label == 1.0 {
        Ok(true)
    } else if label == 0.0 {
        Ok(false)
    } else {
        Err(BenchError::MetricError(format!("label {} is not 0 or 1", label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_confusion_from_labels() {
        let truth = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let cm = ConfusionMatrix::from_labels(&truth, &pred).unwrap();
        assert_eq!(cm, ConfusionMatrix::new(3, 1, 3, 1));
    }

    #[test]
    fn test_metric_fractions() {
        let cm = ConfusionMatrix::new(5, 2, 10, 1);
        assert_relative_eq!(Metric::Accuracy.compute(&cm).unwrap(), 15.0 / 18.0);
        assert_relative_eq!(Metric::Precision.compute(&cm).unwrap(), 5.0 / 7.0);
        assert_relative_eq!(Metric::Recall.compute(&cm).unwrap(), 5.0 / 6.0);
        assert_relative_eq!(Metric::Specificity.compute(&cm).unwrap(), 10.0 / 12.0);
    }

    #[test]
    fn test_zero_denominator_is_undefined() {
        let cm = ConfusionMatrix::new(0, 0, 4, 2);
        assert_eq!(Metric::Precision.compute(&cm), None);
        assert_eq!(Metric::Recall.compute(&cm), Some(0.0));
    }

    #[test]
    fn test_malformed_predictions() {
        let truth = array![1.0, 0.0];
        assert!(matches!(
            ConfusionMatrix::from_labels(&truth, &array![1.0]),
            Err(BenchError::MetricError(_))
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&truth, &array![1.0, 2.0]),
            Err(BenchError::MetricError(_))
        ));
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("Accuracy".parse::<Metric>().unwrap(), Metric::Accuracy);
        assert_eq!("sensitivity".parse::<Metric>().unwrap(), Metric::Recall);
        assert!(matches!("roc_auc".parse::<Metric>(), Err(BenchError::UnknownMetric(_))));
    }
}
