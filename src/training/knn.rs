//! K-Nearest Neighbors classifier
//!
//! Weighted voting in the style of kknn: distances to the k nearest
//! neighbors are divided by the distance to the (k+1)-th, and a kernel turns
//! the scaled distances into vote weights.

use super::models::{check_features, check_training_data, Classifier};
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kernel turning scaled distances in [0, 1] into vote weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightFunc {
    /// Every neighbor votes equally
    Rectangular,
    /// `1 - d`
    Triangular,
    /// `1 / d`
    Inv,
    /// Standard normal density of `d`
    Gaussian,
}

impl WeightFunc {
    pub const ALL: [WeightFunc; 4] = [
        WeightFunc::Rectangular,
        WeightFunc::Triangular,
        WeightFunc::Inv,
        WeightFunc::Gaussian,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WeightFunc::Rectangular => "rectangular",
            WeightFunc::Triangular => "triangular",
            WeightFunc::Inv => "inv",
            WeightFunc::Gaussian => "gaussian",
        }
    }

    fn weight(&self, d: f64) -> f64 {
        match self {
            WeightFunc::Rectangular => 0.5,
            WeightFunc::Triangular => (1.0 - d).max(0.0),
            WeightFunc::Inv => 1.0 / d.max(1e-6),
            WeightFunc::Gaussian => (-0.5 * d * d).exp() / (2.0 * std::f64::consts::PI).sqrt(),
        }
    }
}

impl fmt::Display for WeightFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeightFunc {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        WeightFunc::ALL
            .into_iter()
            .find(|w| w.name() == s)
            .ok_or_else(|| BenchError::ConfigError(format!("unknown weight function '{}'", s)))
    }
}

/// KNN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors (`neighbors`)
    pub k: usize,
    /// Vote kernel (`weight_func`)
    pub weight_func: WeightFunc,
    /// Minkowski exponent (`dist_power`)
    pub dist_power: f64,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            k: 5,
            weight_func: WeightFunc::Rectangular,
            dist_power: 2.0,
        }
    }
}

/// KNN Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with k neighbors and default settings
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            k,
            ..Default::default()
        })
    }

    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let p = self.config.dist_power;
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs().powf(p))
            .sum::<f64>()
            .powf(1.0 / p)
    }

    /// Weighted share of positive votes among the neighbors of `row`
    fn score_row(&self, x_train: &Array2<f64>, y_train: &Array1<f64>, row: ArrayView1<f64>) -> f64 {
        let mut dists: Vec<(f64, usize)> = x_train
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, r)| (self.distance(row, r), i))
            .collect();
        // Stable sort: ties keep training order
        dists.sort_by(|a, b| a.0.total_cmp(&b.0));

        let k = self.config.k.min(dists.len());
        let scale = dists
            .get(k)
            .map(|d| d.0)
            .unwrap_or_else(|| dists[k - 1].0)
            .max(1e-6);

        let (mut positive, mut total) = (0.0, 0.0);
        for &(d, i) in &dists[..k] {
            let w = self.config.weight_func.weight(d / scale);
            positive += w * y_train[i];
            total += w;
        }

        if total > 0.0 {
            positive / total
        } else {
            // Every weight vanished, fall back to an unweighted vote
            dists[..k].iter().map(|&(_, i)| y_train[i]).sum::<f64>() / k as f64
        }
    }
}

impl Classifier for KNNClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.config.k == 0 {
            return Err(BenchError::FitError("k must be at least 1".to_string()));
        }
        if !(self.config.dist_power >= 1.0) {
            return Err(BenchError::FitError(format!(
                "dist_power {} is below 1",
                self.config.dist_power
            )));
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(BenchError::ModelNotFitted),
        };
        check_features(x, x_train.ncols())?;

        Ok(x
            .rows()
            .into_iter()
            .map(|row| self.score_row(x_train, y_train, row))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0], [0.1, 0.2], [0.2, 0.1],
            [5.0, 5.0], [5.1, 5.2], [5.2, 5.1]
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = create_classification_data();
        for weight_func in WeightFunc::ALL {
            let mut knn = KNNClassifier::new(KNNConfig {
                k: 3,
                weight_func,
                dist_power: 2.0,
            });
            knn.fit(&x, &y).unwrap();
            assert_eq!(knn.predict(&array![[0.1, 0.1], [5.0, 5.1]]).unwrap(), array![0.0, 1.0]);
        }
    }

    #[test]
    fn test_manhattan_distance() {
        let knn = KNNClassifier::new(KNNConfig {
            dist_power: 1.0,
            ..Default::default()
        });
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert!((knn.distance(a.view(), b.view()) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_weights_favor_close_neighbor() {
        let x = array![[0.0], [1.0], [1.1], [10.0]];
        let y = array![1.0, 0.0, 0.0, 0.0];
        let mut knn = KNNClassifier::new(KNNConfig {
            k: 3,
            weight_func: WeightFunc::Inv,
            dist_power: 2.0,
        });
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[0.05]]).unwrap()[0], 1.0);
    }

    #[test]
    fn test_weight_func_parse() {
        assert_eq!("inv".parse::<WeightFunc>().unwrap(), WeightFunc::Inv);
        assert!("cosine".parse::<WeightFunc>().is_err());
    }
}
