//! Gradient Boosting implementation
//!
//! Binary log-loss boosting of shallow regression trees on the
//! pseudo-residuals `y - p`.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use super::models::{check_features, check_training_data, sigmoid, Classifier};
use crate::error::{BenchError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (`trees`)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth (`tree_depth`)
    pub max_depth: usize,
    /// Minimum node size eligible for a split (`min_n`)
    pub min_samples_split: usize,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_samples_split: 2,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    fn validate_config(&self) -> Result<()> {
        let c = &self.config;
        if c.n_estimators == 0 {
            return Err(BenchError::FitError("boosting needs at least one tree".to_string()));
        }
        if !(c.learning_rate > 0.0 && c.learning_rate <= 1.0) {
            return Err(BenchError::FitError(format!(
                "learning rate {} outside (0, 1]",
                c.learning_rate
            )));
        }
        if !(c.subsample > 0.0 && c.subsample <= 1.0) {
            return Err(BenchError::FitError(format!(
                "subsample {} outside (0, 1]",
                c.subsample
            )));
        }
        Ok(())
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil().max(1.0) as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices
    }
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate_config()?;

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.trees.clear();

        // Start from the prior log odds, clipped for single-class folds
        let p = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
        self.initial_log_odds = (p / (1.0 - p)).ln();
        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        for _ in 0..self.config.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(log_odds.iter())
                .map(|(yi, lo)| yi - sigmoid(*lo))
                .collect();

            let rows = self.subsample_indices(n_samples, &mut rng);
            let mut tree = DecisionTree::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_split(self.config.min_samples_split);
            tree.fit_rows(x, &residuals, &rows, &mut rng)?;

            let update = tree.predict(x)?;
            log_odds.scaled_add(self.config.learning_rate, &update);
            self.trees.push(tree);
        }

        if log_odds.iter().any(|v| !v.is_finite()) {
            return Err(BenchError::ConvergenceError {
                iterations: self.config.n_estimators,
            });
        }
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(BenchError::ModelNotFitted);
        }
        check_features(x, self.n_features)?;

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            log_odds.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(log_odds.mapv(sigmoid))
    }
}
