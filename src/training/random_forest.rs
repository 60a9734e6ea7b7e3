//! Random Forest implementation

use super::decision_tree::DecisionTree;
use super::models::{check_features, check_training_data, Classifier};
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest classifier (bootstrap + per-split feature sampling)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Features sampled at each split (`mtry`)
    pub max_features: Option<usize>,
    /// Minimum node size eligible for a split (`min_n`)
    pub min_samples_split: usize,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random state
    pub random_state: u64,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(500)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_features: None,
            min_samples_split: 2,
            bootstrap: true,
            random_state: 42,
            n_features: 0,
        }
    }

    /// Set the number of features tried per split
    pub fn with_max_features(mut self, mtry: usize) -> Self {
        self.max_features = Some(mtry);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// `sqrt(p)` rounded down, the usual classification default
    fn resolve_max_features(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features.max(1))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(BenchError::FitError("forest needs at least one tree".to_string()));
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        let mtry = self.resolve_max_features(self.n_features);
        let base_seed = self.random_state;
        let bootstrap = self.bootstrap;
        let min_split = self.min_samples_split;

        // Each tree owns an RNG derived from its index, so results do not
        // depend on how rayon schedules the trees
        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let rows: Vec<usize> = if bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(min_split)
                    .with_max_features(mtry);
                tree.fit_rows(x, y, &rows, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(())
    }

    /// Mean of the trees' leaf class proportions
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(BenchError::ModelNotFitted);
        }
        check_features(x, self.n_features)?;

        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;
        // Summed in tree order so repeated calls agree bit for bit
        let sum = per_tree
            .into_iter()
            .fold(Array1::zeros(x.nrows()), |acc, p| acc + p);
        Ok(sum / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.1], [0.2, 0.0], [0.1, 0.3], [0.3, 0.2], [0.2, 0.2],
            [2.0, 2.1], [2.2, 1.9], [1.9, 2.3], [2.1, 2.0], [2.3, 2.2]
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_forest_separates_blobs() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(25).with_random_state(7);
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.n_trees(), 25);
        assert_eq!(rf.predict(&array![[0.1, 0.1], [2.1, 2.1]]).unwrap(), array![0.0, 1.0]);
    }

    #[test]
    fn test_forest_is_deterministic() {
        let (x, y) = blobs();
        let mut a = RandomForest::new(10).with_max_features(1).with_random_state(3);
        let mut b = RandomForest::new(10).with_max_features(1).with_random_state(3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_mtry_clamped() {
        let rf = RandomForest::new(1).with_max_features(50);
        assert_eq!(rf.resolve_max_features(3), 3);
        assert_eq!(RandomForest::new(1).resolve_max_features(9), 3);
    }

    #[test]
    fn test_unfitted() {
        let rf = RandomForest::new(3);
        assert!(rf.predict(&array![[1.0, 2.0]]).is_err());
    }
}
