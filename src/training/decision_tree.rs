//! Decision tree implementation
//!
//! One CART learner serves both ensembles: on 0/1 labels the squared-error
//! criterion ranks splits exactly like Gini impurity, and leaf means are
//! positive-class probabilities. On gradient-boosting residuals it is an
//! ordinary regression tree.

use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Squared-error regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum node size eligible for a split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features sampled at each split; all when `None`
    pub max_features: Option<usize>,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

struct Candidate {
    feature_idx: usize,
    threshold: f64,
    score: f64,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set the number of features tried per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Fit on every row of `x`
    pub fn fit<R: Rng>(&mut self, x: &Array2<f64>, y: &Array1<f64>, rng: &mut R) -> Result<()> {
        let rows: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &rows, rng)
    }

    /// Fit on a row subset of `x`. Rows may repeat (bootstrap samples).
    pub fn fit_rows<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(BenchError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if rows.is_empty() {
            return Err(BenchError::FitError("tree fitted on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        let mut rows = rows.to_vec();
        self.root = Some(self.build(x, y, &mut rows, 0, rng));
        Ok(())
    }

    fn build<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &mut [usize],
        depth: usize,
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = rows.len();
        let sum: f64 = rows.iter().map(|&i| y[i]).sum();
        let value = sum / n_samples as f64;

        let pure = rows.iter().all(|&i| y[i] == y[rows[0]]);
        if pure
            || n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
        {
            return TreeNode::Leaf { value, n_samples };
        }

        let best = match self.best_split(x, y, rows, sum, rng) {
            Some(best) => best,
            None => return TreeNode::Leaf { value, n_samples },
        };

        // In-place partition keeps the recursion allocation-free
        let mut boundary = 0;
        for k in 0..rows.len() {
            if x[[rows[k], best.feature_idx]] <= best.threshold {
                rows.swap(k, boundary);
                boundary += 1;
            }
        }
        let (left_rows, right_rows) = rows.split_at_mut(boundary);

        let left = Box::new(self.build(x, y, left_rows, depth + 1, rng));
        let right = Box::new(self.build(x, y, right_rows, depth + 1, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Best split by reduction in squared error, over a random feature subset.
    fn best_split<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        total: f64,
        rng: &mut R,
    ) -> Option<Candidate> {
        let n = rows.len();
        let n_try = self.max_features.unwrap_or(self.n_features).min(self.n_features);
        let mut features: Vec<usize> = if n_try < self.n_features {
            rand::seq::index::sample(rng, self.n_features, n_try).into_vec()
        } else {
            (0..self.n_features).collect()
        };
        features.sort_unstable();

        // Maximising sum_l^2/n_l + sum_r^2/n_r minimises the children's SSE
        let parent_score = total * total / n as f64;
        let mut best: Option<Candidate> = None;
        let mut order: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature_idx in features {
            order.clear();
            order.extend(rows.iter().map(|&i| (x[[i, feature_idx]], y[i])));
            order.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += order[k].1;
                let n_left = k + 1;
                let n_right = n - n_left;
                if order[k].0 == order[k + 1].0
                    || n_left < self.min_samples_leaf
                    || n_right < self.min_samples_leaf
                {
                    continue;
                }
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64;

                if score > parent_score + 1e-12
                    && best.as_ref().map_or(true, |b| score > b.score)
                {
                    best = Some(Candidate {
                        feature_idx,
                        threshold: 0.5 * (order[k].0 + order[k + 1].0),
                        score,
                    });
                }
            }
        }
        best
    }

    /// Predict leaf values for every row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(BenchError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(BenchError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows().into_iter().map(|row| root.predict(row)).collect())
    }

    /// Depth of the fitted tree (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_separable_split() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_min_samples_split_stops_growth() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut tree = DecisionTree::new().with_min_samples_split(5);
        tree.fit(&x, &y, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();

        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict(&array![[0.0]]).unwrap()[0], 0.5);
    }

    #[test]
    fn test_regression_leaf_means() {
        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let y = array![1.0, 3.0, 10.0, 12.0];
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert_eq!(tree.predict(&array![[0.0], [1.0]]).unwrap(), array![2.0, 11.0]);
    }

    #[test]
    fn test_unfitted_predict() {
        let tree = DecisionTree::new();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(BenchError::ModelNotFitted)
        ));
    }
}
