//! Support Vector Machine classifier
//!
//! RBF-kernel soft-margin SVM trained with simplified SMO (Sequential
//! Minimal Optimization). The kernel follows the kernlab parameterisation
//! `K(x, y) = exp(-sigma * ||x - y||^2)`.

use super::models::{check_features, check_training_data, sigmoid, Classifier};
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// SVM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (`cost`)
    pub c: f64,
    /// RBF width (`rbf_sigma`)
    pub sigma: f64,
    /// Tolerance for stopping criterion
    pub tol: f64,
    /// Maximum number of sweeps over the data
    pub max_iter: usize,
    /// Random seed
    pub random_state: u64,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            sigma: 0.1,
            tol: 1e-3,
            max_iter: 1000,
            random_state: 42,
        }
    }
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    support_vectors: Option<Array2<f64>>,
    /// alpha_i * y_i for each support vector
    dual_coef: Array1<f64>,
    bias: f64,
}

impl SVMClassifier {
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            support_vectors: None,
            dual_coef: Array1::zeros(0),
            bias: 0.0,
        }
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map_or(0, |sv| sv.nrows())
    }

    fn kernel(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let dist_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
        (-self.config.sigma * dist_sq).exp()
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (0..n).map(|j| self.kernel(x.row(i), x.row(j))).collect())
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                k[[i, j]] = v;
            }
        }
        k
    }

    /// SMO over a precomputed kernel, keeping an error cache `f(x_i) - y_i`
    fn smo_train(&self, k: &Array2<f64>, y: &Array1<f64>) -> (Array1<f64>, f64) {
        let n = y.len();
        let c = self.config.c;
        let tol = self.config.tol;
        let mut alphas = Array1::<f64>::zeros(n);
        let mut bias = 0.0;
        let mut errors: Array1<f64> = -y.clone();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        let mut passes = 0;
        let max_passes = 5;
        let mut sweeps = 0;

        while passes < max_passes && sweeps < self.config.max_iter && n > 1 {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = errors[i];
                let violates = (y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0);
                if !violates {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                let e_j = errors[j];
                let (ai_old, aj_old) = (alphas[i], alphas[j]);

                let (l, h) = if y[i] != y[j] {
                    ((aj_old - ai_old).max(0.0), (c + aj_old - ai_old).min(c))
                } else {
                    ((ai_old + aj_old - c).max(0.0), (ai_old + aj_old).min(c))
                };
                if (h - l).abs() < 1e-12 {
                    continue;
                }

                let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                let aj = (aj_old - y[j] * (e_i - e_j) / eta).clamp(l, h);
                if (aj - aj_old).abs() < 1e-8 {
                    continue;
                }
                let ai = ai_old + y[i] * y[j] * (aj_old - aj);

                let b1 = bias - e_i - y[i] * (ai - ai_old) * k[[i, i]] - y[j] * (aj - aj_old) * k[[i, j]];
                let b2 = bias - e_j - y[i] * (ai - ai_old) * k[[i, j]] - y[j] * (aj - aj_old) * k[[j, j]];
                let new_bias = if ai > 0.0 && ai < c {
                    b1
                } else if aj > 0.0 && aj < c {
                    b2
                } else {
                    0.5 * (b1 + b2)
                };

                let di = y[i] * (ai - ai_old);
                let dj = y[j] * (aj - aj_old);
                let db = new_bias - bias;
                for t in 0..n {
                    errors[t] += di * k[[i, t]] + dj * k[[j, t]] + db;
                }

                alphas[i] = ai;
                alphas[j] = aj;
                bias = new_bias;
                num_changed += 1;
            }

            sweeps += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        (alphas, bias)
    }

    /// Signed distance-like score; positive means the positive class
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let sv = self.support_vectors.as_ref().ok_or(BenchError::ModelNotFitted)?;
        check_features(x, sv.ncols())?;

        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                sv.rows()
                    .into_iter()
                    .zip(self.dual_coef.iter())
                    .map(|(s, &coef)| coef * self.kernel(row, s))
                    .sum::<f64>()
                    + self.bias
            })
            .collect())
    }
}

impl Classifier for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if !(self.config.c > 0.0) || !(self.config.sigma > 0.0) {
            return Err(BenchError::FitError(format!(
                "cost ({}) and rbf_sigma ({}) must be positive",
                self.config.c, self.config.sigma
            )));
        }
        if x.nrows() > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(BenchError::FitError(format!(
                "{} rows exceed the {} row limit for the kernel matrix",
                x.nrows(),
                MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let signed = y.mapv(|v| if v == 1.0 { 1.0 } else { -1.0 });
        let k = self.compute_kernel_matrix(x);
        let (alphas, bias) = self.smo_train(&k, &signed);

        let support: Vec<usize> = (0..alphas.len()).filter(|&i| alphas[i] > 1e-8).collect();
        self.support_vectors = Some(x.select(ndarray::Axis(0), &support));
        self.dual_coef = support.iter().map(|&i| alphas[i] * signed[i]).collect();
        self.bias = bias;
        Ok(())
    }

    /// Logistic squashing of the decision function; 0.5 sits on the margin
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn create_separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0], [0.5, 0.2], [0.2, 0.6], [0.4, 0.4],
            [3.0, 3.0], [3.5, 2.8], [2.8, 3.4], [3.2, 3.3]
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_svm_rbf_separable() {
        let (x, y) = create_separable_data();
        let mut svm = SVMClassifier::new(SVMConfig {
            c: 10.0,
            sigma: 0.5,
            ..Default::default()
        });
        svm.fit(&x, &y).unwrap();

        assert_eq!(svm.predict(&x).unwrap(), y);
        assert!(svm.n_support_vectors() > 0);
    }

    #[test]
    fn test_svm_rejects_nonpositive_cost() {
        let (x, y) = create_separable_data();
        let mut svm = SVMClassifier::new(SVMConfig {
            c: 0.0,
            ..Default::default()
        });
        assert!(svm.fit(&x, &y).is_err());
    }

    #[test]
    fn test_svm_unfitted() {
        let svm = SVMClassifier::new(SVMConfig::default());
        assert!(matches!(
            svm.predict(&array![[1.0, 1.0]]),
            Err(BenchError::ModelNotFitted)
        ));
    }
}
