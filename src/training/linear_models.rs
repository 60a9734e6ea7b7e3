//! Linear models
//!
//! Penalized logistic regression with the glmnet objective
//!
//! `-loglik / n + penalty * ((1 - mixture) / 2 * ||w||^2 + mixture * ||w||_1)`
//!
//! solved by accelerated proximal gradient descent (FISTA). The intercept is
//! not penalized.

use super::models::{check_features, check_training_data, sigmoid, Classifier};
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Elastic-net logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: f64,
    /// Overall regularization strength (`penalty`)
    pub penalty: f64,
    /// Share of L1 in the penalty, 0 = ridge, 1 = lasso (`mixture`)
    pub mixture: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the largest coefficient change
    pub tol: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

fn soft_threshold(v: f64, t: f64) -> f64 {
    if v > t {
        v - t
    } else if v < -t {
        v + t
    } else {
        0.0
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            penalty: 0.0,
            mixture: 1.0,
            max_iter: 5000,
            tol: 1e-7,
        }
    }

    /// Set regularization strength
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    /// Set the L1 share of the penalty
    pub fn with_mixture(mut self, mixture: f64) -> Self {
        self.mixture = mixture;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Gradient of the mean negative log-likelihood plus the ridge part
    fn gradient(&self, x: &Array2<f64>, y: &Array1<f64>, w: &Array1<f64>, b: f64) -> (Array1<f64>, f64) {
        let n = x.nrows() as f64;
        let residual = (x.dot(w) + b).mapv(sigmoid) - y;
        let ridge = self.penalty * (1.0 - self.mixture);
        let grad_w = x.t().dot(&residual) / n + ridge * w;
        let grad_b = residual.sum() / n;
        (grad_w, grad_b)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.penalty < 0.0 || !(0.0..=1.0).contains(&self.mixture) {
            return Err(BenchError::FitError(format!(
                "penalty {} / mixture {} out of range",
                self.penalty, self.mixture
            )));
        }

        let n = x.nrows() as f64;
        let p = x.ncols();

        // Lipschitz bound of the smooth part: ||[X 1]||_F^2 / (4n) + ridge
        let frob = x.iter().map(|v| v * v).sum::<f64>() + n;
        let lipschitz = frob / (4.0 * n) + self.penalty * (1.0 - self.mixture);
        let step = 1.0 / lipschitz.max(1e-12);
        let l1 = self.penalty * self.mixture * step;

        let mut w = Array1::<f64>::zeros(p);
        let mut b = 0.0;
        let mut w_momentum = w.clone();
        let mut b_momentum = b;
        let mut t = 1.0f64;
        let mut converged = false;

        for _ in 0..self.max_iter {
            let (grad_w, grad_b) = self.gradient(x, y, &w_momentum, b_momentum);

            let w_next: Array1<f64> = (&w_momentum - &(step * &grad_w)).mapv(|v| soft_threshold(v, l1));
            let b_next = b_momentum - step * grad_b;

            let t_next = 0.5 * (1.0 + (1.0 + 4.0 * t * t).sqrt());
            let momentum = (t - 1.0) / t_next;
            w_momentum = &w_next + &(momentum * (&w_next - &w));
            b_momentum = b_next + momentum * (b_next - b);

            let change = w_next
                .iter()
                .zip(w.iter())
                .map(|(a, c)| (a - c).abs())
                .fold((b_next - b).abs(), f64::max);

            w = w_next;
            b = b_next;
            t = t_next;

            if !b.is_finite() {
                return Err(BenchError::FitError("coefficients diverged".to_string()));
            }
            if change < self.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::debug!(max_iter = self.max_iter, "logistic regression hit the iteration limit");
        }

        self.coefficients = Some(w);
        self.intercept = b;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(BenchError::ModelNotFitted)?;
        check_features(x, coefficients.len())?;
        Ok((x.dot(coefficients) + self.intercept).mapv(sigmoid))
    }
}
