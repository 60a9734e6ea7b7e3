//! Neural Network (Multi-Layer Perceptron) implementation
//!
//! One hidden layer, logistic output, cross-entropy loss, weight decay and
//! mini-batch gradient descent with momentum.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::models::{check_features, check_training_data, sigmoid, Classifier};
use crate::error::{BenchError, Result};

/// Hidden layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified Linear Unit
    ReLU,
    /// Logistic sigmoid
    #[default]
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
}

impl Activation {
    fn apply(&self, z: f64) -> f64 {
        match self {
            Activation::ReLU => z.max(0.0),
            Activation::Sigmoid => sigmoid(z),
            Activation::Tanh => z.tanh(),
        }
    }

    /// Derivative expressed through the activation output `a`
    fn derivative(&self, a: f64) -> f64 {
        match self {
            Activation::ReLU => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => a * (1.0 - a),
            Activation::Tanh => 1.0 - a * a,
        }
    }
}

/// Neural Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Hidden layer size (`hidden_units`)
    pub hidden_units: usize,
    /// Activation function for the hidden layer
    pub activation: Activation,
    /// Learning rate (`learn_rate`)
    pub learning_rate: f64,
    /// Number of passes over the data (`epochs`)
    pub epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// L2 weight decay (`penalty`)
    pub alpha: f64,
    /// Momentum
    pub momentum: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for MLPConfig {
    fn default() -> Self {
        Self {
            hidden_units: 5,
            activation: Activation::Sigmoid,
            learning_rate: 0.05,
            epochs: 100,
            batch_size: 32,
            alpha: 0.0,
            momentum: 0.9,
            random_state: 42,
        }
    }
}

/// Multi-Layer Perceptron Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPClassifier {
    config: MLPConfig,
    /// Input to hidden weights, `n_features x hidden_units`
    w1: Array2<f64>,
    b1: Array1<f64>,
    /// Hidden to output weights
    w2: Array1<f64>,
    b2: f64,
    is_fitted: bool,
}

impl MLPClassifier {
    pub fn new(config: MLPConfig) -> Self {
        Self {
            config,
            w1: Array2::zeros((0, 0)),
            b1: Array1::zeros(0),
            w2: Array1::zeros(0),
            b2: 0.0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &MLPConfig {
        &self.config
    }

    /// Xavier-uniform initialisation
    fn initialize_weights(&mut self, n_features: usize, rng: &mut Xoshiro256PlusPlus) {
        let h = self.config.hidden_units;
        let limit1 = (6.0 / (n_features + h) as f64).sqrt();
        let limit2 = (6.0 / (h + 1) as f64).sqrt();
        self.w1 = Array2::from_shape_fn((n_features, h), |_| rng.gen_range(-limit1..limit1));
        self.b1 = Array1::zeros(h);
        self.w2 = Array1::from_shape_fn(h, |_| rng.gen_range(-limit2..limit2));
        self.b2 = 0.0;
    }

    fn hidden(&self, x: &Array2<f64>) -> Array2<f64> {
        let activation = self.config.activation;
        (x.dot(&self.w1) + &self.b1).mapv(|z| activation.apply(z))
    }

    fn validate_config(&self) -> Result<()> {
        let c = &self.config;
        if c.hidden_units == 0 || c.epochs == 0 || c.batch_size == 0 {
            return Err(BenchError::FitError(
                "hidden_units, epochs and batch size must be positive".to_string(),
            ));
        }
        if !(c.learning_rate > 0.0) || c.alpha < 0.0 {
            return Err(BenchError::FitError(format!(
                "learning rate {} / penalty {} out of range",
                c.learning_rate, c.alpha
            )));
        }
        Ok(())
    }
}

impl Classifier for MLPClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate_config()?;

        let n_samples = x.nrows();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        self.initialize_weights(x.ncols(), &mut rng);

        let lr = self.config.learning_rate;
        let mom = self.config.momentum;
        let decay = self.config.alpha;
        let activation = self.config.activation;

        let mut v_w1 = Array2::<f64>::zeros(self.w1.raw_dim());
        let mut v_b1 = Array1::<f64>::zeros(self.b1.len());
        let mut v_w2 = Array1::<f64>::zeros(self.w2.len());
        let mut v_b2 = 0.0;

        let mut order: Vec<usize> = (0..n_samples).collect();
        for _ in 0..self.config.epochs {
            order.shuffle(&mut rng);

            for batch in order.chunks(self.config.batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb: Array1<f64> = batch.iter().map(|&i| y[i]).collect();
                let m = batch.len() as f64;

                // Forward
                let a1 = self.hidden(&xb);
                let out = (a1.dot(&self.w2) + self.b2).mapv(sigmoid);

                // Cross-entropy with a logistic output: dL/dz = p - y
                let delta2 = &out - &yb;
                let grad_w2 = a1.t().dot(&delta2) / m + decay * &self.w2;
                let grad_b2 = delta2.sum() / m;

                let mut delta1 = delta2
                    .view()
                    .insert_axis(Axis(1))
                    .dot(&self.w2.view().insert_axis(Axis(0)));
                delta1.zip_mut_with(&a1, |d, &a| *d *= activation.derivative(a));
                let grad_w1 = xb.t().dot(&delta1) / m + decay * &self.w1;
                let grad_b1 = delta1.sum_axis(Axis(0)) / m;

                v_w1 = mom * &v_w1 - lr * &grad_w1;
                v_b1 = mom * &v_b1 - lr * &grad_b1;
                v_w2 = mom * &v_w2 - lr * &grad_w2;
                v_b2 = mom * v_b2 - lr * grad_b2;

                self.w1 += &v_w1;
                self.b1 += &v_b1;
                self.w2 += &v_w2;
                self.b2 += v_b2;
            }

            if !self.b2.is_finite() {
                return Err(BenchError::ConvergenceError {
                    iterations: self.config.epochs,
                });
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(BenchError::ModelNotFitted);
        }
        check_features(x, self.w1.nrows())?;
        Ok((self.hidden(x).dot(&self.w2) + self.b2).mapv(sigmoid))
    }
}
