//! Classifier trait and shared input checks

use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};

/// Binary classifier over a dense model matrix.
///
/// Labels are `1.0` for the positive class and `0.0` otherwise.
pub trait Classifier: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict positive-class probabilities
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Predict class labels, thresholding probabilities at 0.5
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}

/// Validate a training matrix and its binary labels
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(BenchError::FitError("no training rows".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(BenchError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(BenchError::FitError(
            "training matrix contains non-finite values".to_string(),
        ));
    }
    if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(BenchError::FitError(format!("label {} is not 0 or 1", bad)));
    }
    Ok(())
}

/// Validate that a prediction matrix matches the fitted width
pub(crate) fn check_features(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(BenchError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

#[inline]
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct Constant(f64);

    impl Classifier for Constant {
        fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
            check_training_data(x, y)
        }

        fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(Array1::from_elem(x.nrows(), self.0))
        }
    }

    #[test]
    fn test_threshold_at_half() {
        let x = array![[0.0], [1.0]];
        assert_eq!(Constant(0.5).predict(&x).unwrap(), array![1.0, 1.0]);
        assert_eq!(Constant(0.49).predict(&x).unwrap(), array![0.0, 0.0]);
    }

    #[test]
    fn test_training_checks() {
        let mut model = Constant(0.0);
        assert!(model.fit(&array![[1.0]], &array![2.0]).is_err());
        assert!(model.fit(&array![[f64::NAN]], &array![1.0]).is_err());
        assert!(model.fit(&array![[1.0], [2.0]], &array![1.0]).is_err());
        assert!(model.fit(&array![[1.0]], &array![1.0]).is_ok());
    }

    #[test]
    fn test_sigmoid_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }
}
