//! Error types for the benchmark

use thiserror::Error;

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Main error type
///
/// Every error belongs to exactly one pipeline. The benchmark collects them per
/// model family instead of propagating across pipelines.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Metric '{0}' was not computed during tuning")]
    UnknownMetric(String),

    #[error("Fit failed: {0}")]
    FitError(String),

    #[error("Convergence failed after {iterations} iterations")]
    ConvergenceError { iterations: usize },

    #[error("Worker pool error: {0}")]
    ResourceError(String),

    #[error("Metric computation error: {0}")]
    MetricError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BenchError {
    /// True for the configuration family of errors
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            BenchError::ConfigError(_) | BenchError::InvalidParameter { .. } | BenchError::UnknownMetric(_)
        )
    }
}

impl From<polars::error::PolarsError> for BenchError {
    fn from(err: polars::error::PolarsError) -> Self {
        BenchError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for BenchError {
    fn from(err: ndarray::ShapeError) -> Self {
        BenchError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for BenchError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        BenchError::ResourceError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::UnknownMetric("roc_auc".to_string());
        assert_eq!(err.to_string(), "Metric 'roc_auc' was not computed during tuning");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BenchError = io_err.into();
        assert!(matches!(err, BenchError::IoError(_)));
    }

    #[test]
    fn test_config_family() {
        assert!(BenchError::ConfigError("x".into()).is_config());
        assert!(!BenchError::FitError("x".into()).is_config());
    }
}
