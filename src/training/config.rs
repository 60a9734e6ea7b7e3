//! Model family identifiers

use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six benchmarked classification families
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    NeuralNetwork,
    GradientBoosting,
    Svm,
    LogisticRegression,
    Knn,
    RandomForest,
}

impl ModelFamily {
    /// Every family, in report order
    pub const ALL: [ModelFamily; 6] = [
        ModelFamily::NeuralNetwork,
        ModelFamily::GradientBoosting,
        ModelFamily::Svm,
        ModelFamily::LogisticRegression,
        ModelFamily::Knn,
        ModelFamily::RandomForest,
    ];

    /// Identifier used in file names and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::NeuralNetwork => "neural_network",
            ModelFamily::GradientBoosting => "gradient_boosting",
            ModelFamily::Svm => "svm",
            ModelFamily::LogisticRegression => "logistic_regression",
            ModelFamily::Knn => "knn",
            ModelFamily::RandomForest => "random_forest",
        }
    }

    /// Human-readable label for reports
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::NeuralNetwork => "Neural Network",
            ModelFamily::GradientBoosting => "Gradient Boosting",
            ModelFamily::Svm => "SVM",
            ModelFamily::LogisticRegression => "Logistic Regression",
            ModelFamily::Knn => "KNN",
            ModelFamily::RandomForest => "Random Forest",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "neural_network" | "nn" | "mlp" => Ok(ModelFamily::NeuralNetwork),
            "gradient_boosting" | "xgboost" | "gbm" => Ok(ModelFamily::GradientBoosting),
            "svm" => Ok(ModelFamily::Svm),
            "logistic_regression" | "logistic" => Ok(ModelFamily::LogisticRegression),
            "knn" => Ok(ModelFamily::Knn),
            "random_forest" | "rf" => Ok(ModelFamily::RandomForest),
            _ => Err(BenchError::ConfigError(format!("unknown model family '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for family in ModelFamily::ALL {
            assert_eq!(family.name().parse::<ModelFamily>().unwrap(), family);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("RF".parse::<ModelFamily>().unwrap(), ModelFamily::RandomForest);
        assert_eq!("neural-network".parse::<ModelFamily>().unwrap(), ModelFamily::NeuralNetwork);
        assert!("naive_bayes".parse::<ModelFamily>().is_err());
    }

    #[test]
    fn test_serde_name() {
        let json = serde_json::to_string(&ModelFamily::LogisticRegression).unwrap();
        assert_eq!(json, "\"logistic_regression\"");
    }
}
