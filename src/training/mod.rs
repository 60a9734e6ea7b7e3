//! Model training module
//!
//! Binary classifiers behind the [`Classifier`] trait:
//! - Decision trees and Random Forests
//! - Gradient boosting
//! - Penalized logistic regression
//! - K-Nearest Neighbors
//! - Neural networks (single hidden layer MLP)
//! - Support Vector Machines (RBF kernel)
//!
//! plus the cross-validation resampling plan used while tuning them.

mod config;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod neural_network;
pub mod random_forest;
pub mod svm;

pub use config::ModelFamily;
pub use cross_validation::{CVResults, CVStrategy, Fold, FoldPlan};
pub use decision_tree::{DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use knn::{KNNClassifier, KNNConfig, WeightFunc};
pub use linear_models::LogisticRegression;
pub use models::Classifier;
pub use neural_network::{Activation, MLPClassifier, MLPConfig};
pub use random_forest::RandomForest;
pub use svm::{SVMClassifier, SVMConfig};
