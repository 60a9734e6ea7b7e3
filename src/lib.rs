//! thyroid-bench - classifier benchmark on thyroid cancer recurrence
//!
//! Six classification families are tuned by grid search over a stratified
//! cross-validation plan, refitted on the training partition and scored on
//! a held-out test partition.
//!
//! # Modules
//!
//! - [`data`] - Raw dataset loading, train/test split, shared artifacts
//! - [`preprocessing`] - Correlation filter, normalization, dummy encoding
//! - [`training`] - The six classifiers and the cross-validation plan
//! - [`tuning`] - Model specifications, grid search, selection
//! - [`evaluation`] - Test-set metrics and their CSV reports
//! - [`pipeline`] - Per-family pipelines and the full benchmark
//! - [`config`] - Benchmark configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data and preprocessing
pub mod data;
pub mod preprocessing;

// Models, tuning and evaluation
pub mod training;
pub mod tuning;
pub mod evaluation;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{BenchError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{BenchError, Result};

    // Configuration
    pub use crate::config::BenchConfig;

    // Data
    pub use crate::data::{load_csv, Artifacts, ClassLabels, Column, Dataset, DatasetSplit, Table};

    // Preprocessing
    pub use crate::preprocessing::{FittedRecipe, Recipe};

    // Training
    pub use crate::training::{Classifier, FoldPlan, ModelFamily};

    // Tuning
    pub use crate::tuning::{
        select_best, show_best, EstimatorFactory, GridPoint, HyperParam, ModelSpec, ParamValue,
        SearchSpace, TuningResult, TuningRunner,
    };

    // Evaluation
    pub use crate::evaluation::{ConfusionMatrix, Metric, MetricsReport};

    // Pipelines
    pub use crate::pipeline::{Benchmark, BenchmarkReport, ModelPipeline};
}
