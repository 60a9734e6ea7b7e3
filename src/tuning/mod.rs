//! Hyperparameter tuning
//!
//! A [`ModelSpec`] declares which hyperparameters of a model family are fixed
//! and which are tuned over a [`SearchSpace`]. The [`TuningRunner`] evaluates
//! every point of the resulting regular grid on a cross-validation plan, and
//! [`select_best`] picks the winner by mean score.

mod result;
mod runner;
mod search_space;
mod select;
mod spec;

pub use result::{CandidateResult, FoldPredictions, TuningResult};
pub use runner::{default_workers, TuningRunner};
pub use search_space::{regular_grid, GridPoint, HyperParam, ParamValue, Scale, SearchSpace};
pub use select::{select_best, show_best};
pub use spec::{EstimatorFactory, ModelSpec};
