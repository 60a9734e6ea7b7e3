//! Data preprocessing module
//!
//! A [`Recipe`] is an ordered list of steps:
//! - Correlation filtering of numeric predictors
//! - Normalization (z-score)
//! - Categorical dummy encoding
//!
//! `prep` fits the steps on training rows and returns a [`FittedRecipe`]
//! whose parameters never change; `bake` applies it to any table.

mod encoder;
mod recipe;
mod scaler;
pub mod feature_selection;

pub use encoder::DummyEncoder;
pub use feature_selection::CorrelationFilter;
pub use recipe::{FittedRecipe, FittedStep, Recipe, Step};
pub use scaler::StandardScaler;
