//! Preprocessing recipe: an ordered list of steps fitted once, applied many times

use super::encoder::DummyEncoder;
use super::feature_selection::CorrelationFilter;
use super::scaler::StandardScaler;
use crate::data::{Column, Table};
use crate::error::{BenchError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Unfitted preprocessing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Drop numeric predictors with absolute pairwise correlation above `threshold`
    Correlation { threshold: f64 },
    /// Center and scale numeric predictors
    Normalize,
    /// Expand categorical predictors into indicator columns
    Dummy { one_hot: bool },
}

/// Fitted preprocessing step with frozen parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedStep {
    Correlation(CorrelationFilter),
    Normalize(StandardScaler),
    Dummy(DummyEncoder),
}

impl FittedStep {
    fn transform(&self, table: &Table) -> Result<Table> {
        match self {
            FittedStep::Correlation(f) => f.transform(table),
            FittedStep::Normalize(s) => s.transform(table),
            FittedStep::Dummy(e) => e.transform(table),
        }
    }
}

/// Ordered, deterministic sequence of feature transformations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    steps: Vec<Step>,
}

impl Recipe {
    /// Empty recipe
    pub fn new() -> Self {
        Self::default()
    }

    /// Correlation filter, then normalization, then dummy encoding
    pub fn standard(corr_threshold: f64) -> Self {
        Self::new()
            .step_corr(corr_threshold)
            .step_normalize()
            .step_dummy()
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_corr(self, threshold: f64) -> Self {
        self.step(Step::Correlation { threshold })
    }

    pub fn step_normalize(self) -> Self {
        self.step(Step::Normalize)
    }

    pub fn step_dummy(self) -> Self {
        self.step(Step::Dummy { one_hot: false })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Fit every step on `data`, in order. Each step sees the output of the
    /// previous one.
    pub fn prep(&self, data: &Table) -> Result<FittedRecipe> {
        if data.n_rows() == 0 {
            return Err(BenchError::DataError(
                "cannot prep a recipe on an empty table".to_string(),
            ));
        }

        let mut current = data.clone();
        let mut fitted = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let fitted_step = match step {
                Step::Correlation { threshold } => {
                    FittedStep::Correlation(CorrelationFilter::fit(&current, *threshold)?)
                }
                Step::Normalize => FittedStep::Normalize(StandardScaler::fit(&current)?),
                Step::Dummy { one_hot } => FittedStep::Dummy(DummyEncoder::fit(&current, *one_hot)?),
            };
            current = fitted_step.transform(&current)?;
            fitted.push(fitted_step);
        }

        if let Some((name, _)) = current.iter().find(|(_, col)| !col.is_numeric()) {
            return Err(BenchError::ConfigError(format!(
                "recipe leaves categorical predictor '{}' unencoded",
                name
            )));
        }

        let feature_names = current.names().to_vec();
        debug!(
            inputs = data.n_cols(),
            features = feature_names.len(),
            "recipe prepped"
        );

        Ok(FittedRecipe {
            input_names: data.names().to_vec(),
            feature_names,
            steps: fitted,
        })
    }
}

/// A recipe whose parameters were estimated on training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedRecipe {
    input_names: Vec<String>,
    feature_names: Vec<String>,
    steps: Vec<FittedStep>,
}

impl FittedRecipe {
    /// Apply the frozen steps to `data` and return the model matrix
    pub fn bake(&self, data: &Table) -> Result<Array2<f64>> {
        // Reorder input columns to the layout seen at prep time
        let mut current = Table::new();
        for name in &self.input_names {
            let col = data.column(name).ok_or_else(|| {
                BenchError::DataError(format!("predictor '{}' missing from baked data", name))
            })?;
            current.push_column(name.clone(), col.clone())?;
        }

        for step in &self.steps {
            current = step.transform(&current)?;
        }

        if current.names() != self.feature_names.as_slice() {
            return Err(BenchError::ShapeError {
                expected: format!("{} features", self.feature_names.len()),
                actual: format!("{} features", current.n_cols()),
            });
        }

        let n_rows = data.n_rows();
        let n_cols = current.n_cols();
        let mut x = Array2::zeros((n_rows, n_cols));
        for (j, (_, col)) in current.iter().enumerate() {
            match col {
                Column::Numeric(values) => {
                    for (i, &v) in values.iter().enumerate() {
                        x[[i, j]] = v;
                    }
                }
                Column::Categorical(_) => {
                    return Err(BenchError::ConfigError(format!(
                        "feature '{}' is still categorical after baking",
                        self.feature_names[j]
                    )))
                }
            }
        }
        Ok(x)
    }

    /// Names of the model matrix columns
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn steps(&self) -> &[FittedStep] {
        &self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train_table() -> Table {
        Table::new()
            .with_column("age", Column::Numeric(vec![20.0, 30.0, 40.0, 50.0]))
            .unwrap()
            .with_column("age_months", Column::Numeric(vec![240.0, 361.0, 480.0, 601.0]))
            .unwrap()
            .with_column(
                "gender",
                Column::Categorical(vec!["F".into(), "M".into(), "F".into(), "M".into()]),
            )
            .unwrap()
    }

    #[test]
    fn test_standard_recipe_output() {
        let fitted = Recipe::standard(0.9).prep(&train_table()).unwrap();
        assert_eq!(fitted.n_features(), 2);
        assert_eq!(fitted.feature_names()[1], "gender_M");

        let x = fitted.bake(&train_table()).unwrap();
        assert_eq!(x.dim(), (4, 2));
        assert_eq!(x[[1, 1]], 1.0);
    }

    #[test]
    fn test_bake_ignores_column_order() {
        let fitted = Recipe::standard(0.9).prep(&train_table()).unwrap();
        let source = train_table();
        let mut reordered = Table::new();
        for name in ["gender", "age_months", "age"] {
            reordered
                .push_column(name, source.column(name).unwrap().clone())
                .unwrap();
        }
        assert_eq!(fitted.bake(&reordered).unwrap(), fitted.bake(&source).unwrap());
    }

    #[test]
    fn test_missing_predictor_rejected() {
        let fitted = Recipe::standard(0.9).prep(&train_table()).unwrap();
        let partial = Table::new()
            .with_column("age", Column::Numeric(vec![1.0]))
            .unwrap();
        assert!(fitted.bake(&partial).is_err());
    }

    #[test]
    fn test_unencoded_categorical_rejected() {
        let result = Recipe::new().step_normalize().prep(&train_table());
        assert!(matches!(result, Err(BenchError::ConfigError(_))));
    }

    #[test]
    fn test_recipe_serde() {
        let recipe = Recipe::standard(0.8);
        let json = serde_json::to_string(&recipe).unwrap();
        assert!(json.contains("\"step\":\"correlation\""));
        let back: Recipe = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recipe);
    }
}
