//! Shared inputs of every model pipeline, persisted as JSON

use super::split::{initial_split, DatasetSplit};
use super::table::Dataset;
use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::preprocessing::Recipe;
use crate::training::FoldPlan;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

const SPLIT_FILE: &str = "split.json";
const FOLDS_FILE: &str = "folds.json";
const RECIPE_FILE: &str = "recipe.json";
const TEST_LABELS_FILE: &str = "test_labels.json";

/// Train/test split, fold plan over the training rows, unfitted recipe and
/// the test partition's class names.
///
/// Built once and never mutated; pipelines share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub split: DatasetSplit,
    pub folds: FoldPlan,
    pub recipe: Recipe,
    pub test_labels: Vec<String>,
}

impl Artifacts {
    /// Split `dataset`, plan the folds and declare the standard recipe
    pub fn prepare(dataset: &Dataset, config: &BenchConfig) -> Result<Self> {
        config.validate()?;
        let split = initial_split(dataset, config.train_prop, config.seed)?;
        let folds = FoldPlan::stratified(&split.train.labels, config.folds, config.seed)?;
        let recipe = Recipe::standard(config.corr_threshold);
        let test_labels = split
            .test
            .labels
            .iter()
            .map(|&v| split.test.classes.decode(v).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        info!(
            train = split.train.n_rows(),
            test = split.test.n_rows(),
            folds = folds.len(),
            "artifacts prepared"
        );
        Ok(Self {
            split,
            folds,
            recipe,
            test_labels,
        })
    }

    /// Check the pieces still describe the same rows
    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        self.folds.validate()?;
        if self.folds.n_rows != self.split.train.n_rows() {
            return Err(BenchError::DataError(format!(
                "fold plan covers {} rows, training partition has {}",
                self.folds.n_rows,
                self.split.train.n_rows()
            )));
        }
        if self.test_labels.len() != self.split.test.n_rows() {
            return Err(BenchError::DataError(format!(
                "{} test labels for {} test rows",
                self.test_labels.len(),
                self.split.test.n_rows()
            )));
        }
        Ok(())
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        write_json(&dir.join(SPLIT_FILE), &self.split)?;
        write_json(&dir.join(FOLDS_FILE), &self.folds)?;
        write_json(&dir.join(RECIPE_FILE), &self.recipe)?;
        write_json(&dir.join(TEST_LABELS_FILE), &self.test_labels)?;
        info!(dir = %dir.display(), "artifacts saved");
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let artifacts = Self {
            split: read_json(&dir.join(SPLIT_FILE))?,
            folds: read_json(&dir.join(FOLDS_FILE))?,
            recipe: read_json(&dir.join(RECIPE_FILE))?,
            test_labels: read_json(&dir.join(TEST_LABELS_FILE))?,
        };
        artifacts.validate()?;
        Ok(artifacts)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string(value)?)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .map_err(|e| BenchError::DataError(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&json)?)
}
