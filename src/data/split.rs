//! Stratified train/test split

use super::table::Dataset;
use crate::error::{BenchError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Fixed, disjoint partition of a dataset into training and test rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub train: Dataset,
    pub test: Dataset,
    /// Row positions of `train` in the source dataset
    pub train_indices: Vec<usize>,
    /// Row positions of `test` in the source dataset
    pub test_indices: Vec<usize>,
}

impl DatasetSplit {
    /// Check that the partitions are disjoint and line up with their row lists
    pub fn validate(&self) -> Result<()> {
        if self.train.n_rows() != self.train_indices.len()
            || self.test.n_rows() != self.test_indices.len()
        {
            return Err(BenchError::DataError(
                "split row lists do not match partition sizes".to_string(),
            ));
        }
        let overlap = self
            .test_indices
            .iter()
            .any(|i| self.train_indices.binary_search(i).is_ok());
        if overlap {
            return Err(BenchError::DataError(
                "training and test partitions overlap".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split `data` into training and test partitions, stratified by label.
///
/// Each class contributes `floor(prop * n_class)` rows to the training
/// partition. Row lists are returned in ascending order.
pub fn initial_split(data: &Dataset, prop: f64, seed: u64) -> Result<DatasetSplit> {
    if !(prop > 0.0 && prop < 1.0) {
        return Err(BenchError::InvalidParameter {
            name: "train_prop".to_string(),
            value: prop.to_string(),
            reason: "must lie strictly between 0 and 1".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for class in [0.0, 1.0] {
        let mut members: Vec<usize> = data
            .labels
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(&mut rng);
        let n_train = (members.len() as f64 * prop).floor() as usize;
        train_indices.extend_from_slice(&members[..n_train]);
        test_indices.extend_from_slice(&members[n_train..]);
    }

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(BenchError::DataError(format!(
            "split of {} rows at proportion {} leaves an empty partition",
            data.n_rows(),
            prop
        )));
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok(DatasetSplit {
        train: data.take(&train_indices),
        test: data.take(&test_indices),
        train_indices,
        test_indices,
    })
}
