//! Cross-validation resampling plan

use crate::error::{BenchError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resampling strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Plain shuffled K-Fold
    KFold { n_splits: usize },
    /// K-Fold that keeps the class balance of every held-out fold
    StratifiedKFold { n_splits: usize },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 10 }
    }
}

/// One held-in/held-out partition of the training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fold {
    pub fold_idx: usize,
    /// Rows the model is fitted on
    pub held_in: Vec<usize>,
    /// Rows the model is scored on
    pub held_out: Vec<usize>,
}

/// Ordered collection of folds over `n_rows` training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldPlan {
    pub strategy: CVStrategy,
    pub n_rows: usize,
    pub folds: Vec<Fold>,
}

impl FoldPlan {
    /// Build a plan for `labels` with the given strategy and seed
    pub fn new(strategy: CVStrategy, labels: &Array1<f64>, seed: u64) -> Result<Self> {
        let n_rows = labels.len();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let held_out_sets = match &strategy {
            CVStrategy::KFold { n_splits } => {
                check_splits(n_rows, *n_splits)?;
                let mut indices: Vec<usize> = (0..n_rows).collect();
                indices.shuffle(&mut rng);
                deal(&indices, *n_splits, 0)
            }
            CVStrategy::StratifiedKFold { n_splits } => {
                check_splits(n_rows, *n_splits)?;
                // Group rows by class; BTreeMap keeps class order stable across runs
                let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
                for (idx, &val) in labels.iter().enumerate() {
                    by_class.entry(val.round() as i64).or_default().push(idx);
                }

                let mut sets: Vec<Vec<usize>> = vec![Vec::new(); *n_splits];
                let mut offset = 0;
                for members in by_class.values_mut() {
                    members.shuffle(&mut rng);
                    for (fold, rows) in deal(members, *n_splits, offset).into_iter().enumerate() {
                        sets[fold].extend(rows);
                    }
                    offset = (offset + members.len()) % n_splits;
                }
                sets
            }
        };

        let folds = held_out_sets
            .into_iter()
            .enumerate()
            .map(|(fold_idx, mut held_out)| {
                held_out.sort_unstable();
                let held_in = complement(n_rows, &held_out);
                Fold {
                    fold_idx,
                    held_in,
                    held_out,
                }
            })
            .collect();

        Ok(Self {
            strategy,
            n_rows,
            folds,
        })
    }

    /// Stratified K-Fold shorthand
    pub fn stratified(labels: &Array1<f64>, n_splits: usize, seed: u64) -> Result<Self> {
        Self::new(CVStrategy::StratifiedKFold { n_splits }, labels, seed)
    }

    pub fn len(&self) -> usize {
        self.folds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fold> {
        self.folds.iter()
    }

    /// Check that every row is held out exactly once and that each fold's
    /// held-in rows are the sorted complement of its held-out rows
    pub fn validate(&self) -> Result<()> {
        let mut seen = vec![0usize; self.n_rows];
        for fold in &self.folds {
            if let Some(&idx) = fold
                .held_in
                .iter()
                .chain(&fold.held_out)
                .find(|&&idx| idx >= self.n_rows)
            {
                return Err(BenchError::DataError(format!(
                    "fold {} references row {} outside {} rows",
                    fold.fold_idx, idx, self.n_rows
                )));
            }
            if !is_strictly_increasing(&fold.held_in) || !is_strictly_increasing(&fold.held_out) {
                return Err(BenchError::DataError(format!(
                    "fold {} row lists must be sorted without duplicates",
                    fold.fold_idx
                )));
            }
            for &idx in &fold.held_out {
                seen[idx] += 1;
            }
            if fold.held_in.len() + fold.held_out.len() != self.n_rows
                || fold.held_in.iter().any(|i| fold.held_out.binary_search(i).is_ok())
            {
                return Err(BenchError::DataError(format!(
                    "fold {} held-in rows are not the complement of its held-out rows",
                    fold.fold_idx
                )));
            }
        }
        if let Some(row) = seen.iter().position(|&count| count != 1) {
            return Err(BenchError::DataError(format!(
                "row {} is held out {} times",
                row, seen[row]
            )));
        }
        Ok(())
    }
}

fn check_splits(n_rows: usize, n_splits: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(BenchError::InvalidParameter {
            name: "folds".to_string(),
            value: n_splits.to_string(),
            reason: "at least 2 folds are required".to_string(),
        });
    }
    if n_rows < n_splits {
        return Err(BenchError::DataError(format!(
            "n_rows ({}) must be >= folds ({})",
            n_rows, n_splits
        )));
    }
    Ok(())
}

/// Deal `indices` round-robin into `n_splits` buckets, starting at bucket `offset`
fn deal(indices: &[usize], n_splits: usize, offset: usize) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); n_splits];
    for (i, &idx) in indices.iter().enumerate() {
        buckets[(i + offset) % n_splits].push(idx);
    }
    buckets
}

fn is_strictly_increasing(rows: &[usize]) -> bool {
    rows.windows(2).all(|w| w[0] < w[1])
}

fn complement(n_rows: usize, sorted: &[usize]) -> Vec<usize> {
    (0..n_rows)
        .filter(|i| sorted.binary_search(i).is_err())
        .collect()
}

/// Summary of one score across folds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores of the folds that produced one
    pub scores: Vec<f64>,
    pub mean_score: f64,
    /// Standard error of the mean (sample sd / sqrt(n))
    pub std_err: f64,
    pub n_folds: usize,
}

impl CVResults {
    /// Summarise fold scores. `None` when no fold produced a score.
    pub fn from_scores(scores: Vec<f64>) -> Option<Self> {
        let n_folds = scores.len();
        if n_folds == 0 {
            return None;
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let std_err = if n_folds > 1 {
            let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>()
                / (n_folds - 1) as f64;
            (variance / n_folds as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            scores,
            mean_score,
            std_err,
            n_folds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize, every: usize) -> Array1<f64> {
        (0..n).map(|i| if i % every == 0 { 1.0 } else { 0.0 }).collect()
    }

    #[test]
    fn test_k_fold_covers_each_row_once() {
        let plan = FoldPlan::new(CVStrategy::KFold { n_splits: 5 }, &labels(100, 3), 42).unwrap();
        assert_eq!(plan.len(), 5);
        plan.validate().unwrap();
        for fold in plan.iter() {
            assert_eq!(fold.held_out.len(), 20);
            assert_eq!(fold.held_in.len(), 80);
        }
    }

    #[test]
    fn test_stratified_keeps_class_balance() {
        let y = labels(100, 4); // 25 positives
        let plan = FoldPlan::stratified(&y, 5, 42).unwrap();
        plan.validate().unwrap();
        for fold in plan.iter() {
            let positives = fold.held_out.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(positives, 5);
            assert_eq!(fold.held_out.len(), 20);
        }
    }

    #[test]
    fn test_stratified_balances_uneven_sizes() {
        let y = labels(23, 2);
        let plan = FoldPlan::stratified(&y, 10, 1).unwrap();
        plan.validate().unwrap();
        let sizes: Vec<usize> = plan.iter().map(|f| f.held_out.len()).collect();
        let max = *sizes.iter().max().unwrap();
        let min = *sizes.iter().min().unwrap();
        assert!(max - min <= 1, "fold sizes {:?}", sizes);
    }

    #[test]
    fn test_plan_is_seeded() {
        let y = labels(50, 3);
        assert_eq!(
            FoldPlan::stratified(&y, 10, 9).unwrap(),
            FoldPlan::stratified(&y, 10, 9).unwrap()
        );
    }

    #[test]
    fn test_too_few_rows() {
        assert!(FoldPlan::stratified(&labels(5, 2), 10, 1).is_err());
        assert!(FoldPlan::stratified(&labels(5, 2), 1, 1).is_err());
    }

    #[test]
    fn test_validate_catches_duplicates() {
        let mut plan = FoldPlan::stratified(&labels(20, 2), 4, 3).unwrap();
        let stolen = plan.folds[0].held_out[0];
        plan.folds[1].held_out.push(stolen);
        plan.folds[1].held_out.sort_unstable();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_catches_held_in_out_of_range() {
        let mut plan = FoldPlan::stratified(&labels(20, 2), 4, 3).unwrap();
        let last = plan.folds[3].held_in.len() - 1;
        plan.folds[3].held_in[last] = 999;
        assert!(matches!(plan.validate(), Err(BenchError::DataError(_))));
    }

    #[test]
    fn test_validate_catches_held_in_repeats() {
        let mut plan = FoldPlan::stratified(&labels(20, 2), 4, 3).unwrap();
        let fold = &mut plan.folds[0];
        fold.held_in[1] = fold.held_in[0];
        assert!(matches!(plan.validate(), Err(BenchError::DataError(_))));

        let mut plan = FoldPlan::stratified(&labels(20, 2), 4, 3).unwrap();
        plan.folds[2].held_in.reverse();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_cv_results() {
        let results = CVResults::from_scores(vec![0.8, 0.9, 1.0]).unwrap();
        assert!((results.mean_score - 0.9).abs() < 1e-12);
        assert!((results.std_err - (0.01f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(CVResults::from_scores(vec![]).is_none());
    }
}
