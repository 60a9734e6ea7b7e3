//! Correlation-based predictor filtering

use crate::data::{Column, Table};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Remove numeric predictors that are highly correlated with another one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationFilter {
    threshold: f64,
    /// Names of the dropped predictors, in drop order
    removed: Vec<String>,
}

impl CorrelationFilter {
    /// Fit the filter on the numeric columns of `table`.
    ///
    /// For each pair whose absolute Pearson correlation exceeds the threshold,
    /// the member with the larger mean absolute correlation to the remaining
    /// predictors is dropped.
    pub fn fit(table: &Table, threshold: f64) -> Result<Self> {
        let numeric: Vec<(&str, &[f64])> = table
            .iter()
            .filter_map(|(name, col)| match col {
                Column::Numeric(v) => Some((name, v.as_slice())),
                Column::Categorical(_) => None,
            })
            .collect();

        let n = numeric.len();
        let mut corr = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let c = pearson_correlation(numeric[i].1, numeric[j].1).abs();
                corr[i][j] = c;
                corr[j][i] = c;
            }
        }

        let threshold = threshold.abs();
        let mut to_remove: HashSet<usize> = HashSet::new();
        let mut removed = Vec::new();

        for i in 0..n {
            if to_remove.contains(&i) {
                continue;
            }
            for j in (i + 1)..n {
                if to_remove.contains(&j) || to_remove.contains(&i) {
                    continue;
                }
                if corr[i][j] > threshold {
                    let mean_i = mean_correlation(&corr, i, &to_remove);
                    let mean_j = mean_correlation(&corr, j, &to_remove);
                    let drop = if mean_i > mean_j { i } else { j };
                    to_remove.insert(drop);
                    removed.push(numeric[drop].0.to_string());
                }
            }
        }

        Ok(Self { threshold, removed })
    }

    /// Drop the predictors removed during fit
    pub fn transform(&self, table: &Table) -> Result<Table> {
        let mut out = Table::new();
        for (name, col) in table.iter() {
            if !self.removed.iter().any(|r| r == name) {
                out.push_column(name, col.clone())?;
            }
        }
        Ok(out)
    }

    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sum_xy += dx * dy;
        sum_x2 += dx * dx;
        sum_y2 += dy * dy;
    }

    let denom = (sum_x2 * sum_y2).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        sum_xy / denom
    }
}

fn mean_correlation(corr: &[Vec<f64>], idx: usize, exclude: &HashSet<usize>) -> f64 {
    let (total, count) = corr[idx]
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != idx && !exclude.contains(j))
        .fold((0.0, 0usize), |(t, c), (_, &v)| (t + v, c + 1));

    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}
