//! Feature scaling

use crate::data::{Column, Table};
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};

/// Parameters for one scaled column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    name: String,
    center: f64,
    scale: f64,
}

/// Z-score normalization of numeric predictors: (x - mean) / sd
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
}

impl StandardScaler {
    /// Estimate mean and sample standard deviation of every numeric column
    pub fn fit(table: &Table) -> Result<Self> {
        let params = table
            .iter()
            .filter_map(|(name, col)| match col {
                Column::Numeric(values) => Some((name, values)),
                Column::Categorical(_) => None,
            })
            .map(|(name, values)| {
                let n = values.len() as f64;
                if values.is_empty() {
                    return Err(BenchError::DataError(format!(
                        "cannot normalize empty column '{}'",
                        name
                    )));
                }
                let mean = values.iter().sum::<f64>() / n;
                let std = if values.len() > 1 {
                    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
                } else {
                    0.0
                };
                Ok(ScalerParams {
                    name: name.to_string(),
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { params })
    }

    /// Apply the frozen parameters
    pub fn transform(&self, table: &Table) -> Result<Table> {
        let mut out = Table::new();
        for (name, col) in table.iter() {
            let scaled = match self.params.iter().find(|p| p.name == name) {
                Some(p) => match col {
                    Column::Numeric(values) => {
                        Column::Numeric(values.iter().map(|v| (v - p.center) / p.scale).collect())
                    }
                    Column::Categorical(_) => {
                        return Err(BenchError::DataError(format!(
                            "column '{}' was numeric when the scaler was fitted",
                            name
                        )))
                    }
                },
                None => col.clone(),
            };
            out.push_column(name, scaled)?;
        }
        Ok(out)
    }

    /// Fitted (name, mean, sd) triples
    pub fn parameters(&self) -> impl Iterator<Item = (&str, f64, f64)> {
        self.params
            .iter()
            .map(|p| (p.name.as_str(), p.center, p.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_scaling() {
        let table = Table::new()
            .with_column("a", Column::Numeric(vec![1.0, 2.0, 3.0]))
            .unwrap();
        let scaler = StandardScaler::fit(&table).unwrap();
        let out = scaler.transform(&table).unwrap();

        match out.column("a").unwrap() {
            Column::Numeric(v) => {
                assert_relative_eq!(v[0], -1.0);
                assert_relative_eq!(v[1], 0.0);
                assert_relative_eq!(v[2], 1.0);
            }
            other => panic!("unexpected column {:?}", other),
        }
    }

    #[test]
    fn test_constant_column_is_centered_only() {
        let table = Table::new()
            .with_column("c", Column::Numeric(vec![4.0, 4.0]))
            .unwrap();
        let scaler = StandardScaler::fit(&table).unwrap();
        let out = scaler.transform(&table).unwrap();
        assert_eq!(out.column("c"), Some(&Column::Numeric(vec![0.0, 0.0])));
    }

    #[test]
    fn test_parameters_frozen_after_fit() {
        let train = Table::new()
            .with_column("a", Column::Numeric(vec![0.0, 2.0]))
            .unwrap();
        let test = Table::new()
            .with_column("a", Column::Numeric(vec![100.0]))
            .unwrap();
        let scaler = StandardScaler::fit(&train).unwrap();
        let out = scaler.transform(&test).unwrap();
        let sd = 2.0f64.sqrt();
        assert_eq!(out.column("a"), Some(&Column::Numeric(vec![(100.0 - 1.0) / sd])));
    }
}
