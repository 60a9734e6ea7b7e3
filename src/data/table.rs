//! Column-oriented predictor table and labelled dataset

use crate::error::{BenchError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A single predictor column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    /// Numeric predictor
    Numeric(Vec<f64>),
    /// Categorical predictor (string levels)
    Categorical(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    /// Select rows by index, in the given order
    pub fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Column::Categorical(v) => {
                Column::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// Named predictor columns of equal length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Table::push_column`]
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Append a column. The first column fixes the row count.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(BenchError::DataError(format!("duplicate column '{}'", name)));
        }
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(BenchError::ShapeError {
                expected: format!("{} rows in column '{}'", self.n_rows, name),
                actual: format!("{} rows", column.len()),
            });
        }
        self.n_rows = column.len();
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
    }

    /// Iterate over (name, column) pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Select rows by index, in the given order
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            n_rows: indices.len(),
        }
    }
}

/// Serialized table form; rebuilt through [`Table::push_column`] on load
#[derive(Deserialize)]
struct RawTable {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl TryFrom<RawTable> for Table {
    type Error = BenchError;

    fn try_from(raw: RawTable) -> Result<Self> {
        if raw.names.len() != raw.columns.len() {
            return Err(BenchError::DataError(format!(
                "{} column names for {} columns",
                raw.names.len(),
                raw.columns.len()
            )));
        }
        let mut table = Table {
            n_rows: raw.n_rows,
            ..Table::default()
        };
        for (name, column) in raw.names.into_iter().zip(raw.columns) {
            if column.len() != raw.n_rows {
                return Err(BenchError::ShapeError {
                    expected: format!("{} rows in column '{}'", raw.n_rows, name),
                    actual: format!("{} rows", column.len()),
                });
            }
            table.push_column(name, column)?;
        }
        Ok(table)
    }
}

/// Names of the two outcome classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabels {
    /// Event class, encoded as `1.0`
    pub positive: String,
    /// Non-event class, encoded as `0.0`
    pub negative: String,
}

impl ClassLabels {
    pub fn new(positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
        }
    }

    /// Map a class name to its numeric encoding
    pub fn encode(&self, name: &str) -> Result<f64> {
        if name == self.positive {
            Ok(1.0)
        } else if name == self.negative {
            Ok(0.0)
        } else {
            Err(BenchError::DataError(format!(
                "unknown class label '{}' (expected '{}' or '{}')",
                name, self.positive, self.negative
            )))
        }
    }

    /// Map a numeric encoding back to its class name
    pub fn decode(&self, value: f64) -> Result<&str> {
        if value == 1.0 {
            Ok(&self.positive)
        } else if value == 0.0 {
            Ok(&self.negative)
        } else {
            Err(BenchError::DataError(format!("label value {} is not 0 or 1", value)))
        }
    }
}

/// Predictors plus binary outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    pub predictors: Table,
    pub labels: Array1<f64>,
    pub classes: ClassLabels,
}

impl Dataset {
    /// Create a dataset, checking that labels line up with the predictors
    pub fn new(predictors: Table, labels: Array1<f64>, classes: ClassLabels) -> Result<Self> {
        if predictors.n_cols() > 0 && predictors.n_rows() != labels.len() {
            return Err(BenchError::ShapeError {
                expected: format!("{} labels", predictors.n_rows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if let Some(bad) = labels.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(BenchError::DataError(format!(
                "label value {} is not 0 or 1",
                bad
            )));
        }
        Ok(Self {
            predictors,
            labels,
            classes,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    /// Select rows by index, in the given order
    pub fn take(&self, indices: &[usize]) -> Dataset {
        Dataset {
            predictors: self.predictors.take(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            classes: self.classes.clone(),
        }
    }

    /// Number of positive-class rows
    pub fn n_positive(&self) -> usize {
        self.labels.iter().filter(|&&v| v == 1.0).count()
    }
}

#[derive(Deserialize)]
struct RawDataset {
    predictors: Table,
    labels: Array1<f64>,
    classes: ClassLabels,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = BenchError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        Dataset::new(raw.predictors, raw.labels, raw.classes)
    }
}
