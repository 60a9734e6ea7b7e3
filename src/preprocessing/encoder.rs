//! Categorical dummy encoding

use crate::data::{Column, Table};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Levels seen for one categorical column during fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnLevels {
    name: String,
    /// Sorted levels; the first is the reference level unless one-hot
    levels: Vec<String>,
}

/// Expands categorical predictors into 0/1 indicator columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyEncoder {
    one_hot: bool,
    columns: Vec<ColumnLevels>,
}

impl DummyEncoder {
    /// Record the levels of every categorical column
    pub fn fit(table: &Table, one_hot: bool) -> Result<Self> {
        let columns = table
            .iter()
            .filter_map(|(name, col)| match col {
                Column::Categorical(values) => Some(ColumnLevels {
                    name: name.to_string(),
                    levels: values.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect(),
                }),
                Column::Numeric(_) => None,
            })
            .collect();

        Ok(Self { one_hot, columns })
    }

    /// Replace each fitted categorical column by its indicator columns, in place.
    ///
    /// Levels not seen during fit encode as all zeros.
    pub fn transform(&self, table: &Table) -> Result<Table> {
        let mut out = Table::new();
        let mut unseen = 0usize;

        for (name, col) in table.iter() {
            let fitted = self.columns.iter().find(|c| c.name == name);
            match (fitted, col) {
                (Some(fitted), Column::Categorical(values)) => {
                    for level in self.encoded_levels(fitted) {
                        let indicator: Vec<f64> = values
                            .iter()
                            .map(|v| if v == level { 1.0 } else { 0.0 })
                            .collect();
                        out.push_column(format!("{}_{}", name, sanitize(level)), Column::Numeric(indicator))?;
                    }
                    unseen += values
                        .iter()
                        .filter(|v| fitted.levels.binary_search(*v).is_err())
                        .count();
                }
                _ => out.push_column(name, col.clone())?,
            }
        }

        if unseen > 0 {
            warn!(unseen, "categorical levels not seen during fit were encoded as all zeros");
        }
        Ok(out)
    }

    fn encoded_levels<'a>(&self, fitted: &'a ColumnLevels) -> &'a [String] {
        if self.one_hot || fitted.levels.is_empty() {
            &fitted.levels
        } else {
            &fitted.levels[1..]
        }
    }
}

fn sanitize(level: &str) -> String {
    level
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
