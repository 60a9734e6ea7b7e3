//! Raw dataset loading

use super::table::{ClassLabels, Column, Dataset, Table};
use crate::error::{BenchError, Result};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Load a CSV file with a header row into a [`Dataset`].
///
/// `target` names the outcome column; `positive` is the event class.
pub fn load_csv(path: &Path, target: &str, positive: &str) -> Result<Dataset> {
    let file = File::open(path)
        .map_err(|e| BenchError::DataError(format!("{}: {}", path.display(), e)))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()?;

    let dataset = dataset_from_frame(&df, target, positive)?;
    info!(
        path = %path.display(),
        rows = dataset.n_rows(),
        predictors = dataset.predictors.n_cols(),
        positives = dataset.n_positive(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// Convert a data frame: string and boolean columns become categorical,
/// everything else is cast to `f64`.
pub fn dataset_from_frame(df: &DataFrame, target: &str, positive: &str) -> Result<Dataset> {
    let mut predictors = Table::new();
    let mut outcome = None;

    for column in df.get_columns() {
        let name = column.name().to_string();
        let series = column.as_materialized_series();
        let converted = convert_series(&name, series)?;
        if name == target {
            outcome = Some(converted);
        } else {
            predictors.push_column(name, converted)?;
        }
    }

    let outcome = match outcome {
        Some(Column::Categorical(values)) => values,
        Some(Column::Numeric(_)) => {
            return Err(BenchError::DataError(format!(
                "target column '{}' must hold class names",
                target
            )))
        }
        None => {
            return Err(BenchError::DataError(format!(
                "target column '{}' not found",
                target
            )))
        }
    };

    let classes = class_labels(&outcome, positive)?;
    let labels = outcome
        .iter()
        .map(|v| classes.encode(v))
        .collect::<Result<Vec<f64>>>()?;

    Dataset::new(predictors, labels.into(), classes)
}

fn class_labels(outcome: &[String], positive: &str) -> Result<ClassLabels> {
    let levels: BTreeSet<&str> = outcome.iter().map(String::as_str).collect();
    if !levels.contains(positive) {
        return Err(BenchError::DataError(format!(
            "positive class '{}' does not occur in the target column",
            positive
        )));
    }
    let others: Vec<&str> = levels.into_iter().filter(|l| *l != positive).collect();
    match others.as_slice() {
        [negative] => Ok(ClassLabels::new(positive, *negative)),
        [] => Err(BenchError::DataError(
            "target column holds a single class".to_string(),
        )),
        _ => Err(BenchError::DataError(format!(
            "target column must be binary, found classes {:?} besides '{}'",
            others, positive
        ))),
    }
}

fn convert_series(name: &str, series: &Series) -> Result<Column> {
    if series.null_count() > 0 {
        return Err(BenchError::DataError(format!(
            "column '{}' has {} missing values",
            name,
            series.null_count()
        )));
    }

    match series.dtype() {
        DataType::String | DataType::Boolean => {
            let as_str = series.cast(&DataType::String)?;
            let values = as_str
                .str()?
                .into_iter()
                .map(|v| v.unwrap_or_default().to_string())
                .collect();
            Ok(Column::Categorical(values))
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => {
            let as_f64 = series.cast(&DataType::Float64)?;
            let values = as_f64
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            Ok(Column::Numeric(values))
        }
        other => Err(BenchError::DataError(format!(
            "column '{}' has unsupported type {}",
            name, other
        ))),
    }
}
