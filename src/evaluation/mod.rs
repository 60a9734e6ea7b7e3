//! Test-set evaluation
//!
//! Confusion-matrix metrics (accuracy, precision, recall, specificity) and
//! the per-model `Metric,Value` CSV reports.

mod metrics;
mod report;

pub use metrics::{ConfusionMatrix, Metric};
pub use report::{to_percent, write_comparison, MetricsReport};
