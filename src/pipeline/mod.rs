//! Model pipelines
//!
//! [`ModelPipeline`] walks one model family through tune, select, fit and
//! evaluate. [`Benchmark`] runs the configured families over shared
//! artifacts and writes the comparison table.

mod benchmark;
mod stages;

pub use benchmark::{Benchmark, BenchmarkReport, PipelineSummary};
pub use stages::{
    clear_outputs, metrics_path, tuning_path, Evaluated, Fitted, ModelPipeline, PipelineOutputs,
    Selected, Specified, Tuned,
};
