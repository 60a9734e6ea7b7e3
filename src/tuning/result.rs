//! Tuning results

use super::search_space::GridPoint;
use crate::error::Result;
use crate::evaluation::Metric;
use crate::training::CVResults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Held-out predictions of one fold for one grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldPredictions {
    pub fold_idx: usize,
    /// Training-partition row of each prediction
    pub rows: Vec<usize>,
    pub predicted: Vec<f64>,
}

/// Cross-validated performance of one grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Position in grid enumeration order
    pub index: usize,
    pub point: GridPoint,
    /// Per-metric summary over the folds that produced a score
    pub scores: BTreeMap<Metric, CVResults>,
    /// Folds whose fit or prediction failed
    pub n_failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<FoldPredictions>,
}

impl CandidateResult {
    /// Mean score over scored folds, `None` when no fold scored
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.scores.get(&metric).map(|cv| cv.mean_score)
    }

    pub fn is_scored(&self) -> bool {
        !self.scores.is_empty()
    }
}

/// Every grid point's cross-validated scores, in enumeration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub label: String,
    pub metrics: Vec<Metric>,
    pub n_folds: usize,
    pub candidates: Vec<CandidateResult>,
}

impl TuningResult {
    /// True if the runner computed `metric`
    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    /// Enumerated grid points, in order
    pub fn grid(&self) -> impl Iterator<Item = &GridPoint> {
        self.candidates.iter().map(|c| &c.point)
    }

    /// Number of points with at least one scored fold
    pub fn n_scored(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_scored()).count()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}
