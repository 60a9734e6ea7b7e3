//! Choosing the best grid point

use super::result::{CandidateResult, TuningResult};
use crate::error::{BenchError, Result};
use crate::evaluation::Metric;

fn check_metric(result: &TuningResult, metric: Metric) -> Result<()> {
    if result.has_metric(metric) {
        Ok(())
    } else {
        Err(BenchError::UnknownMetric(metric.to_string()))
    }
}

/// Candidate with the highest mean `metric`.
///
/// Ties go to the earliest point in enumeration order. Points without a
/// score for `metric` are skipped.
pub fn select_best(result: &TuningResult, metric: Metric) -> Result<&CandidateResult> {
    check_metric(result, metric)?;

    let mut best: Option<(&CandidateResult, f64)> = None;
    for candidate in &result.candidates {
        if let Some(score) = candidate.mean(metric) {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }
    }

    best.map(|(c, _)| c).ok_or_else(|| {
        BenchError::FitError(format!(
            "no grid point of {} has a {} score",
            result.label, metric
        ))
    })
}

/// Top `n` scored candidates by mean `metric`, best first, ties in
/// enumeration order
pub fn show_best(result: &TuningResult, metric: Metric, n: usize) -> Result<Vec<&CandidateResult>> {
    check_metric(result, metric)?;

    let mut scored: Vec<(&CandidateResult, f64)> = result
        .candidates
        .iter()
        .filter_map(|c| c.mean(metric).map(|s| (c, s)))
        .collect();
    // Stable sort keeps enumeration order among equal scores
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(scored.into_iter().take(n).map(|(c, _)| c).collect())
}
