//! Offline evaluation against forward-looking prices.
//!
//! Only used in test mode: compares how far the reported symbols actually moved
//! after the scoring window with how far the whole population moved.

use serde::Serialize;

use crate::domain::{RankedEntry, ReportEntry};
use crate::math::mean;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub reported_count: usize,
    pub reported_with_forward: usize,
    pub population_count: usize,
    pub population_with_forward: usize,
    /// Mean of `|last_forward - last_close| / last_close` over reported symbols.
    pub reported_mean_abs_move: Option<f64>,
    pub population_mean_abs_move: Option<f64>,
}

/// Absolute relative move from the last observed close to the last forward price.
pub fn forward_abs_move(entry: &RankedEntry) -> Option<f64> {
    let last_close = entry.series.last_close()?;
    let last_forward = *entry.forward_prices.as_ref()?.last()?;
    if !(last_close.is_finite() && last_close != 0.0 && last_forward.is_finite()) {
        return None;
    }
    Some((last_forward - last_close).abs() / last_close.abs())
}

/// `report` entries are joined to `ranked` by their rank index, so duplicate
/// symbols resolve to the row that was actually reported.
pub fn evaluate(ranked: &[RankedEntry], report: &[ReportEntry]) -> Evaluation {
    let population: Vec<f64> = ranked.iter().filter_map(forward_abs_move).collect();
    let reported: Vec<f64> = report
        .iter()
        .filter_map(|r| ranked.get(r.rank))
        .filter_map(forward_abs_move)
        .collect();

    Evaluation {
        reported_count: report.len(),
        reported_with_forward: reported.len(),
        population_count: ranked.len(),
        population_with_forward: population.len(),
        reported_mean_abs_move: mean(&reported),
        population_mean_abs_move: mean(&population),
    }
}
