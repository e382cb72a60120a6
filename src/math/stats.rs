//! Descriptive statistics over plain slices.
//!
//! Empty input yields `None` rather than NaN so callers have to decide what a
//! missing aggregate means for them.

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`, not `n - 1`).
///
/// A single observation has zero dispersion.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let n = values.len() as f64;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    Some(var.sqrt())
}

/// Last `n` elements of a slice (or the whole slice if shorter).
pub fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}
