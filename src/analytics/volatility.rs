//! Close-price dispersion over trailing windows.

use crate::math::{population_std, tail};

const SHORT_WINDOW: usize = 5;
const MEDIUM_WINDOW: usize = 20;

/// Population standard deviation of closes over the last 5 bars, the last 20
/// bars, and the whole series.
///
/// Each window is defined on its own: `None` when the window is empty or holds
/// a non-finite close. A bad close outside the 5-bar window leaves `vol_5bar`
/// intact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volatility {
    pub vol_5bar: Option<f64>,
    pub vol_20bar: Option<f64>,
    /// Not shown in reports; kept for callers that want the full-history figure.
    pub vol_all: Option<f64>,
}

/// Compute trailing volatility from closes in delivery order (no re-sorting).
pub fn recent_volatility(closes: &[f64]) -> Volatility {
    Volatility {
        vol_5bar: window_std(tail(closes, SHORT_WINDOW)),
        vol_20bar: window_std(tail(closes, MEDIUM_WINDOW)),
        vol_all: window_std(closes),
    }
}

fn window_std(window: &[f64]) -> Option<f64> {
    population_std(window).filter(|v| v.is_finite())
}
