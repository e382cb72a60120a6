//! Daily volume rollups from intraday bars.
//!
//! Bars are bucketed by calendar date and summed, so several intraday bars on the
//! same day become one daily total. Averages look back over prior days only:
//!
//! - 5d: days ranked 2nd..=6th most recent
//! - 20d: days ranked 2nd..=20th most recent (19 prior days)
//!
//! When fewer prior days exist the average covers whatever falls in the range.
//! No prior day at all, or a non-finite daily total inside the range, leaves the
//! average undefined.

use std::collections::BTreeMap;

use crate::domain::PriceSeries;
use crate::math::mean;
use crate::report::format_magnitude;

const FIVE_DAY_RANGE: std::ops::Range<usize> = 1..6;
const TWENTY_DAY_RANGE: std::ops::Range<usize> = 1..20;

/// Daily volume totals, most recent date first.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyVolumes {
    pub days: Vec<(String, f64)>,
}

impl DailyVolumes {
    pub fn from_series(series: &PriceSeries) -> Self {
        let mut by_date: BTreeMap<&str, f64> = BTreeMap::new();
        for bar in &series.bars {
            *by_date.entry(bar.date()).or_insert(0.0) += bar.volume;
        }
        let days = by_date
            .into_iter()
            .rev()
            .map(|(date, total)| (date.to_string(), total))
            .collect();
        Self { days }
    }

    pub fn today(&self) -> Option<f64> {
        self.days.first().map(|(_, v)| *v)
    }

    /// Mean of the daily totals whose recency rank falls in `range`.
    pub fn average_over(&self, range: std::ops::Range<usize>) -> Option<f64> {
        let end = range.end.min(self.days.len());
        let start = range.start.min(end);
        let totals: Vec<f64> = self.days[start..end].iter().map(|(_, v)| *v).collect();
        mean(&totals).filter(|avg| avg.is_finite())
    }

    pub fn average_5d(&self) -> Option<f64> {
        self.average_over(FIVE_DAY_RANGE)
    }

    pub fn average_20d(&self) -> Option<f64> {
        self.average_over(TWENTY_DAY_RANGE)
    }
}

/// Formatted volume summary for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeChanges {
    /// Most recent raw bar timestamp.
    pub latest_bar_time: String,
    pub today_volume: String,
    pub avg_volume_5d: Option<String>,
    pub avg_volume_20d: Option<String>,
}

/// Summarise a series' volume history. `None` for an empty series or a
/// non-finite total for the latest day.
pub fn volume_changes(series: &PriceSeries) -> Option<VolumeChanges> {
    let daily = DailyVolumes::from_series(series);
    let today = daily.today().filter(|v| v.is_finite())?;

    // Derived from the raw timestamps, independently of the date buckets.
    let latest_bar_time = series.bars.iter().map(|b| b.timestamp.as_str()).max()?;

    Some(VolumeChanges {
        latest_bar_time: latest_bar_time.to_string(),
        today_volume: format_magnitude(today),
        avg_volume_5d: daily.average_5d().map(format_magnitude),
        avg_volume_20d: daily.average_20d().map(format_magnitude),
    })
}
