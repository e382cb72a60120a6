//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by any data engine (file snapshot, synthetic sample, ...)
//! - consumed by the scorer and the report stage without conversion
//! - emitted as JSON in machine output mode

use std::path::PathBuf;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One fixed-interval price/volume observation.
///
/// `timestamp` is kept as the raw string produced by the data source, e.g.
/// `2024-03-01 15:30:00` or `2024-03-01T15:30:00`. The calendar date is the
/// leading token before the time separator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: String,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Calendar-date portion of the timestamp.
    pub fn date(&self) -> &str {
        self.timestamp
            .split([' ', 'T'])
            .next()
            .unwrap_or(self.timestamp.as_str())
    }
}

/// Historical bars for a single symbol, chronological as delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries {
    pub bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

/// Row-per-symbol numeric input to the outlier model.
///
/// Construction guarantees at least one row, a non-zero width shared by every
/// row, and finite values only.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: DMatrix<f64>,
}

impl FeatureMatrix {
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, AppError> {
        let Some(first) = rows.first() else {
            return Err(AppError::InputShape("feature matrix has no rows".to_string()));
        };
        let width = first.len();
        if width == 0 {
            return Err(AppError::InputShape("feature vectors are empty".to_string()));
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(AppError::InputShape(format!(
                    "feature row {i} has width {}, expected {width}",
                    row.len()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(AppError::InputShape(format!(
                    "feature row {i} has a non-finite value in column {j}"
                )));
            }
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Ok(Self {
            data: DMatrix::from_row_slice(rows.len(), width, &flat),
        })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.row(row).iter().copied().collect()
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            data: self.data.select_rows(indices),
        }
    }
}

/// A scored symbol, created transiently while ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub score: f64,
    pub symbol: String,
    pub series: PriceSeries,
    /// Forward-looking prices, only present in evaluation runs.
    pub forward_prices: Option<Vec<f64>>,
}

/// Display summary for one retained top-K symbol.
///
/// Only built when the 5-day volume average and the 5-bar volatility are
/// defined. The 20-day and 20-bar figures are shown when available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    /// Position in the full ranking (0 = most anomalous).
    pub rank: usize,
    pub symbol: String,
    pub latest_bar_time: String,
    pub today_volume: String,
    pub avg_volume_5d: String,
    pub avg_volume_20d: Option<String>,
    pub volatility_5bar: f64,
    pub volatility_20bar: Option<f64>,
    pub anomaly_score: f64,
}

/// How results are surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Only the ranked symbol list; no text is produced.
    Machine,
    /// Ranked symbol list plus one formatted text block per entry.
    Human,
}

impl OutputMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "machine" | "json" => Some(OutputMode::Machine),
            "human" | "cli" | "text" => Some(OutputMode::Human),
            _ => None,
        }
    }
}

/// Which collaborator produces features and price history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A previously saved JSON snapshot.
    Snapshot(PathBuf),
    /// Deterministic synthetic market data.
    Sample,
}

/// A full run's configuration as understood by the pipeline.
///
/// Built once by the caller and passed by reference; nothing in the pipeline
/// mutates it.
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    pub top_n: usize,
    /// Number of recent days the data engine uses for features.
    pub history_window: usize,
    /// Forwarded to the data engine.
    pub min_volume: f64,
    /// Forwarded to the data engine.
    pub granularity_minutes: u32,
    pub output_mode: OutputMode,
    /// Forwarded to the data engine.
    pub volatility_filter: bool,
    pub data_source: DataSource,
    /// Restrict the run to these symbols (empty = everything the engine knows).
    pub symbols: Vec<String>,
    /// Evaluate the ranking against forward prices.
    pub test_mode: bool,

    pub model_seed: u64,
    pub n_estimators: usize,

    /// Synthetic source only.
    pub sample_seed: u64,
    pub sample_symbols: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            history_window: 7,
            min_volume: 5000.0,
            granularity_minutes: 60,
            output_mode: OutputMode::Human,
            volatility_filter: false,
            data_source: DataSource::Sample,
            symbols: Vec::new(),
            test_mode: false,
            model_seed: 0,
            n_estimators: 100,
            sample_seed: 42,
            sample_symbols: 50,
        }
    }
}

impl ScreenConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.top_n == 0 {
            return Err(AppError::Config("top_n must be > 0".to_string()));
        }
        if self.history_window == 0 {
            return Err(AppError::Config("history_window must be > 0".to_string()));
        }
        if self.n_estimators == 0 {
            return Err(AppError::Config("n_estimators must be > 0".to_string()));
        }
        if self.granularity_minutes == 0 {
            return Err(AppError::Config("granularity_minutes must be > 0".to_string()));
        }
        if !(self.min_volume.is_finite() && self.min_volume >= 0.0) {
            return Err(AppError::Config("min_volume must be a non-negative number".to_string()));
        }
        if self.data_source == DataSource::Sample && self.sample_symbols == 0 {
            return Err(AppError::Config("sample_symbols must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: &str) -> Bar {
        Bar {
            timestamp: ts.to_string(),
            close: 1.0,
            volume: 1.0,
        }
    }

    #[test]
    fn bar_date_handles_space_and_iso_separators() {
        assert_eq!(bar("2024-03-01 15:30:00").date(), "2024-03-01");
        assert_eq!(bar("2024-03-01T15:30:00").date(), "2024-03-01");
        assert_eq!(bar("2024-03-01").date(), "2024-03-01");
    }

    #[test]
    fn feature_matrix_rejects_ragged_rows() {
        let err = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, AppError::InputShape(_)));
    }

    #[test]
    fn feature_matrix_rejects_empty_and_nan() {
        assert!(FeatureMatrix::from_rows(&[]).is_err());
        assert!(FeatureMatrix::from_rows(&[vec![]]).is_err());
        assert!(FeatureMatrix::from_rows(&[vec![1.0, f64::NAN]]).is_err());
    }

    #[test]
    fn feature_matrix_keeps_row_order() {
        let m = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m.row(1), vec![3.0, 4.0]);
        assert_eq!(m.get(2, 0), 5.0);

        let picked = m.select_rows(&[2, 0]);
        assert_eq!(picked.nrows(), 2);
        assert_eq!(picked.row(0), vec![5.0, 6.0]);
        assert_eq!(picked.row(1), vec![1.0, 2.0]);
    }

    #[test]
    fn config_validation() {
        assert!(ScreenConfig::default().validate().is_ok());
        let bad = ScreenConfig {
            top_n: 0,
            ..ScreenConfig::default()
        };
        assert!(matches!(bad.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn output_mode_parse() {
        assert_eq!(OutputMode::parse("CLI"), Some(OutputMode::Human));
        assert_eq!(OutputMode::parse("machine"), Some(OutputMode::Machine));
        assert_eq!(OutputMode::parse("xml"), None);
    }
}
