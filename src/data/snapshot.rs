//! Load a previously saved data snapshot (JSON).
//!
//! Schema:
//!
//! ```text
//! {
//!   "symbols":        ["AAPL", ...],
//!   "features":       [[f64, ...], ...],
//!   "price_series":   [[{"timestamp": "...", "close": f64, "volume": f64}, ...], ...],
//!   "forward_prices": [[f64, ...] | null, ...]      (optional)
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::data::{DataEngine, EngineOutput, EngineRequest};
use crate::domain::{FeatureMatrix, PriceSeries};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbols: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub price_series: Vec<PriceSeries>,
    #[serde(default)]
    pub forward_prices: Vec<Option<Vec<f64>>>,
}

impl Snapshot {
    pub fn read(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::Data(format!("Failed to open snapshot '{}': {e}", path.display())))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::Data(format!("Invalid snapshot JSON '{}': {e}", path.display())))
    }

    /// Restrict to `symbols` (keeping snapshot order) and build the engine output.
    pub fn into_output(self, symbols: &[String]) -> Result<EngineOutput, AppError> {
        let n = self.symbols.len();
        if self.features.len() != n || self.price_series.len() != n {
            return Err(AppError::InputShape(format!(
                "snapshot has {n} symbols, {} feature rows, {} price series",
                self.features.len(),
                self.price_series.len()
            )));
        }
        let mut forward_prices = self.forward_prices;
        if forward_prices.is_empty() {
            forward_prices = vec![None; n];
        } else if forward_prices.len() != n {
            return Err(AppError::InputShape(format!(
                "snapshot has {n} symbols but {} forward price rows",
                forward_prices.len()
            )));
        }

        let keep: Vec<usize> = (0..n)
            .filter(|&i| symbols.is_empty() || symbols.contains(&self.symbols[i]))
            .collect();
        if keep.is_empty() {
            return Err(AppError::InputShape("no requested symbols present in snapshot".to_string()));
        }

        let features = FeatureMatrix::from_rows(&self.features)?.select_rows(&keep);
        Ok(EngineOutput {
            features,
            price_series: keep.iter().map(|&i| self.price_series[i].clone()).collect(),
            forward_prices: keep.iter().map(|&i| forward_prices[i].clone()).collect(),
            symbols: keep.iter().map(|&i| self.symbols[i].clone()).collect(),
        })
    }
}

/// Serves a snapshot file written by an upstream collector.
#[derive(Debug, Clone)]
pub struct SnapshotEngine {
    path: PathBuf,
}

impl SnapshotEngine {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DataEngine for SnapshotEngine {
    fn collect_or_load(&self, request: &EngineRequest) -> Result<EngineOutput, AppError> {
        let snapshot = Snapshot::read(&self.path)?;
        debug!(
            "Loaded snapshot {} with {} symbols",
            self.path.display(),
            snapshot.symbols.len()
        );
        let output = snapshot.into_output(&request.symbols)?;
        info!("Snapshot provides {} symbols", output.symbols.len());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT_JSON: &str = r#"{
        "symbols": ["AAA", "BBB", "CCC"],
        "features": [[1.0, 2.0], [1.1, 2.1], [9.0, -4.0]],
        "price_series": [
            [{"timestamp": "2024-01-02 16:00:00", "close": 10.0, "volume": 1000}],
            [{"timestamp": "2024-01-02 16:00:00", "close": 11.0, "volume": 2000}],
            [{"timestamp": "2024-01-02 16:00:00", "close": 12.0, "volume": 3000}]
        ]
    }"#;

    #[test]
    fn parses_without_forward_prices() {
        let snapshot: Snapshot = serde_json::from_str(SNAPSHOT_JSON).unwrap();
        let out = snapshot.into_output(&[]).unwrap();
        assert_eq!(out.symbols, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(out.forward_prices, vec![None, None, None]);
        assert_eq!(out.price_series[2].bars[0].volume, 3000.0);
        assert!(out.validate().is_ok());
    }

    #[test]
    fn filters_requested_symbols_in_snapshot_order() {
        let snapshot: Snapshot = serde_json::from_str(SNAPSHOT_JSON).unwrap();
        let out = snapshot
            .into_output(&["CCC".to_string(), "AAA".to_string()])
            .unwrap();
        assert_eq!(out.symbols, vec!["AAA", "CCC"]);
        assert_eq!(out.features.row(1), vec![9.0, -4.0]);
    }

    #[test]
    fn unknown_symbols_only_is_an_error() {
        let snapshot: Snapshot = serde_json::from_str(SNAPSHOT_JSON).unwrap();
        assert!(snapshot.into_output(&["ZZZ".to_string()]).is_err());
    }

    #[test]
    fn ragged_features_are_rejected() {
        let mut snapshot: Snapshot = serde_json::from_str(SNAPSHOT_JSON).unwrap();
        snapshot.features[1] = vec![1.0];
        assert!(matches!(snapshot.into_output(&[]), Err(AppError::InputShape(_))));
    }

    #[test]
    fn missing_file_is_a_data_error() {
        let engine = SnapshotEngine::new(PathBuf::from("/nonexistent/snapshot.json"));
        let req = EngineRequest::from_config(&crate::domain::ScreenConfig::default());
        assert!(matches!(engine.collect_or_load(&req), Err(AppError::Data(_))));
    }
}
