//! Data engines: the collaborators that produce features and price history.
//!
//! The screener never fetches or caches market data itself. It asks a
//! `DataEngine` for an `EngineOutput` and only relies on its alignment contract:
//! row `i` of the feature matrix, `price_series[i]`, `forward_prices[i]` and
//! `symbols[i]` all describe the same symbol.

use crate::domain::{DataSource, FeatureMatrix, PriceSeries, ScreenConfig};
use crate::error::AppError;

pub mod sample;
pub mod snapshot;

pub use sample::SampleEngine;
pub use snapshot::{Snapshot, SnapshotEngine};

/// Parameters forwarded to the data engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    /// Empty = every symbol the engine knows about.
    pub symbols: Vec<String>,
    pub history_window: usize,
    pub granularity_minutes: u32,
    pub volume_floor: f64,
    pub volatility_filter: bool,
    pub with_forward_prices: bool,
}

impl EngineRequest {
    pub fn from_config(config: &ScreenConfig) -> Self {
        Self {
            symbols: config.symbols.clone(),
            history_window: config.history_window,
            granularity_minutes: config.granularity_minutes,
            volume_floor: config.min_volume,
            volatility_filter: config.volatility_filter,
            with_forward_prices: config.test_mode,
        }
    }
}

/// Everything the screener needs for one run.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub features: FeatureMatrix,
    pub price_series: Vec<PriceSeries>,
    /// Evaluation only; `None` per symbol when not available.
    pub forward_prices: Vec<Option<Vec<f64>>>,
    pub symbols: Vec<String>,
}

impl EngineOutput {
    /// Check the row-alignment contract.
    pub fn validate(&self) -> Result<(), AppError> {
        let n = self.symbols.len();
        if n == 0 {
            return Err(AppError::InputShape("data engine returned no symbols".to_string()));
        }
        if self.features.nrows() != n {
            return Err(AppError::InputShape(format!(
                "{} feature rows for {n} symbols",
                self.features.nrows()
            )));
        }
        if self.price_series.len() != n {
            return Err(AppError::InputShape(format!(
                "{} price series for {n} symbols",
                self.price_series.len()
            )));
        }
        if self.forward_prices.len() != n {
            return Err(AppError::InputShape(format!(
                "{} forward price rows for {n} symbols",
                self.forward_prices.len()
            )));
        }
        Ok(())
    }
}

pub trait DataEngine {
    /// Produce aligned features, price history, forward prices and symbol ids.
    ///
    /// Whether this loads a saved snapshot or builds fresh data is the engine's
    /// own decision.
    fn collect_or_load(&self, request: &EngineRequest) -> Result<EngineOutput, AppError>;
}

/// Build the engine selected by the configuration.
pub fn engine_for(config: &ScreenConfig) -> Box<dyn DataEngine> {
    match &config.data_source {
        DataSource::Snapshot(path) => Box::new(SnapshotEngine::new(path.clone())),
        DataSource::Sample => Box::new(SampleEngine::new(config.sample_seed, config.sample_symbols)),
    }
}
