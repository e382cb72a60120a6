//! Synthetic intraday market data with a few injected shocks.
//!
//! Used when no snapshot is configured, so the screener can run end-to-end
//! without network access. Every symbol draws from its own `StdRng` seeded from
//! `(seed, symbol)`, so the same request always yields the same market.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use log::{debug, info};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::analytics::DailyVolumes;
use crate::data::{DataEngine, EngineOutput, EngineRequest};
use crate::domain::{Bar, FeatureMatrix, PriceSeries};
use crate::error::AppError;
use crate::math::{mean, population_std};

/// Trading days of history generated per symbol.
const HISTORY_DAYS: usize = 30;
/// Forward bars generated for evaluation runs.
const FORWARD_BARS: usize = 5;
/// Regular session length in minutes (09:30 - 16:00).
const SESSION_MINUTES: u32 = 390;
/// Every n-th symbol gets a shock on its last day.
const SHOCK_EVERY: usize = 10;
const SHOCK_VOLUME_MULT: f64 = 8.0;
const SHOCK_PRICE_MOVE: f64 = 0.06;
/// Symbols whose per-bar return dispersion exceeds this are dropped when the
/// volatility filter is on.
const MAX_BAR_VOLATILITY: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct SampleEngine {
    seed: u64,
    n_symbols: usize,
}

impl SampleEngine {
    pub fn new(seed: u64, n_symbols: usize) -> Self {
        Self { seed, n_symbols }
    }

    fn universe(&self, request: &EngineRequest) -> Vec<String> {
        if request.symbols.is_empty() {
            (1..=self.n_symbols).map(|i| format!("SYM{i:03}")).collect()
        } else {
            request.symbols.clone()
        }
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        symbol.hash(&mut hasher);
        hasher.finish()
    }

    /// Generate history (and optionally forward closes) for one symbol.
    pub fn generate(
        &self,
        symbol: &str,
        index: usize,
        granularity_minutes: u32,
        with_forward: bool,
    ) -> Result<(PriceSeries, Option<Vec<f64>>), AppError> {
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        let sigma = rng.gen_range(0.002..0.012);
        let returns = Normal::new(0.0, sigma)
            .map_err(|e| AppError::Data(format!("Return distribution error: {e}")))?;
        let volume_noise = LogNormal::new(0.0, 0.35)
            .map_err(|e| AppError::Data(format!("Volume distribution error: {e}")))?;
        let base_volume = rng.gen_range(2_000.0..60_000.0);
        let mut price: f64 = rng.gen_range(5.0..500.0);

        let shocked = index % SHOCK_EVERY == SHOCK_EVERY - 1;
        let days = trading_days(HISTORY_DAYS);
        let times = session_times(granularity_minutes);

        let mut bars = Vec::with_capacity(days.len() * times.len());
        for (d, day) in days.iter().enumerate() {
            let last_day = d + 1 == days.len();
            for (t, time) in times.iter().enumerate() {
                let mut r = returns.sample(&mut rng);
                let mut volume = base_volume * volume_noise.sample(&mut rng);
                if shocked && last_day {
                    volume *= SHOCK_VOLUME_MULT;
                    if t == 0 {
                        r += SHOCK_PRICE_MOVE;
                    }
                }
                price *= r.exp();
                bars.push(Bar {
                    timestamp: format!("{} {}", day, time.format("%H:%M:%S")),
                    close: price,
                    volume: volume.round(),
                });
            }
        }

        let forward = with_forward.then(|| {
            (0..FORWARD_BARS)
                .map(|_| {
                    price *= returns.sample(&mut rng).exp();
                    price
                })
                .collect()
        });

        Ok((PriceSeries::new(bars), forward))
    }
}

impl DataEngine for SampleEngine {
    fn collect_or_load(&self, request: &EngineRequest) -> Result<EngineOutput, AppError> {
        let universe = self.universe(request);
        let mut symbols = Vec::new();
        let mut rows = Vec::new();
        let mut price_series = Vec::new();
        let mut forward_prices = Vec::new();

        for (index, symbol) in universe.iter().enumerate() {
            let (series, forward) = self.generate(
                symbol,
                index,
                request.granularity_minutes,
                request.with_forward_prices,
            )?;

            let Some(window) = WindowStats::compute(&series, request.history_window) else {
                debug!("Dropping {symbol}: not enough history for features");
                continue;
            };
            if window.mean_daily_volume < request.volume_floor {
                debug!(
                    "Dropping {symbol}: mean daily volume {:.0} below floor {:.0}",
                    window.mean_daily_volume, request.volume_floor
                );
                continue;
            }
            if request.volatility_filter && window.bar_volatility > MAX_BAR_VOLATILITY {
                debug!(
                    "Dropping {symbol}: bar volatility {:.4} above {MAX_BAR_VOLATILITY}",
                    window.bar_volatility
                );
                continue;
            }

            rows.push(window.features());
            symbols.push(symbol.clone());
            price_series.push(series);
            forward_prices.push(forward);
        }

        if symbols.is_empty() {
            return Err(AppError::InputShape(
                "no sample symbols passed the volume/volatility filters".to_string(),
            ));
        }
        info!(
            "Sample engine produced {} of {} symbols",
            symbols.len(),
            universe.len()
        );

        Ok(EngineOutput {
            features: FeatureMatrix::from_rows(&rows)?,
            price_series,
            forward_prices,
            symbols,
        })
    }
}

/// Summary of the last `history_window` days of a series.
#[derive(Debug, Clone, PartialEq)]
struct WindowStats {
    volume_ratio: f64,
    price_change: f64,
    bar_volatility: f64,
    price_range: f64,
    mean_daily_volume: f64,
}

impl WindowStats {
    fn compute(series: &PriceSeries, history_window: usize) -> Option<Self> {
        let daily = DailyVolumes::from_series(series);
        if daily.days.len() < history_window.max(2) {
            return None;
        }
        let window_days = &daily.days[..history_window.max(2)];
        let first_day = window_days.last().map(|(d, _)| d.as_str())?;

        let closes: Vec<f64> = series
            .bars
            .iter()
            .filter(|b| b.date() >= first_day)
            .map(|b| b.close)
            .collect();
        let first = *closes.first()?;
        let last = *closes.last()?;
        if first <= 0.0 || last <= 0.0 {
            return None;
        }

        let log_returns: Vec<f64> = closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        let prior: Vec<f64> = window_days[1..].iter().map(|(_, v)| *v).collect();
        let totals: Vec<f64> = window_days.iter().map(|(_, v)| *v).collect();
        let prior_mean = mean(&prior)?;
        let hi = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lo = closes.iter().copied().fold(f64::INFINITY, f64::min);

        let stats = Self {
            volume_ratio: if prior_mean > 0.0 { window_days[0].1 / prior_mean } else { 1.0 },
            price_change: last / first - 1.0,
            bar_volatility: population_std(&log_returns).unwrap_or(0.0),
            price_range: (hi - lo) / last,
            mean_daily_volume: mean(&totals)?,
        };
        stats.features().iter().all(|v| v.is_finite()).then_some(stats)
    }

    fn features(&self) -> Vec<f64> {
        vec![self.volume_ratio, self.price_change, self.bar_volatility, self.price_range]
    }
}

/// The last `n` weekdays ending on a fixed reference date, oldest first.
fn trading_days(n: usize) -> Vec<NaiveDate> {
    let mut day = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap_or_default();
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(day);
        }
        day -= Duration::days(1);
    }
    out.reverse();
    out
}

/// Bar close times within one session for the given granularity.
fn session_times(granularity_minutes: u32) -> Vec<NaiveTime> {
    let open = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default();
    let step = granularity_minutes.clamp(1, SESSION_MINUTES);
    (1..=SESSION_MINUTES / step)
        .map(|k| open + Duration::minutes(i64::from(k * step)))
        .collect()
}
