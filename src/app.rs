//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - builds the run configuration from the environment (and `.env`)
//! - picks the data engine and outlier model
//! - runs the screening pipeline
//! - prints text blocks (human mode) or a JSON symbol list (machine mode)

use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use log::info;

use crate::domain::{DataSource, OutputMode, ScreenConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `screener` binary.
pub fn run() -> Result<(), AppError> {
    env_logger::try_init().ok();
    let config = screen_config_from_env()?;
    info!(
        "Screening top {} with {:?} output from {:?}",
        config.top_n, config.output_mode, config.data_source
    );

    let engine = crate::data::engine_for(&config);
    let model = pipeline::model_from_config(&config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let symbols = pipeline::find_anomalies(engine.as_ref(), &model, &config, &mut out)?;

    if config.output_mode == OutputMode::Machine {
        serde_json::to_writer(&mut out, &symbols)
            .map_err(|e| AppError::Io(std::io::Error::other(e)))?;
        writeln!(out)?;
    }
    Ok(())
}

/// Build the configuration from process environment variables, loading `.env`
/// first if present.
pub fn screen_config_from_env() -> Result<ScreenConfig, AppError> {
    dotenvy::dotenv().ok();
    screen_config_from_lookup(|key| std::env::var(key).ok())
}

/// Build the configuration from a key lookup (unset keys keep their defaults).
///
/// Recognized keys:
/// - `SCREENER_TOP_N`, `SCREENER_HISTORY_WINDOW`, `SCREENER_MIN_VOLUME`,
///   `SCREENER_GRANULARITY_MINUTES`
/// - `SCREENER_OUTPUT` (`human` | `machine`)
/// - `SCREENER_VOLATILITY_FILTER`, `SCREENER_TEST_MODE` (booleans)
/// - `SCREENER_DATA_SOURCE` (`sample` | `snapshot`) + `SCREENER_SNAPSHOT_PATH`
/// - `SCREENER_SYMBOLS` (comma-separated)
/// - `SCREENER_SEED`, `SCREENER_TREES`, `SCREENER_SAMPLE_SEED`, `SCREENER_SAMPLE_SYMBOLS`
pub fn screen_config_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ScreenConfig, AppError> {
    let defaults = ScreenConfig::default();

    let output_mode = match lookup("SCREENER_OUTPUT") {
        Some(v) => OutputMode::parse(&v)
            .ok_or_else(|| AppError::Config(format!("SCREENER_OUTPUT: unknown output mode '{v}'")))?,
        None => defaults.output_mode,
    };

    let data_source = match lookup("SCREENER_DATA_SOURCE").as_deref().map(str::trim) {
        None | Some("sample") => DataSource::Sample,
        Some("snapshot") => {
            let path = lookup("SCREENER_SNAPSHOT_PATH").ok_or_else(|| {
                AppError::Config("SCREENER_SNAPSHOT_PATH is required for the snapshot source".to_string())
            })?;
            DataSource::Snapshot(PathBuf::from(path))
        }
        Some(other) => {
            return Err(AppError::Config(format!(
                "SCREENER_DATA_SOURCE: unknown source '{other}'"
            )));
        }
    };

    let symbols = lookup("SCREENER_SYMBOLS")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let config = ScreenConfig {
        top_n: parse_var(&lookup, "SCREENER_TOP_N", defaults.top_n)?,
        history_window: parse_var(&lookup, "SCREENER_HISTORY_WINDOW", defaults.history_window)?,
        min_volume: parse_var(&lookup, "SCREENER_MIN_VOLUME", defaults.min_volume)?,
        granularity_minutes: parse_var(
            &lookup,
            "SCREENER_GRANULARITY_MINUTES",
            defaults.granularity_minutes,
        )?,
        output_mode,
        volatility_filter: parse_bool(&lookup, "SCREENER_VOLATILITY_FILTER", defaults.volatility_filter)?,
        data_source,
        symbols,
        test_mode: parse_bool(&lookup, "SCREENER_TEST_MODE", defaults.test_mode)?,
        model_seed: parse_var(&lookup, "SCREENER_SEED", defaults.model_seed)?,
        n_estimators: parse_var(&lookup, "SCREENER_TREES", defaults.n_estimators)?,
        sample_seed: parse_var(&lookup, "SCREENER_SAMPLE_SEED", defaults.sample_seed)?,
        sample_symbols: parse_var(&lookup, "SCREENER_SAMPLE_SYMBOLS", defaults.sample_symbols)?,
    };
    config.validate()?;
    Ok(config)
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key}: cannot parse '{raw}': {e}"))),
        None => Ok(default),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool, AppError> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("{key}: expected a boolean, got '{v}'"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = screen_config_from_lookup(lookup_from(&[])).unwrap();
        let defaults = ScreenConfig::default();
        assert_eq!(config.top_n, defaults.top_n);
        assert_eq!(config.output_mode, OutputMode::Human);
        assert_eq!(config.data_source, DataSource::Sample);
        assert!(config.symbols.is_empty());
    }

    #[test]
    fn parses_every_option() {
        let config = screen_config_from_lookup(lookup_from(&[
            ("SCREENER_TOP_N", "25"),
            ("SCREENER_HISTORY_WINDOW", "10"),
            ("SCREENER_MIN_VOLUME", "15000"),
            ("SCREENER_GRANULARITY_MINUTES", "30"),
            ("SCREENER_OUTPUT", "machine"),
            ("SCREENER_VOLATILITY_FILTER", "yes"),
            ("SCREENER_TEST_MODE", "1"),
            ("SCREENER_DATA_SOURCE", "snapshot"),
            ("SCREENER_SNAPSHOT_PATH", "data/snapshot.json"),
            ("SCREENER_SYMBOLS", "aapl, msft,,tsla"),
            ("SCREENER_SEED", "7"),
            ("SCREENER_TREES", "200"),
        ]))
        .unwrap();

        assert_eq!(config.top_n, 25);
        assert_eq!(config.history_window, 10);
        assert_eq!(config.min_volume, 15000.0);
        assert_eq!(config.granularity_minutes, 30);
        assert_eq!(config.output_mode, OutputMode::Machine);
        assert!(config.volatility_filter);
        assert!(config.test_mode);
        assert_eq!(config.data_source, DataSource::Snapshot(PathBuf::from("data/snapshot.json")));
        assert_eq!(config.symbols, vec!["AAPL", "MSFT", "TSLA"]);
        assert_eq!(config.model_seed, 7);
        assert_eq!(config.n_estimators, 200);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            screen_config_from_lookup(lookup_from(&[("SCREENER_TOP_N", "ten")])),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            screen_config_from_lookup(lookup_from(&[("SCREENER_TOP_N", "0")])),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            screen_config_from_lookup(lookup_from(&[("SCREENER_OUTPUT", "xml")])),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            screen_config_from_lookup(lookup_from(&[("SCREENER_DATA_SOURCE", "snapshot")])),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            screen_config_from_lookup(lookup_from(&[("SCREENER_TEST_MODE", "maybe")])),
            Err(AppError::Config(_))
        ));
    }
}
