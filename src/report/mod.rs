//! Ranking, enrichment, and formatted terminal output.
//!
//! Ranking and enrichment produce finalized `ReportEntry` values; formatting only
//! ever reads those, so output-channel concerns stay out of the scoring path.

use std::cmp::Ordering;

use log::debug;

use crate::analytics::{recent_volatility, volume_changes};
use crate::domain::{PriceSeries, RankedEntry, ReportEntry};
use crate::error::AppError;

pub mod evaluation;
pub mod format;

pub use evaluation::*;
pub use format::*;

/// Ranking order: ascending score (most anomalous first), then symbol.
///
/// Entries equal on both keep their input order because the sort is stable.
/// NaN scores sort after every other score whatever their sign bit.
pub fn compare_ranked(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    a.score
        .is_nan()
        .cmp(&b.score.is_nan())
        .then_with(|| a.score.total_cmp(&b.score))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Join scores with their symbols and series, then sort by `compare_ranked`.
pub fn rank_entries(
    scores: &[f64],
    symbols: &[String],
    series: &[PriceSeries],
    forward_prices: &[Option<Vec<f64>>],
) -> Result<Vec<RankedEntry>, AppError> {
    let n = scores.len();
    if symbols.len() != n || series.len() != n || forward_prices.len() != n {
        return Err(AppError::InputShape(format!(
            "misaligned ranking inputs: {n} scores, {} symbols, {} series, {} forward rows",
            symbols.len(),
            series.len(),
            forward_prices.len()
        )));
    }

    let mut ranked: Vec<RankedEntry> = scores
        .iter()
        .zip(symbols)
        .zip(series)
        .zip(forward_prices)
        .map(|(((&score, symbol), series), forward)| RankedEntry {
            score,
            symbol: symbol.clone(),
            series: series.clone(),
            forward_prices: forward.clone(),
        })
        .collect();
    ranked.sort_by(compare_ranked);
    Ok(ranked)
}

/// Build the report for the entry at position `rank` in the ranking, or `None`
/// if the 5-day volume average or the 5-bar volatility is undefined.
pub fn build_report_entry(rank: usize, entry: &RankedEntry) -> Option<ReportEntry> {
    let volume = volume_changes(&entry.series)?;
    let volatility = recent_volatility(&entry.series.closes());
    let avg_volume_5d = volume.avg_volume_5d?;
    let volatility_5bar = volatility.vol_5bar?;

    Some(ReportEntry {
        rank,
        symbol: entry.symbol.clone(),
        latest_bar_time: volume.latest_bar_time,
        today_volume: volume.today_volume,
        avg_volume_5d,
        avg_volume_20d: volume.avg_volume_20d,
        volatility_5bar,
        volatility_20bar: volatility.vol_20bar,
        anomaly_score: entry.score,
    })
}

/// Enrich the first `top_n` ranked entries and drop incomplete ones.
///
/// Dropped entries are not backfilled from further down the ranking, so the
/// result may be shorter than `top_n`.
pub fn build_report(ranked: &[RankedEntry], top_n: usize) -> Vec<ReportEntry> {
    ranked
        .iter()
        .take(top_n)
        .enumerate()
        .filter_map(|(rank, entry)| {
            let report = build_report_entry(rank, entry);
            if report.is_none() {
                if entry.series.is_empty() {
                    debug!("Skipping {}: no price history", entry.symbol);
                } else {
                    debug!(
                        "Skipping {}: 5d volume or 5-bar volatility undefined ({} bars)",
                        entry.symbol,
                        entry.series.len()
                    );
                }
            }
            report
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::{Duration, NaiveDate};

    fn series_with_days(days: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..days)
            .map(|i| Bar {
                timestamp: format!("{} 16:00:00", start + Duration::days(i as i64)),
                close: 100.0 + (i % 3) as f64,
                volume: 10_000.0,
            })
            .collect();
        PriceSeries::new(bars)
    }

    fn ranked(score: f64, symbol: &str, days: usize) -> RankedEntry {
        RankedEntry {
            score,
            symbol: symbol.to_string(),
            series: series_with_days(days),
            forward_prices: None,
        }
    }

    #[test]
    fn rank_orders_by_score_then_symbol() {
        let scores = [0.10, -0.20, 0.10, -0.05];
        let symbols: Vec<String> = ["MSFT", "TSLA", "AAPL", "NVDA"].iter().map(|s| s.to_string()).collect();
        let series = vec![PriceSeries::default(); 4];
        let forward = vec![None; 4];

        let out = rank_entries(&scores, &symbols, &series, &forward).unwrap();
        let order: Vec<&str> = out.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["TSLA", "NVDA", "AAPL", "MSFT"]);
    }

    #[test]
    fn nan_scores_rank_last() {
        let symbols = vec!["AAA".to_string(), "BBB".to_string()];
        let series = [PriceSeries::default(), PriceSeries::default()];

        let out = rank_entries(&[f64::NAN, 0.3], &symbols, &series, &[None, None]).unwrap();
        assert_eq!(out[0].symbol, "BBB");

        // Arithmetic NaN may carry the sign bit, which total_cmp orders first.
        let zero = std::hint::black_box(0.0_f64);
        let computed = (zero / zero).copysign(-1.0);
        assert!(computed.is_nan() && computed.is_sign_negative());
        let out = rank_entries(&[0.3, computed], &symbols, &series, &[None, None]).unwrap();
        let order: Vec<&str> = out.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["AAA", "BBB"]);

        let out = rank_entries(&[computed, -f64::INFINITY], &symbols, &series, &[None, None]).unwrap();
        assert_eq!(out[0].symbol, "BBB");
    }

    #[test]
    fn rank_rejects_misaligned_inputs() {
        let err = rank_entries(&[0.1, 0.2], &["A".to_string()], &[PriceSeries::default()], &[None]).unwrap_err();
        assert!(matches!(err, AppError::InputShape(_)));
    }

    #[test]
    fn report_skips_short_history_without_backfill() {
        let entries = vec![
            ranked(-0.3, "AAA", 25),
            ranked(-0.2, "BBB", 1),
            ranked(-0.1, "CCC", 25),
            ranked(0.0, "DDD", 25),
        ];
        let report = build_report(&entries, 3);
        let symbols: Vec<&str> = report.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "CCC"]);
    }

    #[test]
    fn report_entry_carries_score_and_volume() {
        let entry = build_report_entry(0, &ranked(-0.123, "AAA", 25)).unwrap();
        assert_eq!(entry.anomaly_score, -0.123);
        assert_eq!(entry.today_volume, "10.0K");
        assert_eq!(entry.avg_volume_5d, "10.0K");
        assert_eq!(entry.avg_volume_20d.as_deref(), Some("10.0K"));
        assert!(entry.volatility_20bar.is_some());
        assert_eq!(entry.latest_bar_time, "2024-01-25 16:00:00");
    }

    #[test]
    fn bad_close_outside_short_windows_keeps_the_entry() {
        let mut entry = ranked(-0.2, "AAA", 25);
        entry.series.bars[0].close = f64::NAN;
        let report = build_report_entry(3, &entry).unwrap();
        assert_eq!(report.rank, 3);
        assert!(report.volatility_20bar.is_some());

        entry.series.bars[22].close = f64::NAN;
        assert!(build_report_entry(3, &entry).is_none());
    }

    #[test]
    fn missing_twenty_day_figures_do_not_drop_the_entry() {
        let mut entry = ranked(-0.2, "AAA", 25);
        // Day ranked 13th most recent: inside the 20d range only.
        entry.series.bars[12].volume = f64::NAN;
        let report = build_report_entry(0, &entry).unwrap();
        assert_eq!(report.avg_volume_5d, "10.0K");
        assert_eq!(report.avg_volume_20d, None);

        entry.series.bars[22].volume = f64::NAN;
        assert!(build_report_entry(0, &entry).is_none());
    }

    #[test]
    fn report_ranks_index_the_full_ranking() {
        let entries = vec![ranked(-0.3, "AAA", 25), ranked(-0.2, "BBB", 1), ranked(-0.1, "AAA", 25)];
        let ranks: Vec<usize> = build_report(&entries, 3).iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![0, 2]);
    }

    #[test]
    fn top_n_larger_than_population_takes_all() {
        let entries = vec![ranked(-0.3, "AAA", 25), ranked(-0.1, "BBB", 25)];
        assert_eq!(build_report(&entries, 50).len(), 2);
    }
}
