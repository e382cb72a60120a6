//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the scoring/ranking code stays clean and testable
//! - output changes are localized

use std::io::Write;

use crate::domain::ReportEntry;
use crate::error::AppError;
use crate::report::Evaluation;

const BLOCK_SEPARATOR: &str = "----------------------";
const MISSING: &str = "-";

/// Render a non-negative count compactly.
///
/// - `< 1000`: plain integer (`"500"`)
/// - `< 1_000_000`: thousands, rounded to 2 decimals (`"1.5K"`)
/// - otherwise: millions, rounded to 1 decimal (`"2.5M"`)
pub fn format_magnitude(value: f64) -> String {
    if value < 1_000.0 {
        format!("{value:.0}")
    } else if value < 1_000_000.0 {
        format!("{}K", trim_rounded(value / 1_000.0, 2))
    } else {
        format!("{}M", trim_rounded(value / 1_000_000.0, 1))
    }
}

/// Round to `decimals` places and print the shortest form, keeping at least
/// one fractional digit (`1.50` -> `1.5`, `2.00` -> `2.0`).
fn trim_rounded(value: f64, decimals: usize) -> String {
    let rounded = format!("{value:.decimals$}");
    let shortest = rounded
        .parse::<f64>()
        .map(|v| v.to_string())
        .unwrap_or(rounded);
    if shortest.contains('.') {
        shortest
    } else {
        format!("{shortest}.0")
    }
}

/// Render one entry as a fixed-field text block.
pub fn format_report_entry(entry: &ReportEntry) -> String {
    format!(
        "Last Bar Time: {}\n\
         Symbol: {}\n\
         Anomaly Score: {:.3}\n\
         Today Volume: {}\n\
         Average Volume 5d: {}\n\
         Average Volume 20d: {}\n\
         Volatility 5bars: {:.3}\n\
         Volatility 20bars: {}\n\
         {BLOCK_SEPARATOR}",
        entry.latest_bar_time,
        entry.symbol,
        entry.anomaly_score,
        entry.today_volume,
        entry.avg_volume_5d,
        entry.avg_volume_20d.as_deref().unwrap_or(MISSING),
        entry.volatility_5bar,
        fmt_opt3(entry.volatility_20bar),
    )
}

fn fmt_opt3(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.3}"))
}

/// Write every entry's block to `sink`, in ranked order.
pub fn write_report(sink: &mut dyn Write, entries: &[ReportEntry]) -> Result<(), AppError> {
    for entry in entries {
        writeln!(sink, "{}", format_report_entry(entry))?;
    }
    Ok(())
}

/// Render the forward-price evaluation summary.
pub fn format_evaluation(eval: &Evaluation) -> String {
    let mut out = String::new();
    out.push_str("Forward evaluation:\n");
    out.push_str(&format!(
        "- reported symbols : {} (with forward prices: {})\n",
        eval.reported_count, eval.reported_with_forward
    ));
    out.push_str(&format!(
        "- population       : {} (with forward prices: {})\n",
        eval.population_count, eval.population_with_forward
    ));
    out.push_str(&format!(
        "- mean |move| top-K     : {}\n",
        fmt_pct(eval.reported_mean_abs_move)
    ));
    out.push_str(&format!(
        "- mean |move| population: {}",
        fmt_pct(eval.population_mean_abs_move)
    ));
    out
}

fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => MISSING.to_string(),
    }
}
