//! The screening pipeline shared by the binary and library callers.
//!
//! One call walks a fixed sequence of stages with no retries and no state
//! carried between calls:
//!
//! acquire -> score -> rank -> enrich -> filter -> (render)
//!
//! Rendering only reads the finalized report, so `run_screen` never touches an
//! output channel.

use std::io::Write;

use log::{debug, info};

use crate::data::{DataEngine, EngineRequest};
use crate::domain::{OutputMode, ReportEntry, ScreenConfig};
use crate::error::AppError;
use crate::models::{IsolationForest, OutlierModel};
use crate::report::{Evaluation, build_report, evaluate, format_evaluation, rank_entries, write_report};

/// All computed outputs of a single screening run.
#[derive(Debug, Clone)]
pub struct ScreenOutput {
    /// Surviving top-K entries, most anomalous first.
    pub entries: Vec<ReportEntry>,
    /// Symbols of `entries`, same order.
    pub symbols: Vec<String>,
    /// Size of the scored population.
    pub population: usize,
    /// Present in test mode only.
    pub evaluation: Option<Evaluation>,
}

/// The outlier model configured by `config`.
pub fn model_from_config(config: &ScreenConfig) -> IsolationForest {
    IsolationForest::new(config.n_estimators, config.model_seed)
}

/// Execute the pipeline and return the finalized report.
pub fn run_screen(
    engine: &dyn DataEngine,
    model: &dyn OutlierModel,
    config: &ScreenConfig,
) -> Result<ScreenOutput, AppError> {
    config.validate()?;

    // 1) Acquire.
    let data = engine.collect_or_load(&EngineRequest::from_config(config))?;
    data.validate()?;
    info!(
        "Acquired {} symbols x {} features",
        data.symbols.len(),
        data.features.ncols()
    );

    // 2) Score.
    let scores = model.fit_and_score(&data.features)?;
    if scores.len() != data.symbols.len() {
        return Err(AppError::ModelFit(format!(
            "{} returned {} scores for {} rows",
            model.name(),
            scores.len(),
            data.symbols.len()
        )));
    }
    debug!("Scored {} symbols with {}", scores.len(), model.name());

    // 3) Rank.
    let ranked = rank_entries(&scores, &data.symbols, &data.price_series, &data.forward_prices)?;

    // 4-5) Enrich the top-K and drop incomplete entries.
    let entries = build_report(&ranked, config.top_n);
    info!(
        "Reporting {} of top {} (population {})",
        entries.len(),
        config.top_n.min(ranked.len()),
        ranked.len()
    );

    let evaluation = config.test_mode.then(|| evaluate(&ranked, &entries));
    if let Some(eval) = &evaluation {
        info!(
            "Forward evaluation: top-K mean |move| {:?}, population mean |move| {:?}",
            eval.reported_mean_abs_move, eval.population_mean_abs_move
        );
    }

    Ok(ScreenOutput {
        symbols: entries.iter().map(|e| e.symbol.clone()).collect(),
        entries,
        population: ranked.len(),
        evaluation,
    })
}

/// Run the pipeline, render text blocks to `sink` in human mode, and return the
/// ranked symbols (most anomalous first).
pub fn find_anomalies(
    engine: &dyn DataEngine,
    model: &dyn OutlierModel,
    config: &ScreenConfig,
    sink: &mut dyn Write,
) -> Result<Vec<String>, AppError> {
    let output = run_screen(engine, model, config)?;
    if config.output_mode == OutputMode::Human {
        write_report(sink, &output.entries)?;
        if let Some(eval) = &output.evaluation {
            writeln!(sink, "{}", format_evaluation(eval))?;
        }
    }
    Ok(output.symbols)
}
