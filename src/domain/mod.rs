//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - market observations (`Bar`, `PriceSeries`)
//! - the scorer input (`FeatureMatrix`)
//! - ranking/report records (`RankedEntry`, `ReportEntry`)
//! - the run configuration (`ScreenConfig` and its enums)

pub mod types;

pub use types::*;
