//! `anomaly-screener` library crate.
//!
//! Scores every symbol by how unusual its feature vector is relative to the
//! population, ranks symbols by that score, and summarises volume and
//! volatility for the most anomalous ones.
//!
//! The binary (`screener`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - data engines and outlier models can be swapped by library callers

pub mod analytics;
pub mod app;
pub mod data;
pub mod domain;
pub mod error;
pub mod math;
pub mod models;
pub mod report;
