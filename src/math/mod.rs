//! Mathematical utilities shared by the analytics and the scorer.

pub mod stats;

pub use stats::*;
