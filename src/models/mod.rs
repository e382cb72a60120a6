//! Unsupervised outlier models.
//!
//! The ranker only depends on `OutlierModel`, so any algorithm can be swapped in
//! as long as it keeps the sign convention: lower score = more anomalous.

pub mod isolation_forest;

pub use isolation_forest::*;

use crate::domain::FeatureMatrix;
use crate::error::AppError;

pub trait OutlierModel {
    /// Fit on the whole matrix and return one score per row, index-aligned.
    ///
    /// Any fitted state lives only for the duration of the call, so a single
    /// model value can be shared between concurrent runs.
    fn fit_and_score(&self, features: &FeatureMatrix) -> Result<Vec<f64>, AppError>;

    fn name(&self) -> &str;
}
