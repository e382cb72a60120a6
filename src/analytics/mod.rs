//! Display statistics derived from a symbol's raw price/volume history.
//!
//! These run only for the top-K symbols after ranking; they never feed back
//! into the anomaly score.

pub mod volatility;
pub mod volume;

pub use volatility::*;
pub use volume::*;
