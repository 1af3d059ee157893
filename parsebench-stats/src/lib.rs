#![warn(missing_docs)]
//! ParseBench Statistical Engine
//!
//! Turns noisy per-run timing samples into a single representative duration:
//! - Quartile estimation with linear interpolation between ranks
//! - High-low trimming (drop one maximum and one minimum)
//! - IQR fencing with the conventional 1.5 multiplier
//! - Decimal rounding for reported values

mod outliers;
mod quartiles;
mod rounding;

pub use outliers::{OutlierAnalysis, OutlierPolicy, StatsError, filter_outliers, filtered_mean, mean};
pub use quartiles::{compute_quartile, quartiles};
pub use rounding::round_to;

/// Multiplier applied to the interquartile range when fencing samples
pub const IQR_FENCE: f64 = 1.5;

/// Minimum sample count before high-low trimming removes anything
pub const HIGH_LOW_MIN_SAMPLES: usize = 3;
