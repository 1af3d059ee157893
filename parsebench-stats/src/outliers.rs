//! Outlier Filtering
//!
//! Two policies are supported:
//! - **High-low**: drop exactly one highest and one lowest sample when more than
//!   two samples exist. The trim is fixed, not proportional to the sample count.
//! - **IQR**: keep samples inside [Q1 - 1.5*IQR, Q3 + 1.5*IQR].
//!
//! If filtering leaves nothing to average, the unfiltered mean is used instead.

use crate::quartiles::quartiles;
use crate::{HIGH_LOW_MIN_SAMPLES, IQR_FENCE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How outliers are detected before averaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierPolicy {
    /// Remove one maximum and one minimum sample
    #[default]
    HighLow,
    /// Interquartile range fencing
    Iqr,
}

impl fmt::Display for OutlierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierPolicy::HighLow => write!(f, "high-low"),
            OutlierPolicy::Iqr => write!(f, "iqr"),
        }
    }
}

impl FromStr for OutlierPolicy {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high-low" | "highlow" | "high_low" => Ok(OutlierPolicy::HighLow),
            "iqr" => Ok(OutlierPolicy::Iqr),
            other => Err(StatsError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Errors from sample filtering
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    /// No samples were provided
    #[error("cannot average an empty sample set")]
    EmptySamples,
    /// Policy name not recognised
    #[error("unknown outlier policy '{0}' (expected 'high-low' or 'iqr')")]
    UnknownPolicy(String),
}

/// Result of outlier filtering
#[derive(Debug, Clone)]
pub struct OutlierAnalysis {
    /// Original samples, in input order
    pub all_samples: Vec<f64>,
    /// Samples kept for averaging
    pub retained: Vec<f64>,
    /// Fence used by IQR filtering, `None` for high-low
    pub bounds: Option<(f64, f64)>,
    /// Whether filtering emptied the set and the raw samples were kept instead
    pub fell_back: bool,
    /// Policy applied
    pub policy: OutlierPolicy,
}

impl OutlierAnalysis {
    /// Number of samples dropped by the policy
    pub fn removed_count(&self) -> usize {
        self.all_samples.len() - self.retained.len()
    }
}

/// Apply `policy` to `samples`
///
/// # Examples
///
/// ```
/// # use parsebench_stats::{filter_outliers, OutlierPolicy};
/// let analysis = filter_outliers(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0], OutlierPolicy::Iqr);
/// assert_eq!(analysis.removed_count(), 1);
/// ```
pub fn filter_outliers(samples: &[f64], policy: OutlierPolicy) -> OutlierAnalysis {
    let (mut retained, bounds) = match policy {
        OutlierPolicy::HighLow => (trim_high_low(samples), None),
        OutlierPolicy::Iqr => {
            let (kept, lower, upper) = fence_iqr(samples);
            (kept, Some((lower, upper)))
        }
    };

    let fell_back = retained.is_empty() && !samples.is_empty();
    if fell_back {
        retained = samples.to_vec();
    }

    OutlierAnalysis {
        all_samples: samples.to_vec(),
        retained,
        bounds,
        fell_back,
        policy,
    }
}

/// Filter outliers with `policy` and return the mean of what is left
pub fn filtered_mean(samples: &[f64], policy: OutlierPolicy) -> Result<f64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptySamples);
    }
    mean(&filter_outliers(samples, policy).retained)
}

/// Arithmetic mean
pub fn mean(samples: &[f64]) -> Result<f64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptySamples);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

fn trim_high_low(samples: &[f64]) -> Vec<f64> {
    let mut kept = samples.to_vec();
    if kept.len() < HIGH_LOW_MIN_SAMPLES {
        return kept;
    }

    if let Some(idx) = first_extreme(&kept, |candidate, best| candidate > best) {
        kept.remove(idx);
    }
    if let Some(idx) = first_extreme(&kept, |candidate, best| candidate < best) {
        kept.remove(idx);
    }
    kept
}

/// Index of the first sample that wins against every later one under `beats`
fn first_extreme(samples: &[f64], beats: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &sample) in samples.iter().enumerate() {
        match best {
            Some((_, value)) if !beats(sample, value) => {}
            _ => best = Some((i, sample)),
        }
    }
    best.map(|(i, _)| i)
}

fn fence_iqr(samples: &[f64]) -> (Vec<f64>, f64, f64) {
    let (q1, q3) = quartiles(samples);
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    let kept = samples
        .iter()
        .copied()
        .filter(|&s| s >= lower && s <= upper)
        .collect();
    (kept, lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_high_low_small_sets_untouched() {
        assert!(approx(filtered_mean(&[7.0], OutlierPolicy::HighLow).unwrap(), 7.0));
        assert!(approx(filtered_mean(&[2.0, 4.0], OutlierPolicy::HighLow).unwrap(), 3.0));
    }

    #[test]
    fn test_high_low_removes_one_extreme_each() {
        let analysis = filter_outliers(&[5.0, 1.0, 3.0, 9.0, 4.0], OutlierPolicy::HighLow);
        assert_eq!(analysis.retained, vec![5.0, 3.0, 4.0]);
        assert_eq!(analysis.removed_count(), 2);
        assert!(analysis.bounds.is_none());
    }

    #[test]
    fn test_high_low_removes_first_occurrence_only() {
        let analysis = filter_outliers(&[1.0, 9.0, 5.0, 9.0, 1.0], OutlierPolicy::HighLow);
        assert_eq!(analysis.retained, vec![5.0, 9.0, 1.0]);
    }

    #[test]
    fn test_high_low_fixed_trim_for_large_sets() {
        let samples: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let analysis = filter_outliers(&samples, OutlierPolicy::HighLow);
        assert_eq!(analysis.retained.len(), 98);
        assert!(approx(mean(&analysis.retained).unwrap(), 50.5));
    }

    #[test]
    fn test_iqr_drops_spike() {
        let samples = vec![10.0, 11.0, 10.5, 9.5, 10.2, 250.0];
        let analysis = filter_outliers(&samples, OutlierPolicy::Iqr);
        assert_eq!(analysis.removed_count(), 1);
        assert!(!analysis.retained.contains(&250.0));
        let (lower, upper) = analysis.bounds.unwrap();
        assert!(lower < 9.5 && upper < 250.0);
    }

    #[test]
    fn test_iqr_stays_within_sample_range() {
        let sets: Vec<Vec<f64>> = vec![
            vec![1.0],
            vec![3.0, 3.0, 3.0],
            vec![1.0, 100.0],
            vec![0.5, 0.7, 0.6, 40.0, 0.55, 0.65, 0.0],
            (0..50).map(|i| ((i * 37) % 11) as f64 * 1.3).collect(),
        ];
        for samples in sets {
            let avg = filtered_mean(&samples, OutlierPolicy::Iqr).unwrap();
            let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert!(avg >= min - 1e-9 && avg <= max + 1e-9, "{avg} outside [{min}, {max}]");
        }
    }

    #[test]
    fn test_iqr_identical_samples() {
        let analysis = filter_outliers(&[2.0, 2.0, 2.0, 2.0], OutlierPolicy::Iqr);
        assert_eq!(analysis.retained.len(), 4);
        assert!(!analysis.fell_back);
    }

    #[test]
    fn test_empty_samples_error() {
        assert_eq!(
            filtered_mean(&[], OutlierPolicy::Iqr),
            Err(StatsError::EmptySamples)
        );
        assert_eq!(
            filtered_mean(&[], OutlierPolicy::HighLow),
            Err(StatsError::EmptySamples)
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("iqr".parse::<OutlierPolicy>().unwrap(), OutlierPolicy::Iqr);
        assert_eq!("High-Low".parse::<OutlierPolicy>().unwrap(), OutlierPolicy::HighLow);
        assert!("median".parse::<OutlierPolicy>().is_err());
        assert_eq!(OutlierPolicy::default(), OutlierPolicy::HighLow);
        assert_eq!(OutlierPolicy::Iqr.to_string(), "iqr");
    }
}
