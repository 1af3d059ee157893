//! Quartile Estimation
//!
//! Quartiles are estimated on the sorted sample set using linear interpolation
//! between the two nearest ranks, with rank = (n - 1) * q.

use std::cmp::Ordering;

/// Compute a quartile (0.0..=1.0) of `data`, sorting the slice in place.
///
/// Returns 0.0 for an empty slice.
///
/// # Examples
///
/// ```
/// # use parsebench_stats::compute_quartile;
/// let mut samples = vec![4.0, 1.0, 3.0, 2.0];
/// assert_eq!(compute_quartile(&mut samples, 0.25), 1.75);
/// assert_eq!(samples, vec![1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn compute_quartile(data: &mut [f64], quartile: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = (data.len() - 1) as f64 * quartile.clamp(0.0, 1.0);
    let lower_idx = rank.floor() as usize;

    if rank.fract() == 0.0 {
        return data[lower_idx];
    }

    let upper_idx = (lower_idx + 1).min(data.len() - 1);
    let fraction = rank - lower_idx as f64;

    data[lower_idx] + fraction * (data[upper_idx] - data[lower_idx])
}

/// Compute (Q1, Q3) without disturbing the caller's ordering
pub fn quartiles(samples: &[f64]) -> (f64, f64) {
    let mut sorted = samples.to_vec();
    let q1 = compute_quartile(&mut sorted, 0.25);
    let q3 = compute_quartile(&mut sorted, 0.75);
    (q1, q3)
}
