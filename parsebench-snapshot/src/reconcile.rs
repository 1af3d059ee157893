//! Reconciliation Engine
//!
//! Matches current results against a snapshot by `(method, class)` identity.

use crate::{Snapshot, SnapshotRow};
use parsebench_report::{BenchmarkSums, MethodRef, TestResult};
use parsebench_stats::round_to;

/// Read-only view of a snapshot used to score one round
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    snapshot: &'a Snapshot,
    tolerance_ms: f64,
    decimals: u32,
}

impl<'a> Reconciler<'a> {
    /// `tolerance_ms` clamps negligible differences to zero; results are
    /// rounded to `decimals` places.
    pub fn new(snapshot: &'a Snapshot, tolerance_ms: f64, decimals: u32) -> Self {
        Self {
            snapshot,
            tolerance_ms,
            decimals,
        }
    }

    /// Snapshot being compared against
    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    /// Snapshot row for `(method, class_name)`
    pub fn get_result(&self, method: &str, class_name: &str) -> Option<&'a SnapshotRow> {
        self.snapshot.get_result(method, class_name)
    }

    /// Whether the snapshot has a row for `(method, class_name)`; misses are logged
    pub fn method_exists(&self, method: &str, class_name: &str) -> bool {
        let found = self.get_result(method, class_name).is_some();
        if !found {
            tracing::info!(
                snapshot = %self.snapshot.name,
                "method {method} of {class_name} doesn't exist in snapshot"
            );
        }
        found
    }

    fn baseline_ms(&self, method: &str, class_name: &str) -> f64 {
        match self.get_result(method, class_name) {
            Some(row) => row_average(row),
            None => {
                tracing::info!("no baseline for {class_name}::{method}, comparing against 0");
                0.0
            }
        }
    }

    /// `new_ms - baseline`, rounded.
    ///
    /// Returns 0 when the difference is within tolerance and the baseline
    /// exceeds 1 ms.
    pub fn check_difference(&self, method: &str, class_name: &str, new_ms: f64) -> f64 {
        let baseline = self.baseline_ms(method, class_name);
        let diff = new_ms - baseline;
        if diff.abs() < self.tolerance_ms && baseline > 1.0 {
            0.0
        } else {
            round_to(diff, self.decimals)
        }
    }

    /// `new_ms` as a percentage of the baseline, rounded.
    ///
    /// A zero baseline yields 100, meaning "new".
    pub fn check_percent(&self, method: &str, class_name: &str, new_ms: f64) -> f64 {
        let baseline = self.baseline_ms(method, class_name);
        if baseline == 0.0 {
            100.0
        } else {
            round_to(100.0 / baseline * new_ms, self.decimals)
        }
    }

    /// Paired sums over methods present in both `current` and the snapshot
    pub fn benchmark(&self, current: &[TestResult]) -> BenchmarkSums {
        let mut sums = BenchmarkSums::default();
        for result in current {
            if let Some(row) = self.get_result(&result.method, &result.class_name) {
                sums.current_sum_ms += result.average_ms;
                sums.snapshot_sum_ms += row_average(row);
                sums.methods.push(result.method_ref());
            }
        }
        sums
    }

    /// Snapshot rows with no counterpart in `current`, in snapshot order
    pub fn methods_missing_from(&self, current: &[TestResult]) -> Vec<MethodRef> {
        self.snapshot
            .rows
            .iter()
            .filter(|row| !current.iter().any(|r| r.is(row.method(), row.class_name())))
            .map(|row| MethodRef::new(row.class_name(), row.method()))
            .collect()
    }
}

fn row_average(row: &SnapshotRow) -> f64 {
    row.average_ms().unwrap_or_else(|| {
        tracing::warn!(
            "unreadable average {:?} for {}::{}, using 0",
            row.fields().get(crate::AVERAGE_COLUMN),
            row.class_name(),
            row.method()
        );
        0.0
    })
}
