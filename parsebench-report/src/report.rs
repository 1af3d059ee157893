//! Report Data Structures

use chrono::{DateTime, Utc};
use parsebench_stats::OutlierPolicy;
use serde::{Deserialize, Serialize};

/// `(class, method)` reference, serialised as a two-element array
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodRef(pub String, pub String);

impl MethodRef {
    /// Build from a class and a method name
    pub fn new(class_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self(class_name.into(), method.into())
    }

    /// Class (suite) name
    pub fn class_name(&self) -> &str {
        &self.0
    }

    /// Method name
    pub fn method(&self) -> &str {
        &self.1
    }
}

impl std::fmt::Display for MethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.0, self.1)
    }
}

/// One measured test method.
///
/// Identity is `(method, class_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub method: String,
    pub average_ms: f64,
    pub difference_ms: f64,
    pub success: bool,
    pub percent: f64,
    pub class_name: String,
    pub total_parsing_time_ms: f64,
}

impl TestResult {
    /// Whether this result has the given identity
    pub fn is(&self, method: &str, class_name: &str) -> bool {
        self.method == method && self.class_name == class_name
    }

    /// `(class, method)` reference for list output
    pub fn method_ref(&self) -> MethodRef {
        MethodRef::new(&self.class_name, &self.method)
    }

    /// Snapshot table row, in column order
    pub fn to_record(&self) -> [String; 7] {
        [
            self.method.clone(),
            self.average_ms.to_string(),
            self.difference_ms.to_string(),
            if self.success { "True" } else { "False" }.to_string(),
            self.percent.to_string(),
            self.class_name.clone(),
            self.total_parsing_time_ms.to_string(),
        ]
    }
}

/// Summary of one run, persisted as `metadata.json`.
///
/// Key names are part of the snapshot format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub sum_avg: f64,
    pub sum_total_parsing_time: f64,
    pub failed_tests: Vec<MethodRef>,
    pub amount_of_tests: usize,
    pub list_of_tested_methods: Vec<String>,
    #[serde(rename = "RUN_TESTS_MULTIPLE_TIMES")]
    pub run_tests_multiple_times: bool,
    #[serde(rename = "NUMBER_OF_RUNS_PER_TEST")]
    pub number_of_runs_per_test: usize,
}

/// Paired sums over methods present in both the current run and the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSums {
    pub current_sum_ms: f64,
    pub snapshot_sum_ms: f64,
    pub methods: Vec<MethodRef>,
}

impl BenchmarkSums {
    /// Current minus snapshot
    pub fn improvement_ms(&self) -> f64 {
        self.current_sum_ms - self.snapshot_sum_ms
    }

    /// Current relative to snapshot, minus 100 (0 without a snapshot sum)
    pub fn improvement_percent(&self) -> f64 {
        improvement_percent(self.current_sum_ms, self.snapshot_sum_ms)
    }
}

/// `100 / snapshot * current - 100`, or 0 when `snapshot` is 0
pub fn improvement_percent(current: f64, snapshot: f64) -> f64 {
    if snapshot == 0.0 {
        0.0
    } else {
        100.0 / snapshot * current - 100.0
    }
}

/// Everything produced by one benchmark round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    /// Zero-based round index
    pub round: usize,
    pub results: Vec<TestResult>,
    pub metadata: RunMetadata,
    pub benchmark: BenchmarkSums,
    /// Methods measured now but absent from the snapshot
    pub missing_in_snapshot: Vec<MethodRef>,
    /// Methods in the snapshot but not measured now
    pub missing_in_current: Vec<MethodRef>,
    /// Name the round was saved under, if it was persisted
    pub saved_snapshot: Option<String>,
}

impl RoundReport {
    /// Whether every measured test passed
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    /// Whether the snapshot and the current run cover different methods
    pub fn is_desynchronized(&self) -> bool {
        !self.missing_in_snapshot.is_empty() || !self.missing_in_current.is_empty()
    }
}

/// Per-round entry of the cross-round summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: usize,
    pub sum_avg: f64,
    pub snapshot_benchmark_sum: f64,
}

/// Aggregate over all rounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossRoundSummary {
    pub rounds: Vec<RoundSummary>,
    /// Outlier-filtered mean of per-round `sum_avg`
    pub current_average_ms: f64,
    /// Snapshot benchmark sum of the first round
    pub snapshot_average_ms: f64,
}

impl CrossRoundSummary {
    /// Current minus snapshot
    pub fn improvement_ms(&self) -> f64 {
        self.current_average_ms - self.snapshot_average_ms
    }

    /// Current relative to snapshot, minus 100
    pub fn improvement_percent(&self) -> f64 {
        improvement_percent(self.current_average_ms, self.snapshot_average_ms)
    }
}

/// Run-level metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Snapshot the run was compared against
    pub snapshot: String,
    /// Whether the baseline was re-measured with the snapshot's grammar
    pub recreated: bool,
    pub outlier_policy: OutlierPolicy,
    pub runs_per_test: usize,
    pub run_tests_multiple_times: bool,
}

/// Complete output of a harness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub meta: RunMeta,
    pub rounds: Vec<RoundReport>,
    /// Present only when more than one round ran
    pub summary: Option<CrossRoundSummary>,
}

impl RunOutcome {
    /// Whether any round had a failing test
    pub fn has_failures(&self) -> bool {
        self.rounds.iter().any(|r| !r.all_passed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(method: &str, avg: f64, success: bool) -> TestResult {
        TestResult {
            method: method.to_string(),
            average_ms: avg,
            difference_ms: 0.5,
            success,
            percent: 104.0,
            class_name: "suite.Expr".to_string(),
            total_parsing_time_ms: 12.25,
        }
    }

    #[test]
    fn test_record_column_order() {
        let record = result("test_add", 3.5, true).to_record();
        assert_eq!(
            record,
            ["test_add", "3.5", "0.5", "True", "104", "suite.Expr", "12.25"]
                .map(String::from)
        );
    }

    #[test]
    fn test_metadata_keys() {
        let metadata = RunMetadata {
            sum_avg: 1.5,
            sum_total_parsing_time: 3.0,
            failed_tests: vec![MethodRef::new("suite.Expr", "test_mul")],
            amount_of_tests: 2,
            list_of_tested_methods: vec!["test_add".into(), "test_mul".into()],
            run_tests_multiple_times: true,
            number_of_runs_per_test: 50,
        };
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["failed_tests"], serde_json::json!([["suite.Expr", "test_mul"]]));
        assert_eq!(json["RUN_TESTS_MULTIPLE_TIMES"], serde_json::json!(true));
        assert_eq!(json["NUMBER_OF_RUNS_PER_TEST"], serde_json::json!(50));
        assert_eq!(json["amount_of_tests"], serde_json::json!(2));
    }

    #[test]
    fn test_improvement_percent() {
        assert!((improvement_percent(110.0, 100.0) - 10.0).abs() < 1e-9);
        assert!((improvement_percent(90.0, 100.0) + 10.0).abs() < 1e-9);
        assert_eq!(improvement_percent(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_round_flags() {
        let report = RoundReport {
            round: 0,
            results: vec![result("a", 1.0, true), result("b", 2.0, false)],
            metadata: RunMetadata {
                sum_avg: 3.0,
                sum_total_parsing_time: 0.0,
                failed_tests: vec![],
                amount_of_tests: 2,
                list_of_tested_methods: vec![],
                run_tests_multiple_times: true,
                number_of_runs_per_test: 1,
            },
            benchmark: BenchmarkSums::default(),
            missing_in_snapshot: vec![],
            missing_in_current: vec![MethodRef::new("suite.Expr", "c")],
            saved_snapshot: None,
        };
        assert!(!report.all_passed());
        assert!(report.is_desynchronized());
    }
}
