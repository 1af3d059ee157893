//! Measurement Orchestrator
//!
//! Drives a full harness run:
//!
//! ```text
//! baseline  ── load snapshot ─────────────────────────┐
//!           └─ recreate: swap grammar → build →       │
//!              silent round → restore grammar ────────┤
//!                                                     ▼
//! build parser (optional) → round 0..N: measure → reconcile → save? → report
//!                                                     │
//!                                                     ▼
//!                                   cross-round summary (N > 1)
//! ```

use super::build::ParserBuilder;
use super::execution::{ExecutionConfig, TestRunner};
use crate::config::{DEFAULT_RESULT_HEADER, ParseBenchConfig};
use crate::planner::ExecutionPlan;
use chrono::Utc;
use parsebench_report::{
    CrossRoundSummary, MethodRef, RoundReport, RoundSummary, RunMeta, RunMetadata, RunOutcome,
    TestResult,
};
use parsebench_snapshot::{
    CLASS_COLUMN, METHOD_COLUMN, Reconciler, Snapshot, SnapshotError, SnapshotStore,
    default_snapshot_name,
};
use parsebench_stats::filtered_mean;
use std::path::PathBuf;

/// Settings for a harness run
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Per-test execution settings
    pub execution: ExecutionConfig,
    /// Column labels of the results table
    pub header: Vec<String>,
    /// Differences below this are reported as 0
    pub diff_tolerance_ms: f64,
    /// Decimal places for differences and percentages
    pub decimals: u32,
    /// Record per-test total parsing time
    pub record_total_parsing_time: bool,
    /// Snapshot to compare against; empty measures without a baseline
    pub use_snapshot: String,
    /// Re-measure the baseline with the snapshot's grammar
    pub recreate: bool,
    /// Save each round as a snapshot
    pub make_snapshot: bool,
    /// Base name of saved snapshots; empty means timestamped
    pub snapshot_name: String,
    /// Rebuild the parser before the rounds
    pub build_parser: bool,
    /// Sequential measurement rounds
    pub rounds: usize,
    /// Snapshots root
    pub snapshot_root: PathBuf,
    /// Live grammar source
    pub grammar_path: PathBuf,
    /// Grammar backup location during recreate
    pub temp_grammar_path: PathBuf,
}

impl OrchestratorConfig {
    /// Settings taken from a loaded configuration file
    pub fn from_config(config: &ParseBenchConfig, show_progress: bool) -> Self {
        Self {
            execution: ExecutionConfig {
                runs_per_test: config.tests.runs_per_test,
                run_multiple_times: config.tests.run_multiple_times,
                outlier_policy: config.outliers.detection,
                show_progress,
            },
            header: config.output.result_header.clone(),
            diff_tolerance_ms: config.tests.diff_tolerance_ms,
            decimals: config.output.decimals,
            record_total_parsing_time: config.records_total_parsing_time(),
            use_snapshot: config.snapshot.use_snapshot.clone(),
            recreate: config.snapshot.recreate,
            make_snapshot: config.snapshot.make,
            snapshot_name: config.snapshot.name.clone(),
            build_parser: config.parser.build,
            rounds: config.benchmark.rounds,
            snapshot_root: PathBuf::from(&config.snapshot.directory),
            grammar_path: PathBuf::from(&config.parser.grammar_path),
            temp_grammar_path: PathBuf::from(&config.parser.temp_grammar_path),
        }
    }

    fn header_label(&self, column: usize) -> &str {
        self.header
            .get(column)
            .map(String::as_str)
            .unwrap_or(DEFAULT_RESULT_HEADER[column])
    }
}

/// Owns the state of one harness run
pub struct Orchestrator<'a> {
    config: OrchestratorConfig,
    plan: ExecutionPlan<'a>,
    store: SnapshotStore,
    runner: TestRunner,
    builder: Option<Box<dyn ParserBuilder>>,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator over `plan` with a store rooted at the configured paths
    pub fn new(config: OrchestratorConfig, plan: ExecutionPlan<'a>) -> Self {
        let store = SnapshotStore::new(
            &config.snapshot_root,
            &config.grammar_path,
            &config.temp_grammar_path,
        );
        let runner = TestRunner::new(config.execution.clone());
        Self {
            config,
            plan,
            store,
            runner,
            builder: None,
        }
    }

    /// Attach the parser build used for `build_parser` and recreate runs
    pub fn with_builder(mut self, builder: Box<dyn ParserBuilder>) -> Self {
        self.builder = Some(builder);
        self
    }

    /// Replace the test runner, e.g. to use a custom measurer
    pub fn with_runner(mut self, runner: TestRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Snapshot store used for loading and saving
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run all rounds
    pub fn run(&mut self) -> Result<RunOutcome, SnapshotError> {
        self.run_with(|_| {})
    }

    /// Run all rounds, handing each finished round to `on_round`.
    ///
    /// A missing snapshot aborts the run before any test executes.
    pub fn run_with(
        &mut self,
        mut on_round: impl FnMut(&RoundReport),
    ) -> Result<RunOutcome, SnapshotError> {
        let baseline = if self.config.recreate {
            self.recreate_baseline()?
        } else if self.config.use_snapshot.is_empty() {
            tracing::info!("no snapshot selected, measuring without a baseline");
            Snapshot::empty("")
        } else {
            tracing::info!(snapshot = %self.config.use_snapshot, "loading snapshot");
            self.store.load(&self.config.use_snapshot)?
        };

        if self.config.build_parser {
            self.trigger_build();
        }

        let base_name = if self.config.snapshot_name.is_empty() {
            default_snapshot_name()
        } else {
            self.config.snapshot_name.clone()
        };

        let mut rounds = Vec::with_capacity(self.config.rounds);
        for round in 0..self.config.rounds {
            tracing::info!("measure and benchmark run {}", round + 1);
            let mut report = self.measure_round(round, &baseline);

            if self.config.make_snapshot {
                let suffix = if round == 0 {
                    String::new()
                } else {
                    round.to_string()
                };
                let saved = self.store.save(
                    &self.config.header,
                    &report.results,
                    &report.metadata,
                    &format!("{base_name}{suffix}"),
                )?;
                report.saved_snapshot = Some(saved);
            }

            on_round(&report);
            rounds.push(report);
        }

        let summary = self.summarize(&rounds);

        Ok(RunOutcome {
            meta: RunMeta {
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: Utc::now(),
                snapshot: self.config.use_snapshot.clone(),
                recreated: self.config.recreate,
                outlier_policy: self.config.execution.outlier_policy,
                runs_per_test: self.config.execution.runs_per_test,
                run_tests_multiple_times: self.config.execution.run_multiple_times,
            },
            rounds,
            summary,
        })
    }

    /// Measure the snapshot's grammar under current conditions and use the
    /// results as the baseline
    fn recreate_baseline(&mut self) -> Result<Snapshot, SnapshotError> {
        tracing::info!(
            snapshot = %self.config.use_snapshot,
            "recreate measurement with old grammar from snapshot"
        );

        let store = self.store.clone();
        let swap = store.recreate(&self.config.use_snapshot)?;
        self.trigger_build();

        let empty = Snapshot::empty(&self.config.use_snapshot);
        let round = self.measure_round(0, &empty);

        swap.close(&self.config.header, &round.results, round.metadata)
    }

    fn trigger_build(&mut self) {
        match self.builder.as_mut() {
            Some(builder) => builder.build(),
            None => tracing::warn!("parser build requested but no build is configured"),
        }
    }

    /// One pass over the plan, reconciled against `baseline`
    pub fn measure_round(&mut self, round: usize, baseline: &Snapshot) -> RoundReport {
        let reconciler = Reconciler::new(
            baseline,
            self.config.diff_tolerance_ms,
            self.config.decimals,
        );

        let mut results: Vec<TestResult> = Vec::with_capacity(self.plan.len());
        let mut missing_in_snapshot = Vec::new();
        let mut failed_tests = Vec::new();

        for case in &self.plan.cases {
            tracing::debug!("> {}", case.id());

            if !reconciler.method_exists(&case.method, &case.suite) {
                missing_in_snapshot.push(MethodRef::new(&case.suite, &case.method));
            }

            let outcome = self.runner.run_test_case(case);

            let total_parsing_time_ms = if self.config.record_total_parsing_time {
                outcome.total_time_ms
            } else {
                0.0
            };

            if !outcome.success {
                failed_tests.push(MethodRef::new(&case.suite, &case.method));
            }

            results.push(TestResult {
                method: case.method.clone(),
                average_ms: outcome.average_ms,
                difference_ms: reconciler.check_difference(
                    &case.method,
                    &case.suite,
                    outcome.average_ms,
                ),
                success: outcome.success,
                percent: reconciler.check_percent(&case.method, &case.suite, outcome.average_ms),
                class_name: case.suite.clone(),
                total_parsing_time_ms,
            });
        }

        let mut missing_in_current = reconciler.methods_missing_from(&results);

        let sum_avg = results.iter().map(|r| r.average_ms).sum();
        let sum_total_parsing_time = results.iter().map(|r| r.total_parsing_time_ms).sum();

        let header_method = self.config.header_label(METHOD_COLUMN);
        let header_class = self.config.header_label(CLASS_COLUMN);
        let is_header = |m: &MethodRef| m.method() == header_method && m.class_name() == header_class;
        missing_in_current.retain(|m| !is_header(m));
        missing_in_snapshot.retain(|m| !is_header(m));

        let benchmark = reconciler.benchmark(&results);

        let metadata = RunMetadata {
            sum_avg,
            sum_total_parsing_time,
            failed_tests,
            amount_of_tests: results.len(),
            list_of_tested_methods: results.iter().map(|r| r.method.clone()).collect(),
            run_tests_multiple_times: self.config.execution.run_multiple_times,
            number_of_runs_per_test: self.config.execution.runs_per_test,
        };

        RoundReport {
            round,
            results,
            metadata,
            benchmark,
            missing_in_snapshot,
            missing_in_current,
            saved_snapshot: None,
        }
    }

    fn summarize(&self, rounds: &[RoundReport]) -> Option<CrossRoundSummary> {
        if rounds.len() <= 1 {
            return None;
        }

        let sums: Vec<f64> = rounds.iter().map(|r| r.metadata.sum_avg).collect();
        let current_average_ms =
            filtered_mean(&sums, self.config.execution.outlier_policy).unwrap_or(0.0);

        Some(CrossRoundSummary {
            rounds: rounds
                .iter()
                .map(|r| RoundSummary {
                    round: r.round,
                    sum_avg: r.metadata.sum_avg,
                    snapshot_benchmark_sum: r.benchmark.snapshot_sum_ms,
                })
                .collect(),
            current_average_ms,
            snapshot_average_ms: rounds[0].benchmark.snapshot_sum_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::build_plan;
    use parsebench_core::{Measurer, Registry};
    use parsebench_snapshot::SnapshotRow;
    use parsebench_stats::OutlierPolicy;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> OrchestratorConfig {
        let mut file_config = ParseBenchConfig::default();
        file_config.tests.runs_per_test = 3;
        file_config.snapshot.directory = tmp.path().join("snapshots").display().to_string();
        file_config.parser.grammar_path = tmp.path().join("Grammar.g4").display().to_string();
        file_config.parser.temp_grammar_path =
            tmp.path().join("TestGrammar.txt").display().to_string();
        OrchestratorConfig::from_config(&file_config, false)
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_fn("Expr", "test_add", |m: &mut Measurer| {
                m.measure(|| ());
                Ok(true)
            })
            .register_fn("Expr", "test_mul", |m: &mut Measurer| {
                m.measure(|| ());
                Ok(false)
            });
        registry
    }

    fn baseline(rows: &[(&str, &str, &str)]) -> Snapshot {
        Snapshot {
            name: "init".into(),
            header: vec![],
            rows: rows
                .iter()
                .map(|(method, avg, class_name)| {
                    SnapshotRow(
                        [*method, *avg, "0", "True", "100", *class_name, "0"]
                            .map(String::from)
                            .to_vec(),
                    )
                })
                .collect(),
            metadata: None,
        }
    }

    struct CountingBuild(Rc<Cell<usize>>);

    impl ParserBuilder for CountingBuild {
        fn build(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_round_reconciles_against_baseline() {
        let tmp = TempDir::new().unwrap();
        let registry = registry();
        let mut orchestrator = Orchestrator::new(config(&tmp), build_plan(&registry, None));

        let snapshot = baseline(&[("test_add", "5", "Expr"), ("test_div", "7", "Expr")]);
        let report = orchestrator.measure_round(0, &snapshot);

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.metadata.amount_of_tests, 2);
        assert_eq!(report.metadata.failed_tests, vec![MethodRef::new("Expr", "test_mul")]);
        assert_eq!(report.missing_in_snapshot, vec![MethodRef::new("Expr", "test_mul")]);
        assert_eq!(report.missing_in_current, vec![MethodRef::new("Expr", "test_div")]);
        assert_eq!(report.benchmark.methods, vec![MethodRef::new("Expr", "test_add")]);
        assert_eq!(report.benchmark.snapshot_sum_ms, 5.0);

        let mul = report.results.iter().find(|r| r.method == "test_mul").unwrap();
        assert_eq!(mul.percent, 100.0);
        assert!(!mul.success);
    }

    #[test]
    fn test_header_row_never_reported_missing() {
        let tmp = TempDir::new().unwrap();
        let registry = registry();
        let mut orchestrator = Orchestrator::new(config(&tmp), build_plan(&registry, None));

        let snapshot = baseline(&[
            ("Test Name", "Avg. Parsing Time [ms]", "Test Class"),
            ("test_add", "1", "Expr"),
            ("test_mul", "1", "Expr"),
        ]);
        let report = orchestrator.measure_round(0, &snapshot);

        assert!(report.missing_in_current.is_empty());
        assert!(!report.is_desynchronized());
    }

    #[test]
    fn test_total_parsing_time_only_in_multiple_run_mode() {
        let tmp = TempDir::new().unwrap();
        let registry = registry();
        let mut cfg = config(&tmp);
        cfg.record_total_parsing_time = false;
        let mut orchestrator = Orchestrator::new(cfg, build_plan(&registry, None));

        let report = orchestrator.measure_round(0, &Snapshot::empty("init"));
        assert!(report.results.iter().all(|r| r.total_parsing_time_ms == 0.0));
        assert_eq!(report.metadata.sum_total_parsing_time, 0.0);
    }

    #[test]
    fn test_missing_snapshot_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        let mut registry = Registry::new();
        registry.register_fn("Expr", "test_add", move |_m: &mut Measurer| {
            flag.set(true);
            Ok(true)
        });

        let mut orchestrator = Orchestrator::new(config(&tmp), build_plan(&registry, None));
        let err = orchestrator.run().unwrap_err();

        assert!(matches!(err, SnapshotError::NotFound { .. }));
        assert!(!ran.get(), "no test runs without a baseline");
    }

    #[test]
    fn test_rounds_save_with_suffix_and_summarize() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Grammar.g4"), "grammar Expr;").unwrap();
        let registry = registry();

        let mut cfg = config(&tmp);
        cfg.make_snapshot = true;
        cfg.use_snapshot = String::new();
        cfg.snapshot_name = "init".into();
        cfg.rounds = 1;
        Orchestrator::new(cfg.clone(), build_plan(&registry, None))
            .run()
            .unwrap();

        cfg.use_snapshot = "init".into();
        cfg.snapshot_name = "next".into();
        cfg.rounds = 3;
        cfg.execution.outlier_policy = OutlierPolicy::HighLow;
        let mut seen = Vec::new();
        let outcome = Orchestrator::new(cfg, build_plan(&registry, None))
            .run_with(|r| seen.push(r.round))
            .unwrap();

        assert_eq!(seen, vec![0, 1, 2]);
        let saved: Vec<_> = outcome
            .rounds
            .iter()
            .map(|r| r.saved_snapshot.clone().unwrap())
            .collect();
        assert_eq!(saved, vec!["next", "next1", "next2"]);

        let summary = outcome.summary.expect("summary for multiple rounds");
        assert_eq!(summary.rounds.len(), 3);
        assert_eq!(
            summary.snapshot_average_ms,
            outcome.rounds[0].benchmark.snapshot_sum_ms
        );
    }

    #[test]
    fn test_single_round_has_no_summary() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Grammar.g4"), "grammar Expr;").unwrap();
        let registry = registry();

        let mut cfg = config(&tmp);
        cfg.make_snapshot = true;
        cfg.use_snapshot = String::new();
        let outcome = Orchestrator::new(cfg, build_plan(&registry, None))
            .run()
            .unwrap();

        assert!(outcome.summary.is_none());
        assert_eq!(outcome.rounds[0].missing_in_snapshot.len(), 2);
        let saved = outcome.rounds[0].saved_snapshot.as_deref().unwrap();
        assert!(saved.starts_with("snapshot-"));
    }

    #[test]
    fn test_recreate_builds_twice_and_restores_grammar() {
        let tmp = TempDir::new().unwrap();
        let grammar = tmp.path().join("Grammar.g4");
        std::fs::write(&grammar, "grammar Old;").unwrap();
        let registry = registry();

        let mut cfg = config(&tmp);
        cfg.make_snapshot = true;
        cfg.use_snapshot = String::new();
        cfg.snapshot_name = "init".into();
        Orchestrator::new(cfg.clone(), build_plan(&registry, None))
            .run()
            .unwrap();

        std::fs::write(&grammar, "grammar New;").unwrap();
        cfg.use_snapshot = "init".into();

        let builds = Rc::new(Cell::new(0));
        cfg.make_snapshot = false;
        cfg.recreate = true;
        cfg.build_parser = true;
        let outcome = Orchestrator::new(cfg, build_plan(&registry, None))
            .with_builder(Box::new(CountingBuild(builds.clone())))
            .run()
            .unwrap();

        assert_eq!(builds.get(), 2);
        assert_eq!(std::fs::read_to_string(&grammar).unwrap(), "grammar New;");
        assert!(outcome.meta.recreated);
        assert_eq!(outcome.rounds.len(), 1);
        assert!(!outcome.rounds[0].is_desynchronized());
        assert_eq!(outcome.rounds[0].benchmark.methods.len(), 2);
    }
}
