#![warn(missing_docs)]
//! # ParseBench
//!
//! Performance regression harness for parser test suites.
//!
//! ParseBench times each registered parser test many times, averages the
//! timings after dropping outliers and compares them against a stored snapshot:
//! - **Snapshots**: named baselines on disk holding results, run metadata and the grammar they were measured with
//! - **Recreate**: re-measure a snapshot's grammar under current conditions before comparing
//! - **Outlier filtering**: high-low trimming or 1.5·IQR fencing
//! - **Benchmark rounds**: repeat the whole run and aggregate the sums across rounds
//! - **Reports**: terminal tables or JSON
//!
//! ## Quick Start
//!
//! ```ignore
//! use parsebench::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.register_fn("ExprSuite", "test_nested", |m: &mut Measurer| {
//!         let tree = m.measure(|| my_parser::parse("((1 + 2) * 3)"));
//!         Ok(tree.map(|t| t.depth() == 3).unwrap_or(false))
//!     });
//!     parsebench::run(registry)
//! }
//! ```
//!
//! ## Test Types
//!
//! Anything implementing [`ParserTest`] can be registered with a factory that
//! builds a fresh instance per execution:
//!
//! ```ignore
//! struct FileSuite { source: String }
//!
//! impl ParserTest for FileSuite {
//!     fn execute(&mut self, m: &mut Measurer) -> Result<bool, TestError> {
//!         let ast = m.measure(|| my_parser::parse(&self.source));
//!         Ok(ast.is_ok())
//!     }
//! }
//!
//! registry.register(TestCaseDef::new(
//!     suite_name::<FileSuite>(),
//!     "test_large_file",
//!     Box::new(|| {
//!         let source = std::fs::read_to_string("fixtures/large.expr")?;
//!         Ok(Box::new(FileSuite { source }) as Box<dyn ParserTest>)
//!     }),
//! ));
//! ```

// Re-export core types
pub use parsebench_core::{
    Measurer, NoReclaim, ParserTest, ReclaimGuard, Reclaimer, Registry, TestCaseDef, TestError,
    TestFactory, TimingMode, suite_name,
};

// Re-export report types
pub use parsebench_report::{
    BenchmarkSums, CrossRoundSummary, MethodRef, OutputFormat, RoundReport, RunMetadata,
    RunOutcome, TestResult, generate_json_report, parse_json_report,
};

// Re-export snapshot types
pub use parsebench_snapshot::{Reconciler, Snapshot, SnapshotError, SnapshotRow, SnapshotStore};

// Re-export stats
pub use parsebench_stats::{OutlierPolicy, filtered_mean};

// Re-export the harness
pub use parsebench_cli::{
    Cli, ExecutionConfig, Orchestrator, OrchestratorConfig, ParseBenchConfig, ParserBuilder,
    ShellBuild, TestRunner, build_plan, run_with_cli,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Measurer, ParserTest, Registry, TestCaseDef, TestError, suite_name};
}

/// Run the ParseBench CLI harness.
///
/// Call this from your benchmark binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     parsebench::run(build_registry())
/// }
/// ```
pub use parsebench_cli::run;
