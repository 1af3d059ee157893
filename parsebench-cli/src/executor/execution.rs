//! Test Execution
//!
//! Runs one registered test case repeatedly and reduces its timings to a
//! filtered average.
//!
//! ## Data Flow
//!
//! ```text
//! TestCaseDef (from Registry)
//!        │
//!        ▼
//!   ExecutionConfig
//!        │
//!        ▼
//! ┌──────────────────┐
//! │   TestRunner     │  instantiate → execute(Measurer) → read timing slot
//! └────────┬─────────┘
//!          │
//!          ▼
//!  CaseOutcome (filtered average, verdict, total time, samples)
//! ```
//!
//! Each iteration builds a fresh test instance. Errors and panics are caught
//! per iteration, so one broken iteration never aborts the run.

use indicatif::{ProgressBar, ProgressStyle};
use parsebench_core::{Measurer, TestCaseDef, TimingMode, duration_ms};
use parsebench_stats::{OutlierPolicy, filtered_mean};
use std::time::Instant;

/// Configuration for test execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Timed runs per test
    pub runs_per_test: usize,
    /// Repeat the whole test per run instead of repeating the parse call
    pub run_multiple_times: bool,
    /// Outlier policy for averaging
    pub outlier_policy: OutlierPolicy,
    /// Draw a progress bar per test
    pub show_progress: bool,
}

impl ExecutionConfig {
    /// Test executions per case
    pub fn iterations(&self) -> usize {
        if self.run_multiple_times {
            self.runs_per_test.max(1)
        } else {
            1
        }
    }

    /// Timing mode the measurer runs in
    pub fn timing_mode(&self) -> TimingMode {
        TimingMode::for_runner(self.run_multiple_times, self.runs_per_test)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            runs_per_test: 50,
            run_multiple_times: true,
            outlier_policy: OutlierPolicy::default(),
            show_progress: true,
        }
    }
}

/// Result of running one test case
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    /// Outlier-filtered average in milliseconds, 0 without samples
    pub average_ms: f64,
    /// Verdict of the final iteration; `false` if it errored
    pub success: bool,
    /// Wall time of the last completed instantiate + execute, in milliseconds
    pub total_time_ms: f64,
    /// Raw samples fed into averaging
    pub samples: Vec<f64>,
}

/// Runs test cases through a shared [`Measurer`]
pub struct TestRunner {
    config: ExecutionConfig,
    measurer: Measurer,
}

impl TestRunner {
    /// Runner with a measurer in the configured timing mode
    pub fn new(config: ExecutionConfig) -> Self {
        let measurer = Measurer::new(config.timing_mode());
        Self { config, measurer }
    }

    /// Use a pre-built measurer, e.g. one wired to a runtime's collector
    pub fn with_measurer(config: ExecutionConfig, measurer: Measurer) -> Self {
        Self { config, measurer }
    }

    /// Execution settings
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Execute `case` for the configured number of iterations
    pub fn run_test_case(&mut self, case: &TestCaseDef) -> CaseOutcome {
        let iterations = self.config.iterations();
        let id = case.id();

        let pb = if self.config.show_progress {
            ProgressBar::new(iterations as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(id.clone());

        let mut samples = Vec::new();
        let mut success = false;
        let mut total_time_ms = 0.0;

        for _ in 0..iterations {
            success = false;
            self.measurer.begin_execution();
            let start = Instant::now();

            let measurer = &mut self.measurer;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let mut test = case.instantiate()?;
                test.execute(measurer)
            }));

            let elapsed_ms = duration_ms(start.elapsed());

            match result {
                Ok(Ok(verdict)) => {
                    success = verdict;
                    total_time_ms = elapsed_ms;
                    self.collect_samples(&id, &mut samples);
                }
                Ok(Err(e)) => {
                    tracing::error!("Error in executing {id}: {e}");
                }
                Err(panic) => {
                    let message = if let Some(s) = panic.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    tracing::error!("Test {id} panicked: {message}");
                }
            }

            pb.inc(1);
        }

        pb.finish_and_clear();

        let average_ms = match filtered_mean(&samples, self.config.outlier_policy) {
            Ok(avg) => avg,
            Err(e) => {
                tracing::warn!("{id}: no samples recorded ({e}), reporting 0 ms");
                0.0
            }
        };

        tracing::debug!(
            test = %id,
            samples = samples.len(),
            average_ms,
            success,
            "test case finished"
        );

        CaseOutcome {
            average_ms,
            success,
            total_time_ms,
            samples,
        }
    }

    fn collect_samples(&mut self, id: &str, samples: &mut Vec<f64>) {
        if !self.measurer.has_recorded() {
            tracing::warn!("{id} completed without a measurement; sample skipped");
            return;
        }
        match self.measurer.mode() {
            TimingMode::SingleShot => samples.push(self.measurer.last_ms()),
            TimingMode::Repeat { .. } => *samples = self.measurer.take_samples(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsebench_core::{Registry, TestError};
    use std::cell::Cell;
    use std::rc::Rc;

    fn config(runs: usize, run_multiple_times: bool) -> ExecutionConfig {
        ExecutionConfig {
            runs_per_test: runs,
            run_multiple_times,
            outlier_policy: OutlierPolicy::HighLow,
            show_progress: false,
        }
    }

    fn single(registry: &Registry) -> &TestCaseDef {
        registry.iter().next().unwrap()
    }

    #[test]
    fn test_multiple_times_collects_one_sample_per_iteration() {
        let mut registry = Registry::new();
        registry.register_fn("Suite", "test_parse", |m: &mut Measurer| {
            Ok(m.measure(|| "1+2".len()) == 3)
        });

        let mut runner = TestRunner::new(config(7, true));
        let outcome = runner.run_test_case(single(&registry));

        assert!(outcome.success);
        assert_eq!(outcome.samples.len(), 7);
        assert!(outcome.average_ms >= 0.0);
        assert!(outcome.total_time_ms >= 0.0);
    }

    #[test]
    fn test_repeat_mode_executes_once() {
        let executions = Rc::new(Cell::new(0));
        let counter = executions.clone();
        let mut registry = Registry::new();
        registry.register_fn("Suite", "test_parse", move |m: &mut Measurer| {
            counter.set(counter.get() + 1);
            m.measure(|| ());
            Ok(true)
        });

        let mut runner = TestRunner::new(config(9, false));
        let outcome = runner.run_test_case(single(&registry));

        assert_eq!(executions.get(), 1);
        assert_eq!(outcome.samples.len(), 9);
        assert!(outcome.success);
    }

    #[test]
    fn test_errors_skip_iteration() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut registry = Registry::new();
        registry.register_fn("Suite", "test_flaky", move |m: &mut Measurer| {
            counter.set(counter.get() + 1);
            if counter.get() % 2 == 0 {
                return Err(TestError::Execution("lexer error".into()));
            }
            m.measure(|| ());
            Ok(true)
        });

        let mut runner = TestRunner::new(config(5, true));
        let outcome = runner.run_test_case(single(&registry));

        assert_eq!(calls.get(), 5);
        assert_eq!(outcome.samples.len(), 3);
        assert!(outcome.success, "last iteration succeeded");
    }

    #[test]
    fn test_panics_are_caught() {
        let mut registry = Registry::new();
        registry.register_fn("Suite", "test_panics", |_m: &mut Measurer| -> Result<bool, TestError> {
            panic!("grammar ambiguity")
        });

        let mut runner = TestRunner::new(config(3, true));
        let outcome = runner.run_test_case(single(&registry));

        assert!(!outcome.success);
        assert!(outcome.samples.is_empty());
        assert_eq!(outcome.average_ms, 0.0);
        assert_eq!(outcome.total_time_ms, 0.0);
    }

    #[test]
    fn test_failing_assertion_still_measured() {
        let mut registry = Registry::new();
        registry.register_fn("Suite", "test_wrong_tree", |m: &mut Measurer| {
            m.measure(|| ());
            Ok(false)
        });

        let mut runner = TestRunner::new(config(4, true));
        let outcome = runner.run_test_case(single(&registry));

        assert!(!outcome.success);
        assert_eq!(outcome.samples.len(), 4);
    }

    #[test]
    fn test_unmeasured_test_yields_no_samples() {
        let mut registry = Registry::new();
        registry.register_fn("Suite", "test_no_measure", |_m: &mut Measurer| Ok(true));

        let mut runner = TestRunner::new(config(3, true));
        let outcome = runner.run_test_case(single(&registry));

        assert!(outcome.success);
        assert!(outcome.samples.is_empty());
        assert_eq!(outcome.average_ms, 0.0);
    }

    #[test]
    fn test_iterations() {
        assert_eq!(config(50, true).iterations(), 50);
        assert_eq!(config(50, false).iterations(), 1);
        assert_eq!(config(0, true).iterations(), 1);
    }
}
