//! Measurer - The Repeated Timer
//!
//! Tests wrap the code under measurement (usually the parse call) in
//! [`Measurer::measure`]. Depending on the timing mode the closure is run once
//! with memory reclamation suspended, or N times back-to-back.
//!
//! The measurement is not returned to the test. It lands in one of two slots
//! on the measurer, and the runner reads whichever slot matches the mode:
//! - [`TimingMode::SingleShot`] fills [`Measurer::last_ms`]
//! - [`TimingMode::Repeat`] fills [`Measurer::last_samples`]

use crate::measure::Timer;
use crate::reclaim::{NoReclaim, ReclaimGuard, Reclaimer};

/// How a single `measure` call times its closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingMode {
    /// One invocation with reclamation suspended; the runner repeats the test
    SingleShot,
    /// `runs` timed invocations inside one test execution
    Repeat {
        /// Number of timed invocations
        runs: usize,
    },
}

impl TimingMode {
    /// Mode matching the runner configuration.
    ///
    /// When the runner repeats each test, every test execution times a single
    /// invocation. Otherwise the test executes once and times `runs` invocations.
    pub fn for_runner(run_multiple_times: bool, runs: usize) -> Self {
        if run_multiple_times {
            TimingMode::SingleShot
        } else {
            TimingMode::Repeat { runs: runs.max(1) }
        }
    }
}

/// Timing context handed to every test execution
pub struct Measurer {
    mode: TimingMode,
    reclaimer: Box<dyn Reclaimer>,

    // === Measurement slots ===
    last_ms: f64,
    last_samples: Vec<f64>,
    recorded: bool,

    // === State ===
    total_invocations: u64,
}

impl Measurer {
    /// Create a measurer for a runtime without a collector
    pub fn new(mode: TimingMode) -> Self {
        Self::with_reclaimer(mode, Box::new(NoReclaim))
    }

    /// Create a measurer that suspends `reclaimer` during single-shot timing
    pub fn with_reclaimer(mode: TimingMode, reclaimer: Box<dyn Reclaimer>) -> Self {
        Self {
            mode,
            reclaimer,
            last_ms: 0.0,
            last_samples: Vec::new(),
            recorded: false,
            total_invocations: 0,
        }
    }

    /// Time `f` according to the current mode and return its output.
    ///
    /// In repeat mode the closure runs one extra, untimed time after the timed
    /// runs; its output is the one returned.
    #[inline]
    pub fn measure<T, F>(&mut self, mut f: F) -> T
    where
        F: FnMut() -> T,
    {
        match self.mode {
            TimingMode::SingleShot => {
                let guard = ReclaimGuard::suspend(self.reclaimer.as_mut());
                let timer = Timer::start();
                let output = std::hint::black_box(f());
                let elapsed = timer.stop_ms();
                drop(guard);

                self.total_invocations += 1;
                self.last_ms = elapsed;
                self.recorded = true;
                output
            }
            TimingMode::Repeat { runs } => {
                let mut samples = Vec::with_capacity(runs);
                for _ in 0..runs {
                    let timer = Timer::start();
                    let _ = std::hint::black_box(f());
                    samples.push(timer.stop_ms());
                }
                self.last_samples = samples;
                self.recorded = true;

                let output = f();
                self.total_invocations += runs as u64 + 1;
                output
            }
        }
    }

    /// Clear the "recorded" marker before a new test execution
    pub fn begin_execution(&mut self) {
        self.recorded = false;
    }

    /// Whether `measure` ran since the last [`Measurer::begin_execution`]
    pub fn has_recorded(&self) -> bool {
        self.recorded
    }

    /// Single-shot slot: elapsed milliseconds of the last measurement
    pub fn last_ms(&self) -> f64 {
        self.last_ms
    }

    /// Repeat slot: elapsed milliseconds of each timed invocation
    pub fn last_samples(&self) -> &[f64] {
        &self.last_samples
    }

    /// Move the repeat slot out, leaving it empty
    pub fn take_samples(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.last_samples)
    }

    /// Active timing mode
    pub fn mode(&self) -> TimingMode {
        self.mode
    }

    /// Closure invocations so far, timed or not
    pub fn total_invocations(&self) -> u64 {
        self.total_invocations
    }
}
