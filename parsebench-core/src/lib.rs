#![warn(missing_docs)]
//! ParseBench Core - Test Runtime
//!
//! This crate provides the execution environment for parser tests:
//! - `Measurer`, the repeated timer tests wrap their parse calls in
//! - Wall-clock timing in milliseconds
//! - Scoped suspension of a runtime's memory reclamation
//! - An explicit registry of (suite, method, factory) test cases

mod measure;
mod measurer;
mod reclaim;

pub use measure::{Instant, Timer, duration_ms};
pub use measurer::{Measurer, TimingMode};
pub use reclaim::{NoReclaim, ReclaimGuard, Reclaimer};

use std::fmt;

/// Error raised while constructing or executing a test
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// The test instance could not be constructed
    #[error("setup failed: {0}")]
    Setup(String),
    /// The test raised an error while executing
    #[error("execution failed: {0}")]
    Execution(String),
    /// Filesystem access inside the test failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A runnable test bound to one method.
///
/// `Ok(true)` means the test passed, `Ok(false)` that an assertion failed.
/// `Err` is reserved for errors that prevent the test from producing a verdict.
pub trait ParserTest {
    /// Run the test, timing the parse through `measurer`
    fn execute(&mut self, measurer: &mut Measurer) -> Result<bool, TestError>;
}

impl<F> ParserTest for F
where
    F: FnMut(&mut Measurer) -> Result<bool, TestError>,
{
    fn execute(&mut self, measurer: &mut Measurer) -> Result<bool, TestError> {
        self(measurer)
    }
}

/// Constructs a fresh test instance for one execution
pub type TestFactory = Box<dyn Fn() -> Result<Box<dyn ParserTest>, TestError>>;

/// A registered test method
pub struct TestCaseDef {
    /// Suite (class) the method belongs to
    pub suite: String,
    /// Method name
    pub method: String,
    factory: TestFactory,
}

impl TestCaseDef {
    /// Register a method with an explicit factory
    pub fn new(suite: impl Into<String>, method: impl Into<String>, factory: TestFactory) -> Self {
        Self {
            suite: suite.into(),
            method: method.into(),
            factory,
        }
    }

    /// Build a fresh instance bound to this method
    pub fn instantiate(&self) -> Result<Box<dyn ParserTest>, TestError> {
        (self.factory)()
    }

    /// `suite::method` identifier used for filtering and display
    pub fn id(&self) -> String {
        format!("{}::{}", self.suite, self.method)
    }
}

impl fmt::Debug for TestCaseDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCaseDef")
            .field("suite", &self.suite)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of test cases.
///
/// Registration order is execution order.
#[derive(Debug, Default)]
pub struct Registry {
    cases: Vec<TestCaseDef>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method with an explicit factory.
    ///
    /// `(suite, method)` keys are unique: a duplicate is dropped with a
    /// warning and the first registration is kept.
    pub fn register(&mut self, case: TestCaseDef) -> &mut Self {
        if self.contains(&case.suite, &case.method) {
            tracing::warn!(test = %case.id(), "already registered, ignoring duplicate");
            return self;
        }
        tracing::trace!(test = %case.id(), "registered");
        self.cases.push(case);
        self
    }

    /// Register a plain function or closure as a test method.
    ///
    /// Each execution gets its own clone of `test`.
    pub fn register_fn<F>(
        &mut self,
        suite: impl Into<String>,
        method: impl Into<String>,
        test: F,
    ) -> &mut Self
    where
        F: Fn(&mut Measurer) -> Result<bool, TestError> + Clone + 'static,
    {
        let factory: TestFactory = Box::new(move || {
            let instance = test.clone();
            Ok(Box::new(instance) as Box<dyn ParserTest>)
        });
        self.register(TestCaseDef::new(suite, method, factory))
    }

    /// Whether `suite::method` is registered
    pub fn contains(&self, suite: &str, method: &str) -> bool {
        self.cases
            .iter()
            .any(|c| c.suite == suite && c.method == method)
    }

    /// Registered cases in registration order
    pub fn iter(&self) -> impl Iterator<Item = &TestCaseDef> {
        self.cases.iter()
    }

    /// Number of registered cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Fully qualified type name, for use as a suite name
pub fn suite_name<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}
