//! Test Executor
//!
//! Runs parser tests, reconciles them against a snapshot and renders results.
//!
//! ## Pipeline Overview
//!
//! ```text
//! TestCaseDef (registered in a Registry)
//!       │
//!       ▼
//! ┌──────────────┐
//! │  execution   │  Run each test N times, filter outliers, average
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │ orchestrator │  Rounds, reconciliation, snapshots, recreate
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │  formatting  │  Human-readable output
//! └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Per-test execution and averaging
//! - [`orchestrator`] - Round loop and baseline handling
//! - [`formatting`] - Human-readable output formatting
//! - [`build`] - Parser build trigger

mod build;
mod execution;
mod formatting;
mod orchestrator;

// Re-export public API
pub use build::{ParserBuilder, ShellBuild};
pub use execution::{CaseOutcome, ExecutionConfig, TestRunner};
pub use formatting::{FormatOptions, format_cross_round_summary, format_round_report};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
