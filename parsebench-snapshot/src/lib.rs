#![warn(missing_docs)]
//! ParseBench Snapshots
//!
//! A snapshot is a baseline measurement stored as a flat directory:
//!
//! ```text
//! <root>/<name>/
//!   measurements.csv   header + one row per test method (all text)
//!   metadata.json      run summary
//!   Grammar.g4         grammar source the baseline was measured with
//! ```
//!
//! - [`SnapshotStore`] loads, saves and temporarily restores a snapshot's grammar
//! - [`Reconciler`] compares a round's results against a loaded snapshot

mod reconcile;
mod store;

pub use reconcile::Reconciler;
pub use store::{GrammarSwap, SnapshotStore, default_snapshot_name};

use parsebench_report::{RunMetadata, TestResult};
use std::path::PathBuf;

/// Rows table file name
pub const MEASUREMENTS_FILE: &str = "measurements.csv";
/// Metadata document file name
pub const METADATA_FILE: &str = "metadata.json";
/// Archived grammar file name
pub const GRAMMAR_FILE: &str = "Grammar.g4";

/// Column holding the method name
pub const METHOD_COLUMN: usize = 0;
/// Column holding the average duration
pub const AVERAGE_COLUMN: usize = 1;
/// Column holding the class (suite) name
pub const CLASS_COLUMN: usize = 5;

/// Errors from snapshot persistence
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot directory does not exist
    #[error("snapshot \"{name}\" doesn't exist ({})", path.display())]
    NotFound {
        /// Requested snapshot name
        name: String,
        /// Directory that was looked up
        path: PathBuf,
    },
    /// File access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The rows table could not be read or written
    #[error("measurements table error: {0}")]
    Csv(#[from] csv::Error),
    /// The metadata document could not be read or written
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Raw snapshot row; numeric fields stay text until asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow(pub Vec<String>);

impl SnapshotRow {
    fn field(&self, idx: usize) -> &str {
        self.0.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Method name column
    pub fn method(&self) -> &str {
        self.field(METHOD_COLUMN)
    }

    /// Class name column
    pub fn class_name(&self) -> &str {
        self.field(CLASS_COLUMN)
    }

    /// Average duration, if the column parses as a number
    pub fn average_ms(&self) -> Option<f64> {
        self.field(AVERAGE_COLUMN).trim().parse().ok()
    }

    /// Whether this row has the given identity
    pub fn is(&self, method: &str, class_name: &str) -> bool {
        self.method() == method && self.class_name() == class_name
    }

    /// All fields
    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

impl From<&TestResult> for SnapshotRow {
    fn from(result: &TestResult) -> Self {
        SnapshotRow(result.to_record().into())
    }
}

/// A loaded baseline
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Snapshot name (directory name)
    pub name: String,
    /// Column labels
    pub header: Vec<String>,
    /// Rows in file order
    pub rows: Vec<SnapshotRow>,
    /// Run summary, absent for an empty in-memory baseline
    pub metadata: Option<RunMetadata>,
}

impl Snapshot {
    /// Baseline with no rows, used while re-measuring an old grammar
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header: Vec::new(),
            rows: Vec::new(),
            metadata: None,
        }
    }

    /// In-memory baseline built from freshly measured results
    pub fn from_results(
        name: impl Into<String>,
        header: &[String],
        results: &[TestResult],
        metadata: Option<RunMetadata>,
    ) -> Self {
        Self {
            name: name.into(),
            header: header.to_vec(),
            rows: results.iter().map(SnapshotRow::from).collect(),
            metadata,
        }
    }

    /// First row matching `(method, class_name)`
    pub fn get_result(&self, method: &str, class_name: &str) -> Option<&SnapshotRow> {
        self.rows.iter().find(|row| row.is(method, class_name))
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the snapshot has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> SnapshotRow {
        SnapshotRow(fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn test_row_accessors() {
        let r = row(&["test_add", "12.5", "0", "True", "100", "suite.Expr", "30"]);
        assert_eq!(r.method(), "test_add");
        assert_eq!(r.class_name(), "suite.Expr");
        assert_eq!(r.average_ms(), Some(12.5));
        assert!(r.is("test_add", "suite.Expr"));
        assert!(!r.is("test_add", "suite.Other"));
    }

    #[test]
    fn test_short_row_does_not_panic() {
        let r = row(&["test_add"]);
        assert_eq!(r.class_name(), "");
        assert_eq!(r.average_ms(), None);
    }

    #[test]
    fn test_get_result_first_match() {
        let snapshot = Snapshot {
            name: "init".into(),
            header: vec![],
            rows: vec![
                row(&["m", "1", "", "", "", "A", ""]),
                row(&["m", "2", "", "", "", "B", ""]),
                row(&["m", "3", "", "", "", "B", ""]),
            ],
            metadata: None,
        };
        assert_eq!(snapshot.get_result("m", "B").unwrap().average_ms(), Some(2.0));
        assert!(snapshot.get_result("m", "C").is_none());
    }

    #[test]
    fn test_not_found_message() {
        let err = SnapshotError::NotFound {
            name: "init".into(),
            path: PathBuf::from("snapshots/init"),
        };
        assert!(err.to_string().starts_with("snapshot \"init\" doesn't exist"));
    }
}
