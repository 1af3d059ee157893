//! Snapshot Store
//!
//! Persistence is not transactional: a failure part-way through `save` leaves
//! whatever files were already written in the snapshot directory.

use crate::{GRAMMAR_FILE, MEASUREMENTS_FILE, METADATA_FILE, Snapshot, SnapshotError, SnapshotRow};
use parsebench_report::{RunMetadata, TestResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Owns the snapshots root and the live grammar paths
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    grammar_path: PathBuf,
    temp_grammar_path: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `root`.
    ///
    /// `grammar_path` is the live grammar source; `temp_grammar_path` receives
    /// its backup while an old grammar is swapped in.
    pub fn new(
        root: impl Into<PathBuf>,
        grammar_path: impl Into<PathBuf>,
        temp_grammar_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            grammar_path: grammar_path.into(),
            temp_grammar_path: temp_grammar_path.into(),
        }
    }

    /// Snapshots root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the snapshot called `name`
    pub fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether a snapshot directory called `name` exists
    pub fn exists(&self, name: &str) -> bool {
        !name.is_empty() && self.snapshot_dir(name).is_dir()
    }

    /// Names of all snapshot directories, sorted
    pub fn list(&self) -> Result<Vec<String>, SnapshotError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|e| SnapshotError::io(&self.root, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SnapshotError::io(&self.root, e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn existing_dir(&self, name: &str) -> Result<PathBuf, SnapshotError> {
        let dir = self.snapshot_dir(name);
        if name.is_empty() || !dir.is_dir() {
            return Err(SnapshotError::NotFound {
                name: name.to_string(),
                path: dir,
            });
        }
        Ok(dir)
    }

    /// Load the rows table and metadata of snapshot `name`
    pub fn load(&self, name: &str) -> Result<Snapshot, SnapshotError> {
        let dir = self.existing_dir(name)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(dir.join(MEASUREMENTS_FILE))?;

        let header = reader.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(SnapshotRow(record?.iter().map(String::from).collect()));
        }

        let metadata_path = dir.join(METADATA_FILE);
        let metadata_json =
            fs::read_to_string(&metadata_path).map_err(|e| SnapshotError::io(&metadata_path, e))?;
        let metadata: RunMetadata = serde_json::from_str(&metadata_json)?;

        tracing::debug!(snapshot = name, rows = rows.len(), "snapshot loaded");

        Ok(Snapshot {
            name: name.to_string(),
            header,
            rows,
            metadata: Some(metadata),
        })
    }

    /// Persist `results` and `metadata` as a snapshot and archive the live grammar.
    ///
    /// An empty `name` is replaced by `snapshot-<yymmdd_HHMMSS>`. Returns the
    /// name used.
    pub fn save(
        &self,
        header: &[String],
        results: &[TestResult],
        metadata: &RunMetadata,
        name: &str,
    ) -> Result<String, SnapshotError> {
        let name = if name.is_empty() {
            default_snapshot_name()
        } else {
            name.to_string()
        };
        let dir = self.snapshot_dir(&name);
        fs::create_dir_all(&dir).map_err(|e| SnapshotError::io(&dir, e))?;

        let mut writer = csv::Writer::from_path(dir.join(MEASUREMENTS_FILE))?;
        writer.write_record(header)?;
        for result in results {
            writer.write_record(&result.to_record())?;
        }
        writer.flush().map_err(|e| SnapshotError::io(dir.join(MEASUREMENTS_FILE), e))?;

        let metadata_path = dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(&metadata_path, json).map_err(|e| SnapshotError::io(&metadata_path, e))?;

        let archived = dir.join(GRAMMAR_FILE);
        fs::copy(&self.grammar_path, &archived)
            .map_err(|e| SnapshotError::io(&self.grammar_path, e))?;

        tracing::info!(snapshot = %name, path = %dir.display(), "measurement saved");
        Ok(name)
    }

    /// Swap the live grammar for the one archived in snapshot `name`.
    ///
    /// The live grammar is backed up to the temp path first. The returned guard
    /// puts it back on [`GrammarSwap::close`] or when dropped. The backup file
    /// is kept afterwards for manual recovery.
    pub fn recreate(&self, name: &str) -> Result<GrammarSwap<'_>, SnapshotError> {
        let dir = self.existing_dir(name)?;
        let old_grammar = dir.join(GRAMMAR_FILE);

        if let Some(parent) = self.temp_grammar_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
            }
        }
        fs::copy(&self.grammar_path, &self.temp_grammar_path)
            .map_err(|e| SnapshotError::io(&self.grammar_path, e))?;

        // From here on the guard owns restoration.
        let swap = GrammarSwap {
            store: self,
            name: name.to_string(),
            restored: false,
        };
        fs::copy(&old_grammar, &self.grammar_path).map_err(|e| SnapshotError::io(&old_grammar, e))?;

        tracing::info!(snapshot = name, "grammar swapped to snapshot version");
        Ok(swap)
    }

    fn restore_grammar(&self) -> Result<(), SnapshotError> {
        fs::copy(&self.temp_grammar_path, &self.grammar_path)
            .map_err(|e| SnapshotError::io(&self.temp_grammar_path, e))?;
        Ok(())
    }
}

/// Live grammar temporarily replaced by a snapshot's grammar
#[must_use = "dropping the swap restores the grammar immediately"]
pub struct GrammarSwap<'a> {
    store: &'a SnapshotStore,
    name: String,
    restored: bool,
}

impl GrammarSwap<'_> {
    /// Snapshot whose grammar is swapped in
    pub fn snapshot_name(&self) -> &str {
        &self.name
    }

    /// Restore the live grammar and adopt `results`, measured with the old
    /// grammar, as the baseline.
    pub fn close(
        mut self,
        header: &[String],
        results: &[TestResult],
        metadata: RunMetadata,
    ) -> Result<Snapshot, SnapshotError> {
        self.restored = true;
        self.store.restore_grammar()?;
        tracing::info!(snapshot = %self.name, "grammar restored");

        Ok(Snapshot::from_results(
            self.name.clone(),
            header,
            results,
            Some(metadata),
        ))
    }
}

impl Drop for GrammarSwap<'_> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        match self.store.restore_grammar() {
            Ok(()) => tracing::warn!(snapshot = %self.name, "grammar restored after aborted recreate"),
            Err(e) => tracing::error!(
                snapshot = %self.name,
                backup = %self.store.temp_grammar_path.display(),
                "failed to restore grammar: {e}"
            ),
        }
    }
}

/// `snapshot-<yymmdd_HHMMSS>` in local time
pub fn default_snapshot_name() -> String {
    format!("snapshot-{}", chrono::Local::now().format("%y%m%d_%H%M%S"))
}
