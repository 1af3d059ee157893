//! Parser Build Trigger
//!
//! Regenerating the parser from the grammar is delegated to a shell script.
//! The trigger is fire-and-forget: the exit status is logged and never acted on.

use std::path::PathBuf;
use std::process::Command;

/// Regenerates the parser after the grammar source changed
pub trait ParserBuilder {
    /// Run the build once
    fn build(&mut self);
}

/// Runs `sh <script>` and waits for it
#[derive(Debug, Clone)]
pub struct ShellBuild {
    script: PathBuf,
}

impl ShellBuild {
    /// Build by running `sh <script>`
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl ParserBuilder for ShellBuild {
    fn build(&mut self) {
        tracing::info!(script = %self.script.display(), "building parser");
        match Command::new("sh").arg(&self.script).status() {
            Ok(status) if status.success() => tracing::info!("parser build finished"),
            Ok(status) => tracing::warn!("parser build exited with {status}"),
            Err(e) => tracing::error!(
                "failed to run build script {}: {e}",
                self.script.display()
            ),
        }
    }
}
