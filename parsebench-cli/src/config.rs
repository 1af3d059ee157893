//! Configuration loading from parsebench.toml
//!
//! ParseBench configuration can be specified in a `parsebench.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use anyhow::Context;
use parsebench_report::OutputFormat;
use parsebench_stats::OutlierPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name looked up by [`ParseBenchConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "parsebench.toml";

/// Default column labels of the results table and snapshot CSV
pub const DEFAULT_RESULT_HEADER: [&str; 7] = [
    "Test Name",
    "Avg. Parsing Time [ms]",
    "Difference to origin [ms]",
    "Success",
    "Percentage",
    "Test Class",
    "Total parsing time [ms]",
];

/// ParseBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParseBenchConfig {
    /// Snapshot selection and persistence
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Outlier handling
    #[serde(default)]
    pub outliers: OutliersConfig,
    /// Test execution
    #[serde(default)]
    pub tests: TestsConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Grammar and parser build
    #[serde(default)]
    pub parser: ParserConfig,
    /// Log file
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Benchmark rounds
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

/// Snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Persist every round as a new snapshot
    #[serde(default)]
    pub make: bool,
    /// Root directory holding all snapshots
    #[serde(default = "default_snapshot_directory")]
    pub directory: String,
    /// Name for new snapshots; empty means timestamped
    #[serde(default)]
    pub name: String,
    /// Snapshot to compare against
    #[serde(default = "default_use_snapshot", rename = "use")]
    pub use_snapshot: String,
    /// Re-measure the baseline with the snapshot's grammar
    #[serde(default)]
    pub recreate: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            make: false,
            directory: default_snapshot_directory(),
            name: String::new(),
            use_snapshot: default_use_snapshot(),
            recreate: false,
        }
    }
}

fn default_snapshot_directory() -> String {
    "measurement_snapshots".to_string()
}
fn default_use_snapshot() -> String {
    "init".to_string()
}

/// Outlier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutliersConfig {
    /// Policy applied to per-test samples and to the cross-round summary
    #[serde(default)]
    pub detection: OutlierPolicy,
}

/// Test execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestsConfig {
    /// Differences below this many milliseconds are reported as 0
    #[serde(default)]
    pub diff_tolerance_ms: f64,
    /// Timed runs per test
    #[serde(default = "default_runs_per_test")]
    pub runs_per_test: usize,
    /// Repeat the whole test per run instead of repeating the parse call
    #[serde(default = "default_true")]
    pub run_multiple_times: bool,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            diff_tolerance_ms: 0.0,
            runs_per_test: default_runs_per_test(),
            run_multiple_times: true,
        }
    }
}

fn default_runs_per_test() -> usize {
    50
}
fn default_true() -> bool {
    true
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Rows averaging below this are hidden from the console table
    #[serde(default = "default_ignore_tolerance")]
    pub ignore_tolerance_ms: f64,
    /// Column labels, in column order
    #[serde(default = "default_result_header")]
    pub result_header: Vec<String>,
    /// Decimal places for rounded values
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// Report total parsing time next to the measured parse time
    #[serde(default = "default_true")]
    pub parsing_time_analysis: bool,
    /// Default output format: "human" or "json"
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ignore_tolerance_ms: default_ignore_tolerance(),
            result_header: default_result_header(),
            decimals: default_decimals(),
            parsing_time_analysis: true,
            format: OutputFormat::default(),
        }
    }
}

fn default_ignore_tolerance() -> f64 {
    1.0
}
fn default_result_header() -> Vec<String> {
    DEFAULT_RESULT_HEADER.iter().map(|s| s.to_string()).collect()
}
fn default_decimals() -> u32 {
    2
}

/// Grammar and parser build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Run the build script before measuring
    #[serde(default)]
    pub build: bool,
    /// Shell script that regenerates the parser from the grammar
    #[serde(default = "default_build_script")]
    pub build_script: String,
    /// Live grammar source
    #[serde(default = "default_grammar_path")]
    pub grammar_path: String,
    /// Backup location of the live grammar during recreate
    #[serde(default = "default_temp_grammar_path")]
    pub temp_grammar_path: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            build: false,
            build_script: default_build_script(),
            grammar_path: default_grammar_path(),
            temp_grammar_path: default_temp_grammar_path(),
        }
    }
}

fn default_build_script() -> String {
    "example_grammar/build.sh".to_string()
}
fn default_grammar_path() -> String {
    "example_grammar/Grammar.g4".to_string()
}
fn default_temp_grammar_path() -> String {
    "example_grammar/TestGrammar.txt".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log file name inside the snapshot directory
    #[serde(default = "default_log_file")]
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_name: default_log_file(),
        }
    }
}

fn default_log_file() -> String {
    "measure_log".to_string()
}

/// Benchmark round configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Sequential measurement rounds
    #[serde(default = "default_rounds")]
    pub rounds: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
        }
    }
}

fn default_rounds() -> usize {
    1
}

impl ParseBenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory.
    ///
    /// `Ok(None)` when no file exists; a file that fails to parse is an error.
    pub fn discover() -> anyhow::Result<Option<Self>> {
        let dir = std::env::current_dir()?;
        Self::discover_from(&dir)
    }

    /// Like [`discover`](Self::discover), starting at `start`
    pub fn discover_from(start: &Path) -> anyhow::Result<Option<Self>> {
        match Self::discover_path_from(start) {
            Some(path) => Self::load(&path)
                .with_context(|| format!("invalid {}", path.display()))
                .map(Some),
            None => Ok(None),
        }
    }

    /// Path of the nearest `parsebench.toml` at or above the current directory
    pub fn discover_path() -> Option<PathBuf> {
        let dir = std::env::current_dir().ok()?;
        Self::discover_path_from(&dir)
    }

    fn discover_path_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|path| path.exists())
    }

    /// Path of the log file
    pub fn log_path(&self) -> PathBuf {
        Path::new(&self.snapshot.directory).join(&self.logging.file_name)
    }

    /// Whether per-test total parsing time is recorded
    pub fn records_total_parsing_time(&self) -> bool {
        self.output.parsing_time_analysis && self.tests.run_multiple_times
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# ParseBench Configuration

[snapshot]
# Save every round as a new snapshot
make = false
# Directory holding all snapshots (and the log file)
directory = "measurement_snapshots"
# Name of new snapshots; empty uses "snapshot-<yymmdd_HHMMSS>"
name = ""
# Snapshot to compare against
use = "init"
# Re-measure the snapshot with its own grammar before comparing
recreate = false

[outliers]
# "high-low" drops the fastest and slowest sample, "iqr" applies a 1.5 IQR fence
detection = "high-low"

[tests]
# Differences below this (ms) are reported as 0
diff_tolerance_ms = 0.0
# Timed runs per test
runs_per_test = 50
# Repeat the whole test per run (true) or only the parse call (false)
run_multiple_times = true

[output]
# Hide rows averaging below this (ms) from the console table
ignore_tolerance_ms = 1.0
# Column labels
result_header = [
    "Test Name",
    "Avg. Parsing Time [ms]",
    "Difference to origin [ms]",
    "Success",
    "Percentage",
    "Test Class",
    "Total parsing time [ms]",
]
# Decimal places
decimals = 2
# Report total parsing time next to parse time
parsing_time_analysis = true
# Output format: human, json
format = "human"

[parser]
# Rebuild the parser before measuring
build = false
build_script = "example_grammar/build.sh"
grammar_path = "example_grammar/Grammar.g4"
temp_grammar_path = "example_grammar/TestGrammar.txt"

[logging]
file_name = "measure_log"

[benchmark]
# Sequential measurement rounds
rounds = 1
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParseBenchConfig::default();
        assert_eq!(config.snapshot.use_snapshot, "init");
        assert_eq!(config.snapshot.directory, "measurement_snapshots");
        assert_eq!(config.tests.runs_per_test, 50);
        assert!(config.tests.run_multiple_times);
        assert_eq!(config.output.result_header.len(), 7);
        assert_eq!(config.output.decimals, 2);
        assert_eq!(config.benchmark.rounds, 1);
        assert_eq!(config.outliers.detection, OutlierPolicy::HighLow);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [snapshot]
            use = "v2"
            make = true

            [outliers]
            detection = "iqr"

            [tests]
            run_multiple_times = false
        "#;

        let config: ParseBenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.snapshot.use_snapshot, "v2");
        assert!(config.snapshot.make);
        assert_eq!(config.outliers.detection, OutlierPolicy::Iqr);
        assert!(!config.tests.run_multiple_times);
        assert!(!config.records_total_parsing_time());
        // Defaults should still apply
        assert_eq!(config.output.format, OutputFormat::Human);
        assert_eq!(config.logging.file_name, "measure_log");
    }

    #[test]
    fn test_default_toml_parses() {
        let config: ParseBenchConfig = toml::from_str(&ParseBenchConfig::default_toml()).unwrap();
        assert_eq!(config.snapshot.use_snapshot, "init");
        assert_eq!(config.output.result_header, default_result_header());
        assert_eq!(config.parser.grammar_path, "example_grammar/Grammar.g4");
    }

    #[test]
    fn test_discover_walks_up() {
        let tmp = tempfile::TempDir::new().unwrap();
        let nested = tmp.path().join("grammar").join("tests");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[benchmark]\nrounds = 4\n",
        )
        .unwrap();

        let config = ParseBenchConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.benchmark.rounds, 4);
    }

    #[test]
    fn test_discover_reports_malformed_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "[tests\nruns_per_test = ").unwrap();

        let err = ParseBenchConfig::discover_from(tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_log_path() {
        let config = ParseBenchConfig::default();
        assert_eq!(
            config.log_path(),
            Path::new("measurement_snapshots").join("measure_log")
        );
    }
}
