#![warn(missing_docs)]
//! ParseBench Report - Result Model
//!
//! Data handed from the measurement core to renderers:
//! - `TestResult` rows and `RunMetadata`, also the on-disk snapshot shape
//! - `RoundReport` for one benchmark round
//! - `CrossRoundSummary` when several rounds ran
//! - JSON export of a whole `RunOutcome`

mod json;
mod report;

pub use json::{generate_json_report, parse_json_report};
pub use report::{
    BenchmarkSums, CrossRoundSummary, MethodRef, RoundReport, RoundSummary, RunMeta, RunMetadata,
    RunOutcome, TestResult, improvement_percent,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// JSON with every round and the summary
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("html".parse::<OutputFormat>().is_err());
    }
}
