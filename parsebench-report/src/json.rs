//! JSON Output

use crate::report::RunOutcome;

/// Generate a prettified JSON report.
///
/// Serializes every round, the cross-round summary and run metadata.
pub fn generate_json_report(outcome: &RunOutcome) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outcome)
}

/// Parse a report previously written by [`generate_json_report`]
pub fn parse_json_report(json: &str) -> Result<RunOutcome, serde_json::Error> {
    serde_json::from_str(json)
}
