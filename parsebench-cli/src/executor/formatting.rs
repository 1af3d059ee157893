//! Output Formatting
//!
//! Human-readable output formatting for round reports.
//!
//! Generates terminal-friendly output with:
//! - Results table, hiding rows that average below the ignore tolerance
//! - Sums of averages and, when recorded, total parsing time
//! - Benchmark block comparing paired sums against the snapshot
//! - Methods present on only one side

use parsebench_report::{CrossRoundSummary, MethodRef, RoundReport, TestResult};
use parsebench_stats::round_to;

/// Rendering options shared by all report sections
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Column labels
    pub header: Vec<String>,
    /// Rows averaging below this are left out of the table
    pub ignore_tolerance_ms: f64,
    /// Decimal places
    pub decimals: u32,
    /// Show total parsing time next to the sum of averages
    pub parsing_time_analysis: bool,
}

/// Format one round for terminal display
pub fn format_round_report(report: &RoundReport, options: &FormatOptions) -> String {
    let mut output = String::new();
    let d = options.decimals;

    output.push('\n');
    output.push_str(&format!(
        "Results of current measurement (run {})\n",
        report.round + 1
    ));
    output.push_str(&"=".repeat(100));
    output.push_str("\n\n");

    output.push_str(&format_table(&report.results, options));
    output.push('\n');

    let meta = &report.metadata;
    if options.parsing_time_analysis {
        output.push_str(&format!(
            "Sum of total parsing time: {} ms\n",
            round_to(meta.sum_total_parsing_time, d)
        ));
        let share = if meta.sum_total_parsing_time == 0.0 {
            0.0
        } else {
            100.0 / meta.sum_total_parsing_time * meta.sum_avg
        };
        output.push_str(&format!(
            "Sum of parsing: {} ms ({} %)\n",
            round_to(meta.sum_avg, d),
            round_to(share, d)
        ));
    } else {
        output.push_str(&format!("Sum of parsing: {} ms\n", round_to(meta.sum_avg, d)));
    }
    output.push_str(&format!(
        "Parsed and tested a total of {}\n",
        meta.amount_of_tests
    ));

    if report.all_passed() {
        output.push_str("✓ All tests were successful\n");
    } else {
        output.push_str(&format!(
            "✗ Some tests failed: {}\n",
            format_method_list(&meta.failed_tests)
        ));
    }

    let bench = &report.benchmark;
    output.push_str(&format!("\n{:^50}\n", "Benchmarking"));
    output.push_str(&"-".repeat(50));
    output.push('\n');
    output.push_str(&format!(
        "Sum of benchmark current measurement: {} ms\n",
        round_to(bench.current_sum_ms, d)
    ));
    output.push_str(&format!(
        "Sum of benchmark snapshot measurement: {} ms\n",
        round_to(bench.snapshot_sum_ms, d)
    ));
    output.push_str(&format!(
        "Improvement: {} ms ({} %)\n",
        signed(bench.improvement_ms(), d),
        signed(bench.improvement_percent(), d)
    ));
    output.push_str(&format!(
        "\nBenchmarked methods ({}): {}\n",
        bench.methods.len(),
        format_method_list(&bench.methods)
    ));

    if report.is_desynchronized() {
        output.push_str("\nSnapshot and current measurement aren't synchronized.\n");
        output.push_str(&format!(
            "Methods in snapshot but not in current measurement: {}\n",
            format_method_list(&report.missing_in_current)
        ));
        output.push_str(&format!(
            "Methods in current measurement but not in snapshot: {}\n",
            format_method_list(&report.missing_in_snapshot)
        ));
    }

    if let Some(name) = &report.saved_snapshot {
        output.push_str(&format!("\nMeasurement saved as snapshot \"{name}\"\n"));
    }

    output.push_str(&"-".repeat(50));
    output.push('\n');
    output.push_str(&"=".repeat(100));
    output.push('\n');

    output
}

/// Format the aggregate over all rounds
pub fn format_cross_round_summary(summary: &CrossRoundSummary, decimals: u32) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Analysis: Results over all benchmarks\n");
    output.push_str(&"=".repeat(100));
    output.push('\n');
    output.push_str(&format!("Benchmarked {} times\n\n", summary.rounds.len()));

    for round in &summary.rounds {
        output.push_str(&format!("Benchmark {}\n", round.round + 1));
        output.push_str(&format!("  Current measure: {}\n", round.sum_avg));
        output.push_str(&format!("  Old measure: {}\n", round.snapshot_benchmark_sum));
    }

    output.push('\n');
    output.push_str(&format!(
        "Average sum of benchmark current measurement: {} ms\n",
        round_to(summary.current_average_ms, decimals)
    ));
    output.push_str(&format!(
        "Average sum of benchmark snapshot measurement: {} ms\n",
        round_to(summary.snapshot_average_ms, decimals)
    ));
    output.push_str(&format!(
        "Improvement: {} ms ({} %)\n",
        signed(summary.improvement_ms(), decimals),
        signed(summary.improvement_percent(), decimals)
    ));
    output.push_str(&"=".repeat(100));
    output.push('\n');

    output
}

fn format_table(results: &[TestResult], options: &FormatOptions) -> String {
    let d = options.decimals;
    let rows: Vec<[String; 7]> = results
        .iter()
        .filter(|r| r.average_ms >= options.ignore_tolerance_ms)
        .map(|r| {
            [
                r.method.clone(),
                round_to(r.average_ms, d).to_string(),
                signed(r.difference_ms, d),
                if r.success { "True" } else { "False" }.to_string(),
                format!("{}%", r.percent),
                r.class_name.clone(),
                round_to(r.total_parsing_time_ms, d).to_string(),
            ]
        })
        .collect();

    let labels: Vec<&str> = (0..7)
        .map(|i| options.header.get(i).map(String::as_str).unwrap_or(""))
        .collect();

    let mut widths: Vec<usize> = labels.iter().map(|l| l.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let line = |cells: &[&str]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        format!("  {}\n", padded.join("  "))
    };

    output.push_str(&line(&labels));
    let total_width = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    output.push_str(&format!("  {}\n", "-".repeat(total_width)));
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        output.push_str(&line(&cells));
    }

    let hidden = results.len() - rows.len();
    if hidden > 0 {
        output.push_str(&format!(
            "  ({} rows below {} ms hidden)\n",
            hidden, options.ignore_tolerance_ms
        ));
    }

    output
}

/// Value with an explicit `+` for regressions
fn signed(value: f64, decimals: u32) -> String {
    let rounded = round_to(value, decimals);
    if rounded > 0.0 {
        format!("+{rounded}")
    } else {
        rounded.to_string()
    }
}

fn format_method_list(methods: &[MethodRef]) -> String {
    let items: Vec<String> = methods
        .iter()
        .map(|m| format!("[{}, {}]", m.class_name(), m.method()))
        .collect();
    format!("[{}]", items.join(", "))
}
