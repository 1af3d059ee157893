#![warn(missing_docs)]
//! ParseBench CLI Library
//!
//! This module provides the CLI infrastructure for parser benchmark binaries.
//! Register your parser tests and hand the registry to `parsebench::run()` (or
//! `parsebench_cli::run()`) in your main function.
//!
//! # Example
//!
//! ```ignore
//! use parsebench::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.register_fn("ExprSuite", "test_add", |m: &mut Measurer| {
//!         let tree = m.measure(|| parse("1 + 2"));
//!         Ok(tree.is_ok())
//!     });
//!     parsebench_cli::run(registry)
//! }
//! ```

mod config;
mod executor;
mod planner;

pub use config::*;
pub use executor::{
    CaseOutcome, ExecutionConfig, FormatOptions, Orchestrator, OrchestratorConfig, ParserBuilder,
    ShellBuild, TestRunner, format_cross_round_summary, format_round_report,
};
pub use planner::{ExecutionPlan, build_plan};

use anyhow::Context;
use clap::{Parser, Subcommand};
use parsebench_core::Registry;
use parsebench_report::{OutputFormat, generate_json_report};
use parsebench_snapshot::SnapshotStore;
use parsebench_stats::OutlierPolicy;
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Tracing target of rendered reports
const REPORT_TARGET: &str = "parsebench::report";

/// ParseBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "parsebench")]
#[command(
    author,
    version,
    about = "ParseBench - performance regression harness for parser test suites"
)]
pub struct Cli {
    /// Optional subcommand (List, Run, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter tests by regex pattern on `suite::method`
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Output format: human, json
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file (default: nearest parsebench.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Snapshot to compare against; pass "" to measure without a baseline
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Save each round as a snapshot
    /// Optionally specify a name; defaults to config or a timestamp
    #[arg(long)]
    pub save_snapshot: Option<Option<String>>,

    /// Re-measure the snapshot with its own grammar before comparing
    #[arg(long)]
    pub recreate: bool,

    /// Number of measurement rounds
    #[arg(long)]
    pub rounds: Option<usize>,

    /// Timed runs per test
    #[arg(long, short = 'n')]
    pub runs: Option<usize>,

    /// Outlier detection: high-low, iqr
    #[arg(long)]
    pub outliers: Option<OutlierPolicy>,

    /// Run the parser build script before measuring
    #[arg(long)]
    pub build_parser: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide per-test progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Internal: Absorb cargo bench's --bench flag
    #[arg(long, hide = true)]
    pub bench: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered tests and available snapshots
    List,
    /// Run tests and compare against the snapshot (default)
    Run,
    /// Write a default parsebench.toml to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the ParseBench CLI with the given registry.
/// This is the main entry point for benchmark binaries.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run(registry: Registry) -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli, &registry)
}

/// Run the ParseBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli, registry: &Registry) -> anyhow::Result<()> {
    if let Some(Commands::Init { force }) = cli.command {
        return init_config(force);
    }

    // Load parsebench.toml configuration (CLI flags override)
    let mut config = match &cli.config {
        Some(path) => ParseBenchConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        // Logging isn't installed yet
        None => ParseBenchConfig::discover()
            .unwrap_or_else(|e| {
                eprintln!("Warning: {e:#}; using default configuration");
                None
            })
            .unwrap_or_default(),
    };
    apply_cli_overrides(&cli, &mut config);

    init_logging(&config, cli.verbose);

    match cli.command {
        Some(Commands::List) => list_tests(&cli, &config, registry),
        Some(Commands::Run) | None => run_tests(&cli, &config, registry),
        Some(Commands::Init { .. }) => Ok(()),
    }
}

/// Layer CLI flags over file configuration
fn apply_cli_overrides(cli: &Cli, config: &mut ParseBenchConfig) {
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(snapshot) = &cli.snapshot {
        config.snapshot.use_snapshot = snapshot.clone();
    }
    if let Some(save) = &cli.save_snapshot {
        config.snapshot.make = true;
        if let Some(name) = save {
            config.snapshot.name = name.clone();
        }
    }
    if cli.recreate {
        config.snapshot.recreate = true;
    }
    if let Some(rounds) = cli.rounds {
        config.benchmark.rounds = rounds;
    }
    if let Some(runs) = cli.runs {
        config.tests.runs_per_test = runs;
    }
    if let Some(policy) = cli.outliers {
        config.outliers.detection = policy;
    }
    if cli.build_parser {
        config.parser.build = true;
    }
}

/// Install the fmt subscriber, writing to the log file in the snapshot directory.
///
/// Falls back to stderr when the file cannot be opened. A subscriber that is
/// already installed is kept.
fn init_logging(config: &ParseBenchConfig, verbose: bool) {
    let filter = if verbose {
        "parsebench=debug"
    } else {
        "parsebench=info"
    };

    let log_path = config.log_path();
    let file = log_path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
        });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match file {
        Ok(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        Err(e) => {
            eprintln!(
                "Warning: cannot open log file {}: {}; logging to stderr",
                log_path.display(),
                e
            );
            builder.with_writer(std::io::stderr).try_init()
        }
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn list_tests(cli: &Cli, config: &ParseBenchConfig, registry: &Registry) -> anyhow::Result<()> {
    let filter = compile_filter(&cli.filter)?;
    let plan = build_plan(registry, Some(&filter));

    println!("ParseBench Plan:");

    // Suites in order of first registration
    let mut suites: Vec<(&str, Vec<&str>)> = Vec::new();
    for case in &plan.cases {
        match suites.iter_mut().find(|(suite, _)| *suite == case.suite) {
            Some((_, methods)) => methods.push(case.method.as_str()),
            None => suites.push((case.suite.as_str(), vec![case.method.as_str()])),
        }
    }

    for (suite, methods) in &suites {
        println!("├── suite: {}", suite);
        for method in methods {
            println!("│   ├── {}", method);
        }
    }
    println!("{} tests found.", plan.len());

    let store = SnapshotStore::new(
        &config.snapshot.directory,
        &config.parser.grammar_path,
        &config.parser.temp_grammar_path,
    );
    let snapshots = store.list()?;
    if snapshots.is_empty() {
        println!("No snapshots in {}.", config.snapshot.directory);
    } else {
        println!("Snapshots: {}", snapshots.join(", "));
    }

    Ok(())
}

fn run_tests(cli: &Cli, config: &ParseBenchConfig, registry: &Registry) -> anyhow::Result<()> {
    if config.output.result_header.len() != DEFAULT_RESULT_HEADER.len() {
        anyhow::bail!(
            "output.result_header must have {} labels, found {}",
            DEFAULT_RESULT_HEADER.len(),
            config.output.result_header.len()
        );
    }

    let filter = compile_filter(&cli.filter)?;
    let plan = build_plan(registry, Some(&filter));

    if plan.is_empty() {
        println!("No tests found.");
        return Ok(());
    }

    let format = config.output.format;
    let human = format == OutputFormat::Human;

    if human {
        let source = if config.snapshot.recreate {
            format!("recreated snapshot \"{}\"", config.snapshot.use_snapshot)
        } else if config.snapshot.use_snapshot.is_empty() {
            "no snapshot".to_string()
        } else {
            format!("snapshot \"{}\"", config.snapshot.use_snapshot)
        };
        println!(
            "Running {} tests against {}, {} run(s) each, {} round(s)...",
            plan.len(),
            source,
            config.tests.runs_per_test,
            config.benchmark.rounds
        );
    }

    let options = FormatOptions {
        header: config.output.result_header.clone(),
        ignore_tolerance_ms: config.output.ignore_tolerance_ms,
        decimals: config.output.decimals,
        parsing_time_analysis: config.records_total_parsing_time(),
    };

    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig::from_config(config, !cli.no_progress),
        plan,
    )
    .with_builder(Box::new(ShellBuild::new(&config.parser.build_script)));

    // Human output streams round by round unless it goes to a file
    let mut rendered = String::new();
    let mut emit = |text: String| {
        if cli.output.is_some() {
            rendered.push_str(&text);
        } else {
            print!("{}", text);
        }
    };

    // Rendered reports are always copied into the log file
    let outcome = orchestrator
        .run_with(|round| {
            let text = format_round_report(round, &options);
            tracing::info!(target: REPORT_TARGET, "{}", text);
            if human {
                emit(text);
            }
        })
        .context("measurement aborted")?;

    if let Some(summary) = &outcome.summary {
        let text = format_cross_round_summary(summary, config.output.decimals);
        tracing::info!(target: REPORT_TARGET, "{}", text);
        if human {
            emit(text);
        }
    }
    if format == OutputFormat::Json {
        emit(generate_json_report(&outcome)?);
    }

    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(rendered.as_bytes())?;
        println!("Report written to: {}", path.display());
    }

    if outcome.has_failures() {
        let failed: usize = outcome
            .rounds
            .iter()
            .map(|r| r.metadata.failed_tests.len())
            .sum();
        eprintln!("\n{} test failure(s) across {} round(s)", failed, outcome.rounds.len());
        std::process::exit(1);
    }

    Ok(())
}

fn init_config(force: bool) -> anyhow::Result<()> {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(&path, ParseBenchConfig::default_toml())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn compile_filter(pattern: &str) -> anyhow::Result<Regex> {
    Regex::new(pattern).with_context(|| format!("invalid filter pattern '{}'", pattern))
}
