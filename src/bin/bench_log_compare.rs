use bench_log_compare::error::{Error, Result};
use bench_log_compare::parser::{self, ResultMap};
use bench_log_compare::report::ReportFormatter;
use bench_log_compare::schema::SampleSeries;
use bench_log_compare::{compare, CompareConfig, ReportFormat};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a new benchmark log set against a baseline and report changes.
    Compare {
        /// Baseline log file. Can be provided multiple times; files are merged in order.
        #[arg(long, value_name = "FILE", required = true, num_args = 1.., action = clap::ArgAction::Append)]
        old_file: Vec<PathBuf>,

        /// New log file. Can be provided multiple times; files are merged in order.
        #[arg(long, value_name = "FILE", required = true, num_args = 1.., action = clap::ArgAction::Append)]
        new_file: Vec<PathBuf>,

        /// Report format.
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,

        /// Also write the report to this file.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Leave out tests without a significant change.
        #[arg(long, default_value_t = false)]
        changes_only: bool,

        /// Relative change of the speedup ratio that counts as significant.
        #[arg(long, default_value_t = bench_log_compare::config::DEFAULT_DELTA_THRESHOLD)]
        delta_threshold: f64,

        /// Name of the baseline branch (recorded in JSON reports).
        #[arg(long, default_value = "OLD_MIN")]
        old_branch: String,

        /// Name of the new branch (recorded in JSON reports).
        #[arg(long, default_value = "NEW_MIN")]
        new_branch: String,
    },

    /// Dump the raw sample series of every test that logged per-sample lines (JSON).
    Samples {
        /// Log file. Can be provided multiple times; files are merged in order.
        #[arg(long, value_name = "FILE", required = true, num_args = 1.., action = clap::ArgAction::Append)]
        log: Vec<PathBuf>,

        /// Only emit the series of this test.
        #[arg(long, value_name = "NAME")]
        test: Option<String>,

        /// Where to write the JSON. If omitted, prints to stdout.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "bench-log-compare")]
#[command(about = "Compare benchmark driver logs and report regressions")]
#[command(version)]
struct Args {
    /// Verbose logging on stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "bench_log_compare=debug"
    } else {
        "bench_log_compare=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}

fn run_compare(
    old_files: &[PathBuf],
    new_files: &[PathBuf],
    cfg: &CompareConfig,
    output: Option<&Path>,
) -> Result<()> {
    cfg.validate()?;

    let old: ResultMap = parser::results_from_files(old_files)?;
    let new: ResultMap = parser::results_from_files(new_files)?;
    info!(old = old.len(), new = new.len(), "loaded results");

    let comparator = compare(&old, &new, cfg.delta_threshold);
    let report = ReportFormatter::new(&comparator, cfg).render(cfg.format)?;
    info!(format = cfg.format.as_str(), bytes = report.len(), "rendered report");

    println!("{report}");
    if let Some(path) = output {
        write_file(path, &report)?;
    }
    Ok(())
}

fn run_samples(logs: &[PathBuf], test: Option<&str>, output: Option<&Path>) -> Result<()> {
    let results = parser::results_from_files(logs)?;
    let series: Vec<SampleSeries> = results
        .values()
        .filter(|r| test.map_or(true, |name| r.name == name))
        .filter_map(|r| r.samples.as_ref())
        .map(SampleSeries::from)
        .collect();

    let json = serde_json::to_string_pretty(&series)?;
    if let Some(path) = output {
        write_file(path, &json)?;
    } else {
        println!("{json}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let outcome = match &args.cmd {
        Command::Compare {
            old_file,
            new_file,
            format,
            output,
            changes_only,
            delta_threshold,
            old_branch,
            new_branch,
        } => {
            let cfg = CompareConfig {
                delta_threshold: *delta_threshold,
                changes_only: *changes_only,
                format: *format,
                old_branch: old_branch.clone(),
                new_branch: new_branch.clone(),
            };
            run_compare(old_file, new_file, &cfg, output.as_deref())
        }
        Command::Samples { log, test, output } => {
            run_samples(log, test.as_deref(), output.as_deref())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
