use anyhow::Result;
use chrono::TimeDelta;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use excel_marker::batch;
use excel_marker::config::{self, DEFAULT_CONVERTER, DEFAULT_WINDOW_HOURS, RunConfig};
use excel_marker::convert::{ConversionSession, LegacyMode};
use excel_marker::history::ProcessedLog;
use excel_marker::marking::Selector;
use excel_marker::report;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Excel file or folder of Excel files (defaults to the current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Rule selector from 1 to 6; prompted for when omitted
    #[arg(long, short = 'n')]
    selector: Option<Selector>,

    /// Output folder (defaults to an "output" folder on the desktop)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Folder holding the processed-file log
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Hours a processed file stays in the log after the last run
    #[arg(long, default_value_t = DEFAULT_WINDOW_HOURS)]
    window_hours: u32,

    /// How legacy .xls workbooks are handled
    #[arg(long, value_enum, default_value_t = LegacyMode::Native)]
    legacy: LegacyMode,

    /// Office converter used with --legacy external
    #[arg(long, default_value = DEFAULT_CONVERTER)]
    converter: PathBuf,

    /// Print the run report as JSON to stdout
    #[arg(long, short = 'j')]
    json: bool,

    /// Also write the JSON run report to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let selector = match cli.selector {
        Some(selector) => selector,
        None if std::io::stdin().is_terminal() => {
            config::prompt_selector(std::io::stdin().lock(), std::io::stderr())?
        }
        None => anyhow::bail!("No selector given: pass --selector <1-6>"),
    };

    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => config::default_state_dir()?,
    };

    let mut run = RunConfig::new(cli.path, selector, state_dir);
    if let Some(output) = cli.output {
        run.output_dir = output;
    }
    run.window = TimeDelta::hours(i64::from(cli.window_hours));
    run.legacy = cli.legacy;
    run.converter = cli.converter;

    let mut log = ProcessedLog::load(&run.state_dir, run.window)?;
    let mut session = ConversionSession::acquire(run.legacy, &run.converter)?;

    let result = batch::run_batch(&run, &mut session, &mut log);
    drop(session);
    let batch_report = result?;

    if let Some(path) = &cli.report {
        report::write_json_to_file(&batch_report, path)?;
    }

    if cli.json {
        println!("{}", report::serialize_to_json(&batch_report)?);
        return Ok(());
    }

    let summary = batch_report.summary();
    println!(
        "Selector {}: {} saved, {} unchanged, {} failed, {} skipped (already processed)",
        selector, summary.saved, summary.unchanged, summary.failed, summary.skipped
    );
    for file in batch_report.failures() {
        println!("  failed: {}", file.path.display());
    }
    println!("Output folder: {}", batch_report.output_dir.display());

    Ok(())
}
