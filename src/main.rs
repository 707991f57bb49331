use anyhow::{Context, Result};
use clap::Parser;
use std::{collections::BTreeMap, fs, path::PathBuf, process::ExitCode};
use tablecmp::{
    config::{parse_sheet_arg, RunConfig},
    output::{render, Format, RenderOptions},
    run, FileLoader, RunOptions,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Exit status when at least one pair could not be compared.
const PAIR_FAILED: u8 = 2;
/// Exit status for invalid arguments or configuration.
const USAGE_ERROR: u8 = 1;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Compare CSV/TSV and Excel tables pairwise, column by position"
)]
struct Args {
    /// Source files or glob patterns (at least two in total)
    sources: Vec<String>,
    /// Sheet to read for a workbook, keyed by its file name (repeatable)
    #[arg(short, long = "sheet", value_name = "NAME=SHEET")]
    sheets: Vec<String>,
    /// YAML run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Worker threads (default: one per CPU)
    #[arg(short, long)]
    jobs: Option<usize>,
    #[arg(short, long, value_enum)]
    format: Option<Format>,
    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Discrepancies listed per column in text output
    #[arg(long, default_value_t = 10)]
    max_discrepancies: usize,
}

fn main() -> Result<ExitCode> {
    // ─── 1) init logging (stderr, so stdout carries only the report) ─────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tablecmp=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // help and version are not errors; usage errors exit 1, not clap's 2
            let _ = e.print();
            return Ok(if e.use_stderr() {
                ExitCode::from(USAGE_ERROR)
            } else {
                ExitCode::SUCCESS
            });
        }
    };

    // ─── 2) build the run configuration ──────────────────────────────
    let file_config = match &args.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    let sheets = args
        .sheets
        .iter()
        .map(|s| parse_sheet_arg(s))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    let config = file_config.merge(RunConfig {
        sources: args.sources,
        sheets,
        jobs: args.jobs,
        format: args.format,
    });
    let sources = config.resolve_sources()?;
    info!(sources = sources.len(), "starting comparison");

    // ─── 3) compare ──────────────────────────────────────────────────
    let report = run(&sources, &FileLoader, &RunOptions { jobs: config.jobs });

    // ─── 4) emit ─────────────────────────────────────────────────────
    let rendered = render(
        &report,
        config.format.unwrap_or_default(),
        &RenderOptions {
            max_discrepancies: args.max_discrepancies,
        },
    )?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "wrote report");
        }
        None => print!("{}", rendered),
    }

    if report.has_failures() {
        warn!(failed = report.failures().count(), "some pairs could not be compared");
        return Ok(ExitCode::from(PAIR_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}
