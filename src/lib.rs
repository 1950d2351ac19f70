//! treedupe - Incremental Duplicate File Finder
//!
//! Candidates are first bucketed by length. Within a bucket, each file is
//! inserted into a discrimination tree that reads it one chunk at a time and
//! stops as soon as the file's prefix is unique, so files that differ early
//! cost a single small read. Only true duplicates are read to the end.
//!
//! The core ([`duplicates`]) works on any [`source::ChunkSource`]; the
//! binary wires it to opened files ([`scanner`]) and output formatters
//! ([`output`]) through [`run_app`].

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod source;

use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cli::{Cli, Commands, ConfigArgs, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::DuplicateFinder;
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::scanner::{open_candidates, WalkerConfig};

/// Run the application for parsed command-line arguments.
///
/// Results go to stdout; logs, progress and warnings go to stderr.
///
/// # Errors
///
/// Returns an error if configuration is invalid, a path cannot be opened in
/// strict mode, classification fails, or output cannot be written. Use
/// [`ExitCode::for_error`] to map it to a process exit code.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let Cli {
        verbose,
        quiet,
        no_color,
        config,
        command,
        ..
    } = cli;

    logging::init_logging(verbose, quiet);

    match command {
        Commands::Scan(args) => run_scan(&args, config.as_deref(), quiet, no_color),
        Commands::Config(args) => run_config(&args, config.as_deref()),
    }
}

fn run_scan(
    args: &ScanArgs,
    config_path: Option<&Path>,
    quiet: bool,
    no_color: bool,
) -> Result<ExitCode> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    config.apply_scan_args(args);
    let finder_config = config
        .finder_config()
        .context("Invalid classification settings")?;

    let interrupt = signal::arm();

    let walker_config = WalkerConfig {
        recursive: config.recursive,
        skip_hidden: config.skip_hidden,
    };
    let mut opened = open_candidates(&args.paths, &walker_config, Some(interrupt.flag()))
        .context("Failed to collect input files")?;

    if config.strict {
        if let Some(first) = opened.skipped.first() {
            bail!(
                "{} path(s) could not be opened; first failure: {}",
                opened.skipped.len(),
                first
            );
        }
    }

    let progress = Arc::new(Progress::new(quiet || args.no_progress));
    let finder = DuplicateFinder::new(
        finder_config
            .with_shutdown_flag(interrupt.flag())
            .with_progress_callback(progress),
    );

    let paths = opened.paths();
    let (groups, summary) = finder.classify(&mut opened.candidates).map_err(|err| {
        let context = match err.candidate().and_then(|index| paths.get(index)) {
            Some(path) => format!("Failed to classify {}", path.display()),
            None => "Classification failed".to_string(),
        };
        anyhow::Error::new(err).context(context)
    })?;
    let skipped = opened.skipped.len();
    drop(opened);

    log::info!(
        "Found {} duplicate groups; read {} of {} bytes ({:.1}%) in {:?}",
        summary.duplicate_groups,
        summary.bytes_read,
        summary.total_size,
        summary.read_percentage(),
        summary.scan_duration
    );

    let stdout = io::stdout();
    let color = !no_color && stdout.is_terminal();
    let mut out = stdout.lock();
    match config.output {
        OutputFormat::Text => TextOutput::new(&groups, &paths, &summary)
            .with_color(color)
            .write_to(&mut out)
            .context("Failed to write output")?,
        OutputFormat::Json => JsonOutput::new(&groups, &paths, &summary)
            .write_to(&mut out, true)
            .context("Failed to write JSON output")?,
        OutputFormat::Csv => CsvOutput::new(&groups, &paths)
            .write_to(&mut out)
            .context("Failed to write CSV output")?,
    }
    out.flush().context("Failed to write output")?;

    Ok(if skipped > 0 {
        ExitCode::PartialSuccess
    } else if groups.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    })
}

fn run_config(args: &ConfigArgs, config_path: Option<&Path>) -> Result<ExitCode> {
    let mut out = io::stdout().lock();

    if args.path {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => Config::config_path().context("Failed to locate config file")?,
        };
        writeln!(out, "{}", path.display()).context("Failed to write output")?;
    } else {
        let config = Config::load(config_path).context("Failed to load configuration")?;
        let rendered = config.to_toml().context("Failed to render configuration")?;
        write!(out, "{}", rendered).context("Failed to write output")?;
    }

    Ok(ExitCode::Success)
}
