//! Command-line interface definitions for treedupe.
//!
//! Global options (verbosity, color, error format, config file) apply to
//! every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Compare a handful of files
//! treedupe scan a.bin b.bin c.bin
//!
//! # Walk a directory, JSON output for scripting
//! treedupe scan -r ~/Downloads --output json
//!
//! # Larger, growing reads for big media files
//! treedupe scan -r ~/Videos --chunk-size 64KiB --accelerate --max-chunk 8MiB
//!
//! # Show the merged configuration
//! treedupe config --show
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Incremental duplicate file finder.
///
/// Files of equal length are compared chunk by chunk in a discrimination
/// tree, so a file stops being read as soon as it differs from every other
/// candidate.
#[derive(Debug, Parser)]
#[command(name = "treedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as a JSON object on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicate files among the given paths
    Scan(ScanArgs),
    /// Inspect the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the scan subcommand.
///
/// Options left unset fall back to the configuration file and `TREEDUPE_*`
/// environment variables.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Files (or, with --recursive, directories) to compare
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Expand directory arguments into the files below them
    #[arg(short, long)]
    pub recursive: bool,

    /// Skip hidden files and directories (starting with .) while expanding
    #[arg(long)]
    pub skip_hidden: bool,

    /// Bytes per content read (e.g., 256, 4KiB, 1MB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub chunk_size: Option<u64>,

    /// Grow the read size with tree depth instead of keeping it fixed
    #[arg(long)]
    pub accelerate: bool,

    /// Growth factor per level when accelerating (default: 2)
    #[arg(long, value_name = "N", requires = "accelerate")]
    pub growth_factor: Option<usize>,

    /// Upper bound for accelerated reads (default: 1MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size, requires = "accelerate")]
    pub max_chunk: Option<u64>,

    /// Number of worker threads, one size bucket each (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Fail when a path cannot be opened instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Print the merged configuration as TOML
    #[arg(long, conflicts_with = "path")]
    pub show: bool,

    /// Print the location of the configuration file
    #[arg(long)]
    pub path: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable groups
    #[default]
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use treedupe::cli::parse_size;
///
/// assert_eq!(parse_size("256").unwrap(), 256);
/// assert_eq!(parse_size("4KiB").unwrap(), 4096);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num_str, suffix) = s.split_at(split);
    let suffix = suffix.trim().to_ascii_uppercase();

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1 << 10,
        "MB" | "M" => 1_000_000,
        "MIB" => 1 << 20,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1 << 30,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1 << 40,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
