//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_OUT_DIR;
use crate::generation::store::{LATEST, PREVIOUS};

/// Top-level CLI parser for `cartograph`.
#[derive(Debug, Parser)]
#[command(
    name = "cartograph",
    version,
    about = "Discover a source tree's structure and synthesize a deployment topology"
)]
pub struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a tree, persist a new generation, and print a summary.
    Scan {
        /// Directory to scan.
        root: PathBuf,
        /// Extra ignore globs (comma-separated or repeated).
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,
        /// Skip files larger than this many bytes.
        #[arg(long, value_name = "BYTES")]
        max_file_size: Option<u64>,
        /// Output directory for generations and artifacts.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Extraction worker threads.
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Do not print the summary.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Re-emit the report of a stored generation without scanning.
    Report {
        /// Output format.
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        /// Output directory holding generations.
        #[arg(long, value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
        out: PathBuf,
        /// Generation id, unique prefix, `latest`, or `previous`.
        #[arg(long, default_value = LATEST)]
        generation: String,
    },
    /// Show what changed between two stored generations.
    Diff {
        /// Older generation.
        #[arg(default_value = PREVIOUS)]
        from: String,
        /// Newer generation.
        #[arg(default_value = LATEST)]
        to: String,
        /// Output directory holding generations.
        #[arg(long, value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
        out: PathBuf,
    },
}

/// Rendering for `report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Condensed human summary.
    Text,
    /// Full structured document.
    Json,
}
