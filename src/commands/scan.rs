//! `cartograph scan` command.

use std::path::PathBuf;

use crate::config::{Overrides, ScanConfig};
use crate::context::ServiceContext;
use crate::error::Result;
use crate::generation::{Generation, GenerationStore};
use crate::{pipeline, report};

/// Exit code when the scan produced an `error` finding.
pub const EXIT_ERROR_FINDINGS: u8 = 1;

/// Flag values for one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    /// Directory to scan.
    pub root: PathBuf,
    /// Extra ignore globs.
    pub ignore: Vec<String>,
    /// `--max-file-size`.
    pub max_file_size: Option<u64>,
    /// `--out`.
    pub out: Option<PathBuf>,
    /// `--workers`.
    pub workers: Option<usize>,
    /// Suppress the summary.
    pub quiet: bool,
}

/// Execute the `scan` command.
///
/// Runs the pipeline, persists the generation, and prints the text summary
/// unless `quiet`. Returns [`EXIT_ERROR_FINDINGS`] when any finding has
/// `error` severity.
///
/// # Errors
///
/// Returns an error for an unreadable root, bad configuration, or a failed
/// write of the generation.
pub fn run(ctx: &ServiceContext, args: &ScanArgs) -> Result<u8> {
    let generation = scan_and_save(ctx, args)?;
    if !args.quiet {
        println!("{}", report::render_text(&generation));
    }
    Ok(exit_code(&generation))
}

/// Runs the pipeline for `args` and persists the result.
///
/// # Errors
///
/// See [`run`].
pub fn scan_and_save(ctx: &ServiceContext, args: &ScanArgs) -> Result<Generation> {
    let overrides = Overrides {
        ignore: args.ignore.clone(),
        max_file_size: args.max_file_size,
        workers: args.workers,
        out_dir: args.out.clone(),
    };
    let env = |k: &str| std::env::var(k).ok();
    let config = ScanConfig::load(&args.root, ctx.fs.as_ref(), env, &overrides)?;
    let generation = pipeline::run(ctx, &config)?;
    GenerationStore::new(ctx, &config.out_dir).save(&generation)?;
    Ok(generation)
}

/// 0, or [`EXIT_ERROR_FINDINGS`] if any finding is an error.
#[must_use]
pub fn exit_code(generation: &Generation) -> u8 {
    if generation.has_errors() {
        EXIT_ERROR_FINDINGS
    } else {
        0
    }
}
