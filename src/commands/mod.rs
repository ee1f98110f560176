//! Command dispatch and handlers.
//!
//! Every handler returns the process exit code on success; errors are
//! mapped to a code by [`crate::error::CartographError::exit_code`].

pub mod diff;
pub mod report;
pub mod scan;

use crate::cli::Command;
use crate::context::ServiceContext;
use crate::error::Result;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns whatever the selected handler fails with.
pub fn dispatch(ctx: &ServiceContext, command: &Command) -> Result<u8> {
    match command {
        Command::Scan {
            root,
            ignore,
            max_file_size,
            out,
            workers,
            quiet,
        } => {
            let args = scan::ScanArgs {
                root: root.clone(),
                ignore: ignore.clone(),
                max_file_size: *max_file_size,
                out: out.clone(),
                workers: *workers,
                quiet: *quiet,
            };
            scan::run(ctx, &args)
        }
        Command::Report {
            format,
            out,
            generation,
        } => report::run(ctx, out, generation, *format),
        Command::Diff { from, to, out } => diff::run(ctx, out, from, to),
    }
}
