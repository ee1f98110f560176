//! Core library entry for the `cartograph` CLI.
//!
//! The pipeline walks a source tree, extracts structural facts per file,
//! infers relationships, flags anti-patterns, and synthesizes a deployment
//! topology. [`pipeline::run`] is the library entry; [`run`] wraps it in the
//! command line.

pub mod adapters;
pub mod capability;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod extract;
pub mod generation;
pub mod infer;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod ports;
pub mod report;
pub mod scan;
pub mod store;
pub mod synth;
pub mod walker;

use clap::Parser;

use crate::context::ServiceContext;

/// Run the CLI with the provided arguments and return the exit code.
///
/// Loads `.env` from the working directory, installs the log subscriber, and
/// dispatches. Argument errors print clap's message and return clap's code.
pub fn run<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return u8::try_from(err.exit_code()).unwrap_or(2);
        }
    };

    dotenvy::dotenv().ok();
    logging::init(cli.verbose);

    let ctx = ServiceContext::live();
    match commands::dispatch(&ctx, &cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}
