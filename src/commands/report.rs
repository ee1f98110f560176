//! `cartograph report` command.

use std::path::Path;

use crate::cli::ReportFormat;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::generation::GenerationStore;
use crate::report::{render_json, render_text};

/// Execute the `report` command: print a stored generation's report.
///
/// # Errors
///
/// Returns [`crate::error::CartographError::State`] or
/// [`crate::error::CartographError::UnknownGeneration`] when the generation
/// cannot be found.
pub fn run(
    ctx: &ServiceContext,
    out: &Path,
    generation: &str,
    format: ReportFormat,
) -> Result<u8> {
    println!("{}", render(ctx, out, generation, format)?);
    Ok(0)
}

/// Loads `generation` from `out` and renders it.
///
/// # Errors
///
/// See [`run`].
pub fn render(
    ctx: &ServiceContext,
    out: &Path,
    generation: &str,
    format: ReportFormat,
) -> Result<String> {
    let generation = GenerationStore::new(ctx, out).load(generation)?;
    match format {
        ReportFormat::Text => Ok(render_text(&generation)),
        ReportFormat::Json => render_json(&generation),
    }
}
