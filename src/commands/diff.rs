//! `cartograph diff` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::error::Result;
use crate::generation::diff::{diff_generations, format_diff};
use crate::generation::GenerationStore;

/// Execute the `diff` command: print what changed between two generations.
///
/// # Errors
///
/// Returns a state error when either reference does not resolve.
pub fn run(ctx: &ServiceContext, out: &Path, from: &str, to: &str) -> Result<u8> {
    println!("{}", render(ctx, out, from, to)?);
    Ok(0)
}

/// Loads both generations and formats their diff.
///
/// # Errors
///
/// See [`run`].
pub fn render(ctx: &ServiceContext, out: &Path, from: &str, to: &str) -> Result<String> {
    let store = GenerationStore::new(ctx, out);
    let old = store.load(from)?;
    let new = store.load(to)?;
    Ok(format_diff(&diff_generations(&old, &new)))
}
