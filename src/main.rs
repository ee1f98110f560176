//! Binary entrypoint for the `cartograph` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    ExitCode::from(cartograph::run(std::env::args_os()))
}
