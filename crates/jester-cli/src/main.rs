//! Binary entrypoint for the Jester command client.
//!
//! Delegates to [`jester_cli::run`], which loads configuration, launches the
//! game and runs the interactive command loop on stdin.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    jester_cli::run(
        std::env::args_os(),
        &mut input,
        &mut io::stdout(),
        &mut io::stderr(),
    )
}
