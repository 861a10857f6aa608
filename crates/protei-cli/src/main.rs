//! Entry point for the `protei` command-line tool.
//!
//! The binary delegates to [`protei_cli::run`], which parses arguments,
//! installs telemetry, and executes one command against the plugin roster or
//! the local completion client.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    protei_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
