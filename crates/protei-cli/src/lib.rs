//! Command-line runtime for the Protei plugin orchestrator.
//!
//! The runtime parses arguments, installs telemetry, loads the plugin roster
//! and executes one command. It writes command output to the supplied stdout
//! handle and diagnostics to the supplied stderr handle, so tests can drive
//! it with in-memory buffers.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use protei_plugins::{Orchestrator, PluginDescriptor};
use tracing::debug;

mod cli;
mod commands;
mod errors;
mod telemetry;

use cli::{Cli, CliCommand};
use errors::AppError;

/// Log target for the CLI runtime.
const CLI_TARGET: &str = "protei_cli";

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            write!(stdout, "{error}").ok();
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            write!(stderr, "{}", AppError::CliUsage(error)).ok();
            return ExitCode::FAILURE;
        }
    };

    match execute(&cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(stderr, "{error}").ok();
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(cli: &Cli, stdout: &mut W) -> Result<(), AppError> {
    telemetry::initialise(&cli.config)?;
    debug!(target: CLI_TARGET, command = ?cli.command, "executing command");

    match &cli.command {
        CliCommand::Complete(args) => commands::complete(args, stdout),
        CliCommand::ListPlugins => {
            let (mut orchestrator, roster) = prepare(cli)?;
            commands::with_roster(&mut orchestrator, &roster, |running| {
                commands::list_plugins(running, stdout)
            })
        }
        CliCommand::Invoke(args) => {
            let (mut orchestrator, roster) = prepare(cli)?;
            commands::with_roster(&mut orchestrator, &roster, |running| {
                commands::invoke(running, args, stdout)
            })
        }
    }
}

fn prepare(cli: &Cli) -> Result<(Orchestrator, Vec<PluginDescriptor>), AppError> {
    let roster = cli.config.roster()?;
    let orchestrator = cli.config.builtin_command().map_or_else(Orchestrator::new, |command| {
        Orchestrator::new().with_builtin_command(command)
    });
    Ok((orchestrator, roster))
}
