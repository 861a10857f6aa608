//! Command implementations.
//!
//! Plugin commands run against an [`Orchestrator`] that is always stopped
//! before the command returns, whether or not it succeeded.

use std::io::Write;

use protei_plugins::{Orchestrator, PluginDescriptor, PluginLauncher, TransformationContext};
use protei_stages::{CompletionClient, pipeline_from};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::cli::{CompleteArgs, InvokeArgs, convenience_params};
use crate::errors::AppError;

/// Log target for command execution.
const COMMAND_TARGET: &str = "protei_cli::commands";

/// Starts `roster`, runs `action`, then stops every plugin.
pub(crate) fn with_roster<L, T, F>(
    orchestrator: &mut Orchestrator<L>,
    roster: &[PluginDescriptor],
    action: F,
) -> Result<T, AppError>
where
    L: PluginLauncher,
    F: FnOnce(&Orchestrator<L>) -> Result<T, AppError>,
{
    let outcome = orchestrator
        .start(roster)
        .map_err(AppError::from)
        .and_then(|outcomes| {
            debug!(
                target: COMMAND_TARGET,
                started = outcomes.iter().filter(|outcome| outcome.is_started()).count(),
                requested = roster.len(),
                "roster started"
            );
            action(orchestrator)
        });
    orchestrator.stop();
    outcome
}

/// Prints the metadata of every running plugin as a JSON array.
pub(crate) fn list_plugins<L, W>(
    orchestrator: &Orchestrator<L>,
    out: &mut W,
) -> Result<(), AppError>
where
    L: PluginLauncher,
    W: Write,
{
    write_json(out, &orchestrator.list_plugins())
}

/// Invokes the requested tool and prints `{"result": ...}`.
pub(crate) fn invoke<L, W>(
    orchestrator: &Orchestrator<L>,
    args: &InvokeArgs,
    out: &mut W,
) -> Result<(), AppError>
where
    L: PluginLauncher,
    W: Write,
{
    let params = match &args.params {
        Some(raw) => serde_json::from_str(raw).map_err(AppError::InvalidParams)?,
        None => convenience_params(args),
    };
    let result = orchestrator.invoke(&args.tool, params)?;
    write_json(out, &json!({ "result": result }))
}

/// Runs the local completion client through the selected stages.
pub(crate) fn complete<W: Write>(args: &CompleteArgs, out: &mut W) -> Result<(), AppError> {
    let client = CompletionClient::new(pipeline_from(&args.stages));
    let mut context = completion_context(args.context.as_deref())?;

    if args.stream {
        for token in client.stream_with_context(&args.model, &args.prompt, &mut context) {
            out.write_all(token.as_bytes())?;
            out.flush()?;
        }
        writeln!(out)?;
        return Ok(());
    }

    let completion = client.create_with_context(&args.model, &args.prompt, &mut context);
    write_json(out, &completion)
}

/// Builds a transformation context from an optional JSON object.
pub(crate) fn completion_context(raw: Option<&str>) -> Result<TransformationContext, AppError> {
    let mut context = TransformationContext::new();
    let Some(text) = raw else {
        return Ok(context);
    };
    let value: Value = serde_json::from_str(text).map_err(|error| AppError::InvalidContext {
        message: error.to_string(),
    })?;
    let entries = match value {
        Value::Object(entries) => entries,
        other => {
            return Err(AppError::InvalidContext {
                message: format!("expected an object, found {other}"),
            });
        }
    };
    for (key, entry) in entries {
        context.insert(key, entry);
    }
    Ok(context)
}

fn write_json<W, T>(out: &mut W, value: &T) -> Result<(), AppError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut *out, value).map_err(AppError::SerialiseOutput)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests;
