//! Error types for the CLI runtime.

use std::io;

use protei_config::ConfigError;
use protei_plugins::PluginError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("--params is not valid JSON: {0}")]
    InvalidParams(serde_json::Error),
    #[error("--context must be a JSON object: {message}")]
    InvalidContext { message: String },
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(#[from] io::Error),
}
