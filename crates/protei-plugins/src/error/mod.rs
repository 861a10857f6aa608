//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can tell a launch failure from a dead process or a plugin-reported error.
//! I/O errors are wrapped in `Arc` to satisfy the `result_large_err` Clippy
//! lint.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin process operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin process could not be started.
    #[error("plugin '{id}' failed to start: {message}")]
    Launch {
        /// Descriptor id of the plugin.
        id: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The plugin closed its output stream before a correlated response
    /// arrived.
    #[error("plugin '{id}' terminated unexpectedly while handling '{method}'")]
    Terminated {
        /// Descriptor id of the plugin.
        id: String,
        /// Method of the in-flight request.
        method: String,
    },

    /// The plugin answered with an error envelope.
    #[error("plugin '{id}' reported an error: {message}")]
    Remote {
        /// Descriptor id of the plugin.
        id: String,
        /// Message supplied by the plugin.
        message: String,
    },

    /// No registered plugin declares the requested capability.
    #[error("no plugin found that supports tool '{tool}'")]
    UnsupportedTool {
        /// Tool identifier that was requested.
        tool: String,
    },

    /// The plugin did not answer within the configured wait. The process has
    /// been killed.
    #[error("plugin '{id}' did not answer '{method}' within {timeout_ms}ms")]
    Timeout {
        /// Descriptor id of the plugin.
        id: String,
        /// Method of the abandoned request.
        method: String,
        /// Configured wait in milliseconds.
        timeout_ms: u64,
    },

    /// A call was issued on a client whose process is not running.
    #[error("plugin '{id}' is not running")]
    NotRunning {
        /// Descriptor id of the plugin.
        id: String,
    },

    /// An I/O error occurred while writing to the plugin process.
    #[error("I/O error communicating with plugin '{id}': {source}")]
    Io {
        /// Descriptor id of the plugin.
        id: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The request could not be serialised to JSON.
    #[error("failed to serialise plugin request: {0}")]
    SerializeRequest(#[source] serde_json::Error),

    /// The plugin answered with a payload of the wrong shape.
    #[error("plugin '{id}' sent an invalid response: {message}")]
    InvalidResponse {
        /// Descriptor id of the plugin.
        id: String,
        /// Description of the shape violation.
        message: String,
    },

    /// A plugin descriptor failed validation.
    #[error("descriptor error: {message}")]
    Descriptor {
        /// Description of the validation failure.
        message: String,
    },
}

impl PluginError {
    /// Returns the descriptor id of the plugin involved, when there is one.
    #[must_use]
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            Self::Launch { id, .. }
            | Self::Terminated { id, .. }
            | Self::Remote { id, .. }
            | Self::Timeout { id, .. }
            | Self::NotRunning { id }
            | Self::Io { id, .. }
            | Self::InvalidResponse { id, .. } => Some(id.as_str()),
            Self::UnsupportedTool { .. } | Self::SerializeRequest(_) | Self::Descriptor { .. } => {
                None
            }
        }
    }
}
