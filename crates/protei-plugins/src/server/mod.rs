//! Plugin-side serve loop.
//!
//! A plugin executable implements [`ToolHandler`] and passes it to [`serve`]
//! together with its stdin and stdout. The loop answers `get_meta`, `invoke`
//! and `shutdown` requests until shutdown or end of input.

use std::io::{BufRead, Write};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::descriptor::PluginMeta;
use crate::protocol::{
    METHOD_GET_META, METHOD_INVOKE, METHOD_SHUTDOWN, RpcRequest, RpcResponse, decode_request,
    encode_line,
};

/// Log target for the serve loop.
const SERVER_TARGET: &str = "protei_plugins::server";

/// Failure reported by a tool; sent back to the caller as an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolError {
    message: String,
}

impl ToolError {
    /// Creates a tool failure with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates the failure reported for a tool the plugin does not provide.
    #[must_use]
    pub fn unknown_tool(tool: &str) -> Self {
        Self::new(format!("Unknown tool: {tool}"))
    }

    /// Returns the failure message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Tool implementation behind a serve loop.
pub trait ToolHandler {
    /// Returns the metadata reported by `get_meta`.
    fn meta(&self) -> PluginMeta;

    /// Runs `tool` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool is unknown or fails.
    fn invoke(&self, tool: &str, args: &Value) -> Result<Value, ToolError>;
}

/// Errors that end the serve loop.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Reading a request failed.
    #[error("failed to read request: {0}")]
    Read(#[source] std::io::Error),
    /// Writing a response failed.
    #[error("failed to write response: {0}")]
    Write(#[source] std::io::Error),
    /// A response could not be serialised.
    #[error("failed to serialise response: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Answers requests from `reader` on `writer` until `shutdown` or end of
/// input.
///
/// Blank and undecodable lines are skipped.
///
/// # Errors
///
/// Returns [`ServeError`] when the streams fail.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
///
/// use protei_plugins::server::{ToolError, ToolHandler, serve};
/// use protei_plugins::PluginMeta;
/// use serde_json::Value;
///
/// struct Noop;
///
/// impl ToolHandler for Noop {
///     fn meta(&self) -> PluginMeta {
///         PluginMeta::new("noop", "1.0.0", "rust", ["noop"])
///     }
///
///     fn invoke(&self, _tool: &str, _args: &Value) -> Result<Value, ToolError> {
///         Ok(Value::Null)
///     }
/// }
///
/// let mut input = Cursor::new("{\"id\":1,\"method\":\"shutdown\",\"params\":{}}\n");
/// let mut output = Vec::new();
/// serve(&mut input, &mut output, &Noop).expect("serve");
/// assert_eq!(
///     String::from_utf8(output).expect("utf-8"),
///     "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":true}\n"
/// );
/// ```
pub fn serve(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    handler: &impl ToolHandler,
) -> Result<(), ServeError> {
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).map_err(ServeError::Read)? == 0 {
            debug!(target: SERVER_TARGET, "input closed");
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buffer);
        let Some(request) = decode_request(&line) else {
            if !line.trim().is_empty() {
                warn!(target: SERVER_TARGET, "skipping undecodable request line");
            }
            continue;
        };

        let response = dispatch(&request, handler);
        let encoded = encode_line(&response).map_err(ServeError::Serialize)?;
        writer
            .write_all(encoded.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(ServeError::Write)?;

        if request.method() == METHOD_SHUTDOWN {
            debug!(target: SERVER_TARGET, "shutdown requested");
            return Ok(());
        }
    }
}

fn dispatch(request: &RpcRequest, handler: &impl ToolHandler) -> RpcResponse {
    let id = request.id();
    match request.method() {
        METHOD_GET_META => match serde_json::to_value(handler.meta()) {
            Ok(meta) => RpcResponse::success(id, meta),
            Err(error) => RpcResponse::failure(id, error.to_string()),
        },
        METHOD_INVOKE => {
            let Some(tool) = request.param("tool").and_then(Value::as_str) else {
                return RpcResponse::failure(id, "Missing tool");
            };
            let args = request
                .param("args")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            debug!(target: SERVER_TARGET, tool, "invoking tool");
            match handler.invoke(tool, &args) {
                Ok(result) => RpcResponse::success(id, result),
                Err(error) => RpcResponse::failure(id, error.message()),
            }
        }
        METHOD_SHUTDOWN => RpcResponse::success(id, Value::Bool(true)),
        other => RpcResponse::failure(id, format!("Unknown method: {other}")),
    }
}
