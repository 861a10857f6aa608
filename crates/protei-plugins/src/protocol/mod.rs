//! Wire codec for the orchestrator-plugin protocol.
//!
//! The protocol is newline-delimited JSON-RPC 2.0 over stdio. The orchestrator
//! writes one [`RpcRequest`] line to the plugin's stdin and reads
//! [`RpcResponse`] lines from its stdout. Lines that do not decode are noise
//! and are skipped by readers on both sides; plugins are expected to send
//! their diagnostics to stderr.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Protocol version carried in every record.
pub const JSONRPC_VERSION: &str = "2.0";

/// Handshake method returning the plugin's [`PluginMeta`](crate::PluginMeta).
pub const METHOD_GET_META: &str = "get_meta";

/// Tool invocation method; params are `{tool, args}`.
pub const METHOD_INVOKE: &str = "invoke";

/// Shutdown method; the plugin answers `true` and exits.
pub const METHOD_SHUTDOWN: &str = "shutdown";

fn default_version() -> String {
    JSONRPC_VERSION.to_owned()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Request sent from the orchestrator to a plugin on stdin.
///
/// # Example
///
/// ```
/// use protei_plugins::protocol::{RpcRequest, encode_line};
/// use serde_json::Map;
///
/// let request = RpcRequest::new(1, "get_meta", Map::new());
/// let line = encode_line(&request).expect("request encodes");
/// assert_eq!(
///     line,
///     "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"get_meta\",\"params\":{}}\n"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "default_version")]
    jsonrpc: String,
    id: i64,
    method: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    params: Map<String, Value>,
}

impl RpcRequest {
    /// Creates a request with the given id, method, and parameters.
    #[must_use]
    pub fn new(id: i64, method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Returns the request id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Returns the method name.
    #[must_use]
    pub const fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Returns the parameter object.
    #[must_use]
    pub const fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Looks up a single parameter, treating JSON `null` as absent.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|value| !value.is_null())
    }
}

/// Response sent from a plugin to the orchestrator on stdout.
///
/// Decoding tolerates a missing `jsonrpc` member; the `id` must be an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default = "default_version")]
    jsonrpc: String,
    id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    /// Creates a success response carrying `result`.
    #[must_use]
    pub fn success(id: i64, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates a failure response carrying an error envelope.
    #[must_use]
    pub fn failure(id: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(RpcError::new(message)),
        }
    }

    /// Returns the id of the request this response answers.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Returns the result value; `None` when absent or `null`.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error envelope, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    /// Splits the response into its outcome. A missing result reads as
    /// `null`.
    ///
    /// # Errors
    ///
    /// Returns the [`RpcError`] envelope when the plugin reported a failure.
    pub fn into_outcome(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Error envelope carried by a failure response.
///
/// Plugins are expected to send `{"message": "..."}`. A bare string body is
/// taken as the message and any other JSON value is kept in its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct RpcError {
    message: String,
}

impl RpcError {
    /// Creates an error envelope with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the plugin-supplied message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl From<Value> for RpcError {
    fn from(value: Value) -> Self {
        let message = match &value {
            Value::String(text) => text.clone(),
            Value::Object(fields) => fields
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| value.to_string(), str::to_owned),
            _ => value.to_string(),
        };
        Self { message }
    }
}

/// Serialises a protocol record as one newline-terminated line.
///
/// # Errors
///
/// Returns the `serde_json` error if the record cannot be serialised.
pub fn encode_line<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}

/// Decodes a response line, returning `None` for anything that is not a
/// well-formed response record.
#[must_use]
pub fn decode_response(line: &str) -> Option<RpcResponse> {
    decode(line)
}

/// Decodes a request line, returning `None` for anything that is not a
/// well-formed request record.
#[must_use]
pub fn decode_request(line: &str) -> Option<RpcRequest> {
    decode(line)
}

fn decode<T: for<'de> Deserialize<'de>>(line: &str) -> Option<T> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
