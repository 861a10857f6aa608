//! Readers for loosely typed tool arguments.

use protei_plugins::server::ToolError;
use serde_json::Value;

/// Returns `key` as text, rendering scalars other than strings and treating
/// `null` as absent.
pub(crate) fn text(args: &Value, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::Null => None,
        Value::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

/// Returns `key` as trimmed text, failing with `'<key>' is required` when it
/// is absent or blank.
pub(crate) fn required_text(args: &Value, key: &str) -> Result<String, ToolError> {
    text(args, key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::new(format!("'{key}' is required")))
}

/// Returns `key` as a boolean, or `default` when it is absent or not a
/// boolean.
pub(crate) fn flag(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Returns `key` as a count, accepting non-negative integers and numeric
/// strings.
pub(crate) fn limit(args: &Value, key: &str, default: usize) -> Result<usize, ToolError> {
    let parsed = match args.get(key) {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|value| usize::try_from(value).ok()),
        Some(Value::String(raw)) => raw.trim().parse::<usize>().ok(),
        Some(_) => None,
    };
    parsed.ok_or_else(|| {
        ToolError::new(format!("argument '{key}' must be a non-negative integer"))
    })
}
