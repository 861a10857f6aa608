//! String utilities.


use protei_plugins::PluginMeta;
use protei_plugins::server::{ToolError, ToolHandler};
use serde_json::Value;

use crate::args::text;

/// Name reported in the handshake.
pub const PLUGIN_NAME: &str = "strings";

/// Tool reversing its `text` argument.
pub const TOOL_REVERSE: &str = "string.reverse";

/// Handler for the string tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringsHandler;

impl ToolHandler for StringsHandler {
    fn meta(&self) -> PluginMeta {
        PluginMeta::new(
            PLUGIN_NAME,
            env!("CARGO_PKG_VERSION"),
            "rust",
            [TOOL_REVERSE],
        )
    }

    fn invoke(&self, tool: &str, args: &Value) -> Result<Value, ToolError> {
        match tool {
            TOOL_REVERSE => Ok(Value::String(reverse(args))),
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

/// Reverses `text` by Unicode scalar value. `false` and `null` count as
/// empty.
fn reverse(args: &Value) -> String {
    if args.get("text") == Some(&Value::Bool(false)) {
        return String::new();
    }
    text(args, "text")
        .map(|value| value.chars().rev().collect())
        .unwrap_or_default()
}
