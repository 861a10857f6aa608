//! Binary entrypoint for the builtin tools plugin.

use std::process::ExitCode;

use protei_plugin_tools::{ToolsHandler, serve_stdio};

fn main() -> ExitCode {
    serve_stdio(&ToolsHandler)
}
