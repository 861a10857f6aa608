//! Binary entrypoint for the workspace file tools plugin.

use std::process::ExitCode;

use protei_plugin_tools::ide_ops::IdeOpsHandler;
use protei_plugin_tools::serve_stdio;

fn main() -> ExitCode {
    serve_stdio(&IdeOpsHandler::default())
}
