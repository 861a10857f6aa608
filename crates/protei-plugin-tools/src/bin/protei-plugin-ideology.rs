//! Binary entrypoint for the ideology summaries plugin.

use std::process::ExitCode;

use protei_plugin_tools::ideology::IdeologyHandler;
use protei_plugin_tools::serve_stdio;

fn main() -> ExitCode {
    serve_stdio(&IdeologyHandler)
}
