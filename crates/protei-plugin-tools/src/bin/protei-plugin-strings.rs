//! Binary entrypoint for the string utilities plugin.

use std::process::ExitCode;

use protei_plugin_tools::serve_stdio;
use protei_plugin_tools::strings::StringsHandler;

fn main() -> ExitCode {
    serve_stdio(&StringsHandler)
}
