//! Bundled plugin executables.
//!
//! Every plugin speaks the line-delimited JSON-RPC protocol served by
//! [`protei_plugins::server::serve`] and only serves when started with
//! `--serve`:
//!
//! - `protei-plugin-tools`: the builtin `echo` and `math.add` tools;
//! - `protei-plugin-ide`: [`ide_ops`], file tools confined to a root;
//! - `protei-plugin-ideology`: [`ideology`], neutral ideology summaries;
//! - `protei-plugin-strings`: [`strings`], string utilities.

pub mod ide_ops;
pub mod ideology;
pub mod strings;

mod args;
#[cfg(test)]
mod tests;

use std::env;
use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use protei_plugins::PluginMeta;
use protei_plugins::descriptor::SERVE_FLAG;
use protei_plugins::server::{ServeError, ToolError, ToolHandler, serve};
use serde_json::{Number, Value};

/// Name reported in the handshake.
pub const PLUGIN_NAME: &str = "builtin-tools";

/// Tool returning its `text` argument.
pub const TOOL_ECHO: &str = "echo";

/// Tool adding its `a` and `b` arguments.
pub const TOOL_MATH_ADD: &str = "math.add";

/// Handler for the builtin tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolsHandler;

impl ToolHandler for ToolsHandler {
    fn meta(&self) -> PluginMeta {
        PluginMeta::new(
            PLUGIN_NAME,
            env!("CARGO_PKG_VERSION"),
            "rust",
            [TOOL_ECHO, TOOL_MATH_ADD],
        )
    }

    fn invoke(&self, tool: &str, args: &Value) -> Result<Value, ToolError> {
        match tool {
            TOOL_ECHO => Ok(echo(args)),
            TOOL_MATH_ADD => add(args),
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

/// Serves requests with `handler` when `args` contains `--serve`; otherwise
/// returns at once.
///
/// # Errors
///
/// Returns [`ServeError`] when the streams fail.
pub fn run<I, S>(
    args: I,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    handler: &impl ToolHandler,
) -> Result<(), ServeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    if args
        .into_iter()
        .any(|arg| arg.as_ref() == OsStr::new(SERVE_FLAG))
    {
        serve(reader, writer, handler)
    } else {
        Ok(())
    }
}

/// Runs `handler` against the process arguments, stdin and stdout.
///
/// Serve failures are reported on stderr and turn into a failing exit code.
#[must_use]
pub fn serve_stdio(handler: &impl ToolHandler) -> ExitCode {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    match run(env::args_os().skip(1), &mut reader, &mut writer, handler) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(io::stderr().lock(), "{error}").ok();
            ExitCode::FAILURE
        }
    }
}

fn echo(args: &Value) -> Value {
    match args.get("text") {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(Value::String(text)) => Value::String(text.clone()),
        Some(other) => Value::String(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operand {
    Int(i64),
    Float(f64),
}

impl Operand {
    fn read(args: &Value, key: &str) -> Result<Self, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(Self::Int(0)),
            Some(Value::Number(number)) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_f64().map(Self::Float))
                .ok_or_else(|| not_a_number(key, &number.to_string())),
            Some(Value::String(text)) => Self::parse(text.trim())
                .ok_or_else(|| not_a_number(key, text)),
            Some(other) => Err(not_a_number(key, &other.to_string())),
        }
    }

    fn parse(text: &str) -> Option<Self> {
        text.parse::<i64>()
            .map(Self::Int)
            .ok()
            .or_else(|| text.parse::<f64>().ok().map(Self::Float))
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "mixed integer and float addition follows floating-point semantics"
    )]
    const fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

fn not_a_number(key: &str, raw: &str) -> ToolError {
    ToolError::new(format!("argument '{key}' is not a number: {raw}"))
}

fn add(args: &Value) -> Result<Value, ToolError> {
    let a = Operand::read(args, "a")?;
    let b = Operand::read(args, "b")?;
    if let (Operand::Int(left), Operand::Int(right)) = (a, b) {
        return left
            .checked_add(right)
            .map(Value::from)
            .ok_or_else(|| ToolError::new("integer overflow in math.add"));
    }
    float_sum(a.as_f64(), b.as_f64())
}

#[expect(
    clippy::float_arithmetic,
    reason = "math.add sums floating-point operands"
)]
fn float_sum(left: f64, right: f64) -> Result<Value, ToolError> {
    Number::from_f64(left + right)
        .map(Value::Number)
        .ok_or_else(|| ToolError::new("math.add result is not finite"))
}
