//! CLI argument definitions for the `protei` tool.

use clap::{Args, Parser, Subcommand};
use protei_config::ConfigArgs;
use protei_stages::StageKind;
use serde_json::{Number, Value};

/// Command-line interface for the Protei plugin orchestrator.
#[derive(Parser, Debug)]
#[command(name = "protei", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Settings shared with configuration files and the environment.
    #[command(flatten)]
    pub(crate) config: ConfigArgs,
    /// The command to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Starts the roster and prints every plugin's metadata.
    ListPlugins,
    /// Starts the roster and invokes one tool.
    Invoke(InvokeArgs),
    /// Runs a prompt through the stage pipeline and the local completion
    /// client.
    Complete(CompleteArgs),
}

/// Arguments for `protei invoke`.
#[derive(Args, Debug, Clone, PartialEq)]
pub(crate) struct InvokeArgs {
    /// Tool name, for example `echo` or `math.add`.
    #[arg(long)]
    pub(crate) tool: String,
    /// Raw JSON arguments passed to the tool.
    #[arg(long, value_name = "JSON")]
    pub(crate) params: Option<String>,
    /// Text for `echo` when `--params` is absent.
    #[arg(long)]
    pub(crate) text: Option<String>,
    /// First operand for `math.add` when `--params` is absent.
    #[arg(long, value_parser = parse_number, allow_negative_numbers = true)]
    pub(crate) a: Option<Number>,
    /// Second operand for `math.add` when `--params` is absent.
    #[arg(long, value_parser = parse_number, allow_negative_numbers = true)]
    pub(crate) b: Option<Number>,
}

/// Arguments for `protei complete`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompleteArgs {
    /// Model name recorded in the completion.
    #[arg(long)]
    pub(crate) model: String,
    /// Prompt text.
    #[arg(long)]
    pub(crate) prompt: String,
    /// Stage to run, in order; repeat for several stages.
    #[arg(long = "stage", value_name = "STAGE")]
    pub(crate) stages: Vec<StageKind>,
    /// JSON object merged into the transformation context.
    #[arg(long, value_name = "JSON")]
    pub(crate) context: Option<String>,
    /// Prints the response token by token instead of as JSON.
    #[arg(long)]
    pub(crate) stream: bool,
}

/// Parses an operand, keeping integers integral.
fn parse_number(raw: &str) -> Result<Number, String> {
    let trimmed = raw.trim();
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Ok(Number::from(integer));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| format!("'{raw}' is not a finite number"))
}

/// Returns the tool arguments used when `--params` is absent.
pub(crate) fn convenience_params(args: &InvokeArgs) -> Value {
    let mut params = serde_json::Map::new();
    match args.tool.as_str() {
        "echo" => {
            if let Some(text) = &args.text {
                params.insert(String::from("text"), Value::String(text.clone()));
            }
        }
        "math.add" => {
            if let (Some(a), Some(b)) = (&args.a, &args.b) {
                params.insert(String::from("a"), Value::Number(a.clone()));
                params.insert(String::from("b"), Value::Number(b.clone()));
            }
        }
        _ => {}
    }
    Value::Object(params)
}
