//! Unit tests for command execution against in-memory plugins.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use protei_plugins::{PluginClient, PluginError, PluginMeta};
use protei_stages::StageKind;
use rstest::{fixture, rstest};
use serde_json::Number;

use super::*;

/// Launches clients that declare their command words as capabilities and
/// answer every invocation with the tool name and arguments.
#[derive(Default)]
struct EchoLauncher {
    stops: Arc<AtomicUsize>,
}

struct EchoClient {
    id: String,
    capabilities: Vec<String>,
    stops: Arc<AtomicUsize>,
}

impl PluginLauncher for EchoLauncher {
    type Client = EchoClient;

    fn prepare(&self, descriptor: &PluginDescriptor, command: Vec<String>) -> Self::Client {
        EchoClient {
            id: descriptor.id().to_owned(),
            capabilities: command,
            stops: Arc::clone(&self.stops),
        }
    }
}

impl PluginClient for EchoClient {
    fn start(&self) -> Result<(), PluginError> {
        if self.capabilities.iter().any(|word| word == "broken") {
            return Err(PluginError::Launch {
                id: self.id.clone(),
                message: String::from("refusing to start"),
                source: None,
            });
        }
        Ok(())
    }

    fn fetch_meta(&self) -> Result<PluginMeta, PluginError> {
        Ok(PluginMeta::new(
            self.id.clone(),
            "1.0.0",
            "test",
            self.capabilities.clone(),
        ))
    }

    fn invoke(&self, tool: &str, args: Value) -> Result<Value, PluginError> {
        Ok(json!({ "plugin": self.id, "tool": tool, "args": args }))
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn process(id: &str, words: &[&str]) -> PluginDescriptor {
    PluginDescriptor::process(id, words.iter().map(|word| (*word).to_owned()).collect())
}

#[fixture]
fn orchestrator() -> Orchestrator<EchoLauncher> {
    Orchestrator::with_launcher(EchoLauncher::default())
}

fn invoke_args(tool: &str) -> InvokeArgs {
    InvokeArgs {
        tool: tool.to_owned(),
        params: None,
        text: None,
        a: None,
        b: None,
    }
}

fn output_json(buffer: &[u8]) -> Value {
    serde_json::from_slice(buffer).expect("command output is JSON")
}

#[rstest]
fn list_plugins_prints_metadata_in_roster_order(mut orchestrator: Orchestrator<EchoLauncher>) {
    let roster = [process("first", &["echo"]), process("second", &["math.add"])];
    let mut out = Vec::new();
    with_roster(&mut orchestrator, &roster, |running| {
        list_plugins(running, &mut out)
    })
    .expect("list succeeds");

    let listed = output_json(&out);
    assert_eq!(
        listed,
        json!([
            {"name": "first", "version": "1.0.0", "language": "test", "capabilities": ["echo"]},
            {"name": "second", "version": "1.0.0", "language": "test", "capabilities": ["math.add"]},
        ])
    );
}

#[rstest]
fn plugins_are_stopped_after_the_command() {
    let launcher = EchoLauncher::default();
    let stops = Arc::clone(&launcher.stops);
    let mut orchestrator = Orchestrator::with_launcher(launcher);
    let roster = [process("a", &["echo"]), process("b", &["math.add"])];
    with_roster(&mut orchestrator, &roster, |_| Ok(())).expect("action succeeds");
    assert_eq!(stops.load(Ordering::SeqCst), 2);
    assert!(orchestrator.plugin_ids().is_empty());
}

#[rstest]
fn plugins_are_stopped_when_the_action_fails(mut orchestrator: Orchestrator<EchoLauncher>) {
    let roster = [process("a", &["echo"])];
    let error = with_roster(&mut orchestrator, &roster, |running| {
        invoke(running, &invoke_args("missing.tool"), &mut Vec::new())
    })
    .expect_err("unknown tool must fail");
    assert!(matches!(
        error,
        AppError::Plugin(PluginError::UnsupportedTool { .. })
    ));
    assert!(orchestrator.plugin_ids().is_empty());
}

#[rstest]
fn mandatory_start_failure_skips_the_action(mut orchestrator: Orchestrator<EchoLauncher>) {
    let roster = [process("ok", &["echo"]), process("bad", &["broken"])];
    let mut ran = false;
    let error = with_roster(&mut orchestrator, &roster, |_| {
        ran = true;
        Ok(())
    })
    .expect_err("start must fail");
    assert!(!ran);
    assert!(matches!(error, AppError::Plugin(PluginError::Launch { .. })));
    assert!(orchestrator.plugin_ids().is_empty());
}

#[rstest]
#[case::echo_text(
    InvokeArgs { text: Some(String::from("hi")), ..invoke_args("echo") },
    json!({"text": "hi"})
)]
#[case::math_operands(
    InvokeArgs { a: Some(Number::from(2)), b: Some(Number::from(3)), ..invoke_args("math.add") },
    json!({"a": 2, "b": 3})
)]
#[case::math_missing_operand(
    InvokeArgs { a: Some(Number::from(2)), ..invoke_args("math.add") },
    json!({})
)]
#[case::raw_params(
    InvokeArgs { params: Some(String::from(r#"{"text": "raw"}"#)), text: Some(String::from("ignored")), ..invoke_args("echo") },
    json!({"text": "raw"})
)]
fn invoke_builds_tool_arguments(
    mut orchestrator: Orchestrator<EchoLauncher>,
    #[case] args: InvokeArgs,
    #[case] expected: Value,
) {
    let roster = [process("tools", &["echo", "math.add"])];
    let mut out = Vec::new();
    with_roster(&mut orchestrator, &roster, |running| {
        invoke(running, &args, &mut out)
    })
    .expect("invoke succeeds");

    let printed = output_json(&out);
    assert_eq!(printed["result"]["args"], expected);
    assert_eq!(printed["result"]["plugin"], json!("tools"));
}

#[rstest]
fn invalid_params_are_reported(mut orchestrator: Orchestrator<EchoLauncher>) {
    let roster = [process("tools", &["echo"])];
    let args = InvokeArgs {
        params: Some(String::from("{not json")),
        ..invoke_args("echo")
    };
    let error = with_roster(&mut orchestrator, &roster, |running| {
        invoke(running, &args, &mut Vec::new())
    })
    .expect_err("bad params must fail");
    assert!(matches!(error, AppError::InvalidParams(_)));
}

fn complete_args(stages: Vec<StageKind>) -> CompleteArgs {
    CompleteArgs {
        model: String::from("m"),
        prompt: String::from("Plan the sprint"),
        stages,
        context: None,
        stream: false,
    }
}

#[rstest]
fn complete_prints_completion_json() {
    let mut out = Vec::new();
    complete(&complete_args(Vec::new()), &mut out).expect("complete succeeds");
    assert_eq!(
        output_json(&out),
        json!({"model": "m", "prompt": "Plan the sprint", "text": "Echo (model=m): Plan the sprint"})
    );
}

#[rstest]
fn complete_streams_tokens() {
    let args = CompleteArgs {
        stream: true,
        ..complete_args(Vec::new())
    };
    let mut out = Vec::new();
    complete(&args, &mut out).expect("complete succeeds");
    assert_eq!(
        String::from_utf8(out).expect("utf-8 output"),
        "Echo (model=m): Plan the sprint \n"
    );
}

#[rstest]
fn complete_applies_context_to_stages() {
    let args = CompleteArgs {
        context: Some(String::from(r#"{"gamedev": {"engine": "Bevy"}}"#)),
        ..complete_args(vec![StageKind::GameDev])
    };
    let mut out = Vec::new();
    complete(&args, &mut out).expect("complete succeeds");
    assert_eq!(
        output_json(&out)["prompt"],
        json!("[GameDev Context] Engine: Bevy\nPlan the sprint")
    );
}

#[rstest]
#[case::not_json("{oops")]
#[case::not_object("[1, 2]")]
fn invalid_context_is_rejected(#[case] raw: &str) {
    let error = completion_context(Some(raw)).expect_err("context must fail");
    assert!(matches!(error, AppError::InvalidContext { .. }));
}
