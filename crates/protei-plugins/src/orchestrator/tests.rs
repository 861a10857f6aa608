//! Unit tests for roster start-up and routing.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::tests::{StubBehaviour, StubLauncher, stub_meta};

fn builtin_command() -> Vec<String> {
    vec![String::from("/opt/protei/tools"), String::from("--serve")]
}

#[fixture]
fn launcher() -> StubLauncher {
    StubLauncher::default()
        .with_plugin(
            "tools",
            StubBehaviour::Serve(stub_meta("builtin-tools", &["echo", "math.add"])),
        )
        .with_plugin(
            "node",
            StubBehaviour::Serve(stub_meta("node-basic", &["string.reverse", "echo"])),
        )
        .with_plugin("broken", StubBehaviour::FailLaunch)
        .with_plugin("mute", StubBehaviour::FailHandshake)
        .with_plugin("bare", StubBehaviour::Serve(stub_meta("bare", &[])))
}

fn orchestrator(launcher: StubLauncher) -> Orchestrator<StubLauncher> {
    Orchestrator::with_launcher(launcher).with_builtin_command(builtin_command())
}

#[rstest]
fn builtin_descriptor_uses_configured_command(launcher: StubLauncher) {
    let log = launcher.log();
    let mut orchestrator = orchestrator(launcher);
    orchestrator
        .start(&[
            PluginDescriptor::builtin("tools"),
            PluginDescriptor::process("node", vec![String::from("node"), String::from("basic.js")]),
        ])
        .expect("start");

    let entries = log.entries();
    assert!(entries.contains(&String::from("prepare:tools:/opt/protei/tools --serve")));
    assert!(entries.contains(&String::from("prepare:node:node basic.js")));
}

#[rstest]
fn start_reports_outcomes_in_roster_order(launcher: StubLauncher) {
    let mut orchestrator = orchestrator(launcher);
    let outcomes = orchestrator
        .start(&[
            PluginDescriptor::builtin("tools"),
            PluginDescriptor::process("broken", vec![String::from("x")]).with_optional(true),
            PluginDescriptor::process("node", vec![String::from("node")]),
        ])
        .expect("start");

    let ids: Vec<&str> = outcomes.iter().map(StartOutcome::id).collect();
    assert_eq!(ids, ["tools", "broken", "node"]);
    assert!(outcomes[0].is_started());
    assert!(matches!(outcomes[1], StartOutcome::SkippedOptional { .. }));
    assert!(outcomes[2].is_started());
    assert_eq!(orchestrator.plugin_ids(), ["tools", "node"]);
}

#[rstest]
fn mandatory_failure_aborts_and_keeps_started_plugins(launcher: StubLauncher) {
    let log = launcher.log();
    let mut orchestrator = orchestrator(launcher);
    let error = orchestrator
        .start(&[
            PluginDescriptor::builtin("tools"),
            PluginDescriptor::process("broken", vec![String::from("x")]),
            PluginDescriptor::process("node", vec![String::from("node")]),
        ])
        .expect_err("mandatory failure");

    assert!(matches!(error, PluginError::Launch { ref id, .. } if id == "broken"));
    assert_eq!(orchestrator.plugin_ids(), ["tools"]);
    assert!(
        !log.entries().iter().any(|entry| entry.starts_with("prepare:node")),
        "start must stop at the first mandatory failure"
    );

    orchestrator.stop();
    assert!(log.entries().contains(&String::from("stop:tools")));
}

#[rstest]
fn failed_handshake_stops_the_client(launcher: StubLauncher) {
    let log = launcher.log();
    let mut orchestrator = orchestrator(launcher);
    let outcome = orchestrator.start_plugin(
        &PluginDescriptor::process("mute", vec![String::from("mute")]).with_optional(true),
    );

    assert!(matches!(outcome, StartOutcome::SkippedOptional { .. }));
    assert!(log.entries().contains(&String::from("stop:mute")));
    assert!(orchestrator.list_plugins().is_empty());
}

#[rstest]
fn duplicate_id_is_rejected(launcher: StubLauncher) {
    let mut orchestrator = orchestrator(launcher);
    let error = orchestrator
        .start(&[
            PluginDescriptor::builtin("tools"),
            PluginDescriptor::builtin("tools"),
        ])
        .expect_err("duplicate id");
    assert!(matches!(error, PluginError::Descriptor { .. }));
    assert_eq!(orchestrator.plugin_ids(), ["tools"]);
}

#[rstest]
fn duplicate_optional_id_is_skipped(launcher: StubLauncher) {
    let mut orchestrator = orchestrator(launcher);
    let outcomes = orchestrator
        .start(&[
            PluginDescriptor::builtin("tools"),
            PluginDescriptor::builtin("tools").with_optional(true),
        ])
        .expect("start");
    assert!(matches!(outcomes[1], StartOutcome::SkippedOptional { .. }));
    assert_eq!(orchestrator.list_plugins().len(), 1);
}

#[rstest]
fn empty_builtin_command_is_a_launch_failure(launcher: StubLauncher) {
    let mut orchestrator = Orchestrator::with_launcher(launcher).with_builtin_command(Vec::new());
    let error = orchestrator
        .start(&[PluginDescriptor::builtin("tools")])
        .expect_err("no command");
    assert!(matches!(error, PluginError::Launch { .. }));
}

#[rstest]
fn plugin_without_capabilities_is_registered(launcher: StubLauncher) {
    let mut orchestrator = orchestrator(launcher);
    orchestrator
        .start(&[PluginDescriptor::process("bare", vec![String::from("bare")])])
        .expect("start");
    assert_eq!(orchestrator.list_plugins().len(), 1);
    assert!(matches!(
        orchestrator.invoke("echo", json!({})),
        Err(PluginError::UnsupportedTool { .. })
    ));
}

#[rstest]
fn shared_capability_routes_to_first_registered(launcher: StubLauncher) {
    let mut orchestrator = orchestrator(launcher);
    orchestrator
        .start(&[
            PluginDescriptor::process("node", vec![String::from("node")]),
            PluginDescriptor::builtin("tools"),
        ])
        .expect("start");

    let result = orchestrator
        .invoke("echo", json!({"text": "hi"}))
        .expect("invoke");
    assert_eq!(result["plugin"], json!("node"));

    let sum = orchestrator
        .invoke("math.add", json!({"a": 2, "b": 3}))
        .expect("invoke");
    assert_eq!(sum["plugin"], json!("tools"));
}

#[rstest]
fn list_plugins_follows_registration_order(launcher: StubLauncher) {
    let mut orchestrator = orchestrator(launcher);
    orchestrator
        .start(&[
            PluginDescriptor::process("node", vec![String::from("node")]),
            PluginDescriptor::builtin("tools"),
        ])
        .expect("start");
    let names: Vec<&str> = orchestrator
        .list_plugins()
        .into_iter()
        .map(PluginMeta::name)
        .collect();
    assert_eq!(names, ["node-basic", "builtin-tools"]);
}

#[rstest]
fn stop_is_idempotent_and_clears_registry(launcher: StubLauncher) {
    let log = launcher.log();
    let mut orchestrator = orchestrator(launcher);
    orchestrator
        .start(&[PluginDescriptor::builtin("tools")])
        .expect("start");

    orchestrator.stop();
    orchestrator.stop();

    let stops = log
        .entries()
        .iter()
        .filter(|entry| entry.starts_with("stop:"))
        .count();
    assert_eq!(stops, 1);
    assert!(orchestrator.list_plugins().is_empty());
    assert!(matches!(
        orchestrator.invoke("echo", json!({})),
        Err(PluginError::UnsupportedTool { .. })
    ));
}

#[rstest]
fn panicking_stop_does_not_skip_later_plugins(launcher: StubLauncher) {
    let launcher = launcher.with_plugin(
        "stubborn",
        StubBehaviour::PanicOnStop(stub_meta("stubborn", &["echo"])),
    );
    let log = launcher.log();
    let mut orchestrator = orchestrator(launcher);
    orchestrator
        .start(&[
            PluginDescriptor::process("stubborn", vec![String::from("stubborn")]),
            PluginDescriptor::builtin("tools"),
        ])
        .expect("start");

    orchestrator.stop();

    let entries = log.entries();
    assert!(entries.contains(&String::from("stop:stubborn")));
    assert!(entries.contains(&String::from("stop:tools")));
    assert!(orchestrator.plugin_ids().is_empty());
}
