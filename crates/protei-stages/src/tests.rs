//! Unit tests for the bundled stages.

use protei_plugins::{Stage, TransformationContext};
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

#[fixture]
fn context() -> TransformationContext {
    TransformationContext::for_model("protei-test")
}

// ---------------------------------------------------------------------------
// IdeStage
// ---------------------------------------------------------------------------

#[rstest]
#[case::unbalanced("```rust\nfn main() {}", "```rust\nfn main() {}\n```")]
#[case::balanced("```\nx\n```", "```\nx\n```")]
#[case::prose("Just some words.", "Just some words.")]
#[case::empty("", "")]
fn ide_balances_fences(
    mut context: TransformationContext,
    #[case] input: &str,
    #[case] expected: &str,
) {
    let output = IdeStage.on_response(input, &mut context).expect("ide");
    assert_eq!(output, expected);
}

#[rstest]
fn ide_wraps_code_like_text(mut context: TransformationContext) {
    let input = "import os\n\ndef main():\n    let x = 1\n";
    let output = IdeStage.on_response(input, &mut context).expect("ide");
    assert_eq!(output, format!("```\n{input}\n```"));
}

#[rstest]
fn ide_leaves_sparse_code_alone(mut context: TransformationContext) {
    let input = "import os\nthen do something\nand more";
    let output = IdeStage.on_response(input, &mut context).expect("ide");
    assert_eq!(output, input);
}

#[rstest]
fn ide_leaves_prompts_alone(mut context: TransformationContext) {
    let output = IdeStage.on_prompt("```", &mut context).expect("ide");
    assert_eq!(output, "```");
}

// ---------------------------------------------------------------------------
// SpaceStage
// ---------------------------------------------------------------------------

#[rstest]
fn space_prefaces_prompt_once(mut context: TransformationContext) {
    let once = SpaceStage
        .on_prompt("How far is Mars?", &mut context)
        .expect("space");
    assert!(once.starts_with("When discussing space or astrophysics, use clear SI units"));
    assert!(once.ends_with("note assumptions. How far is Mars?"));

    let twice = SpaceStage.on_prompt(&once, &mut context).expect("space");
    assert_eq!(twice, once);
}

#[rstest]
#[case::bare_number("It is 225 million away.", true)]
#[case::with_km("It is 225 million km away.", false)]
#[case::with_speed("Escape velocity is 5.0 m/s here.", false)]
#[case::no_digits("Quite far.", false)]
#[case::empty("", false)]
fn space_adds_units_note(
    mut context: TransformationContext,
    #[case] input: &str,
    #[case] noted: bool,
) {
    let output = SpaceStage.on_response(input, &mut context).expect("space");
    let note = "\nNote: Ensure all numeric quantities include units (e.g., km, m/s, kg).";
    if noted {
        assert_eq!(output, format!("{input}{note}"));
    } else {
        assert_eq!(output, input);
    }
}

#[rstest]
fn space_leaves_empty_prompt(mut context: TransformationContext) {
    assert_eq!(SpaceStage.on_prompt("", &mut context).expect("space"), "");
}

// ---------------------------------------------------------------------------
// GameDevStage
// ---------------------------------------------------------------------------

#[rstest]
fn gamedev_adds_context_header(mut context: TransformationContext) {
    context.insert(
        GAMEDEV_CONTEXT_KEY,
        json!({"project": "Starfall", "engine": "Godot", "genre": "roguelike"}),
    );
    let output = GameDevStage
        .on_prompt("Plan the sprint", &mut context)
        .expect("gamedev");
    assert_eq!(
        output,
        "[GameDev Context] Title: Starfall; Engine: Godot; Genre: roguelike\nPlan the sprint"
    );
}

#[rstest]
fn gamedev_prefers_title_over_project(mut context: TransformationContext) {
    context.insert(
        GAMEDEV_CONTEXT_KEY,
        json!({"title": "Starfall II", "project": "sf2", "platform": "PC"}),
    );
    let output = GameDevStage.on_prompt("Go", &mut context).expect("gamedev");
    assert_eq!(output, "[GameDev Context] Title: Starfall II; Platform: PC\nGo");
}

#[rstest]
#[case::absent(None)]
#[case::empty_object(Some(json!({})))]
#[case::blank_fields(Some(json!({"title": "", "engine": null})))]
#[case::not_an_object(Some(json!("Starfall")))]
fn gamedev_without_usable_context_is_passthrough(
    mut context: TransformationContext,
    #[case] project: Option<serde_json::Value>,
) {
    if let Some(value) = project {
        context.insert(GAMEDEV_CONTEXT_KEY, value);
    }
    let output = GameDevStage
        .on_prompt("Plan the sprint", &mut context)
        .expect("gamedev");
    assert_eq!(output, "Plan the sprint");
}

#[rstest]
#[case::bare("[ ] art\n[x] audio", "- [ ] art\n- [x] audio")]
#[case::already_listed("- [ ] art\n- [x] audio", "- [ ] art\n- [x] audio")]
#[case::plain("no tasks", "no tasks")]
fn gamedev_normalises_checkboxes(
    mut context: TransformationContext,
    #[case] input: &str,
    #[case] expected: &str,
) {
    let output = GameDevStage.on_response(input, &mut context).expect("gamedev");
    assert_eq!(output, expected);
}

// ---------------------------------------------------------------------------
// NeutralToneStage
// ---------------------------------------------------------------------------

#[rstest]
fn neutral_prefaces_prompt_once(mut context: TransformationContext) {
    let once = NeutralToneStage
        .on_prompt("Summarise the debate", &mut context)
        .expect("neutral");
    assert_eq!(
        once,
        "Please respond in a neutral, non-persuasive, factual tone. Avoid calls to action or \
         targeted political advice. Summarise the debate"
    );
    let twice = NeutralToneStage.on_prompt(&once, &mut context).expect("neutral");
    assert_eq!(twice, once);
}

#[rstest]
fn neutral_marker_check_ignores_case(mut context: TransformationContext) {
    let prompt = "PLEASE RESPOND IN A NEUTRAL way about tariffs";
    let output = NeutralToneStage.on_prompt(prompt, &mut context).expect("neutral");
    assert_eq!(output, prompt);
}

#[rstest]
#[case::vote("You should VOTE today.", true)]
#[case::donate("Donate now", true)]
#[case::substring_only("The supportive partyline electorate", false)]
#[case::factual("The bill passed in 2021.", false)]
fn neutral_flags_persuasion(
    mut context: TransformationContext,
    #[case] input: &str,
    #[case] flagged: bool,
) {
    let output = NeutralToneStage
        .on_response(input, &mut context)
        .expect("neutral");
    assert_eq!(
        output.starts_with("Note: The following information is presented neutrally"),
        flagged
    );
    assert!(output.ends_with(input));
}

// ---------------------------------------------------------------------------
// StageKind
// ---------------------------------------------------------------------------

#[rstest]
#[case("ide", StageKind::Ide)]
#[case("Space", StageKind::Space)]
#[case("gamedev", StageKind::GameDev)]
#[case("NEUTRAL", StageKind::Neutral)]
fn stage_kind_parses_names(#[case] name: &str, #[case] expected: StageKind) {
    assert_eq!(name.parse::<StageKind>().expect("stage kind"), expected);
}

#[rstest]
fn stage_kind_rejects_unknown_names() {
    assert!("poetry".parse::<StageKind>().is_err());
}

#[rstest]
fn stage_kind_display_round_trips() {
    assert_eq!(StageKind::GameDev.to_string(), "gamedev");
    assert_eq!(StageKind::Ide.to_string(), "ide");
}

#[rstest]
fn pipeline_from_keeps_order() {
    let pipeline = pipeline_from(&[StageKind::Neutral, StageKind::Ide, StageKind::Space]);
    assert_eq!(pipeline.stage_names(), vec!["neutral-tone", "ide", "space"]);
}
