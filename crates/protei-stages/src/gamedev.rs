//! Game development prompt context and task list normalisation.

use std::sync::LazyLock;

use protei_plugins::{Stage, StageError, TransformationContext};
use regex::{Captures, Regex};
use serde_json::Value;

/// Context key holding the game project description object.
pub const GAMEDEV_CONTEXT_KEY: &str = "gamedev";

#[expect(clippy::expect_used, reason = "literal pattern is covered by tests")]
static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(- )?\[( |x)\]").expect("invalid checkbox pattern"));

/// Adds a `[GameDev Context]` header to prompts and turns bare `[ ]` / `[x]`
/// markers in responses into Markdown task list items.
///
/// The header is built from the `gamedev` context object: `title` (or
/// `project`), `engine`, `platform` and `genre`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameDevStage;

impl GameDevStage {
    fn header(context: &TransformationContext) -> Option<String> {
        let project = context.get(GAMEDEV_CONTEXT_KEY)?.as_object()?;
        let field = |key: &str| project.get(key).and_then(display_value);

        let parts: Vec<String> = [
            ("Title", field("title").or_else(|| field("project"))),
            ("Engine", field("engine")),
            ("Platform", field("platform")),
            ("Genre", field("genre")),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|text| format!("{label}: {text}")))
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Renders a context value for the header; empty and falsy values are
/// skipped.
fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

impl Stage for GameDevStage {
    fn name(&self) -> &str {
        "gamedev"
    }

    fn on_prompt(
        &self,
        text: &str,
        context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        if text.is_empty() {
            return Ok(String::new());
        }
        Ok(Self::header(context).map_or_else(
            || text.to_owned(),
            |header| format!("[GameDev Context] {header}\n{text}"),
        ))
    }

    fn on_response(
        &self,
        text: &str,
        _context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        let normalised = CHECKBOX.replace_all(text, |caps: &Captures<'_>| {
            let mark = caps.get(2).map_or(" ", |found| found.as_str());
            format!("- [{mark}]")
        });
        Ok(normalised.into_owned())
    }
}
