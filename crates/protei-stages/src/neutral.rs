//! Neutral tone guard for political and ideological content.

use std::sync::LazyLock;

use protei_plugins::{Stage, StageError, TransformationContext};
use regex::Regex;

const PREFACE: &str = "Please respond in a neutral, non-persuasive, factual tone. \
                       Avoid calls to action or targeted political advice. ";

const PREFACE_MARKER: &str = "please respond in a neutral";

const DISCLAIMER: &str = "Note: The following information is presented neutrally and avoids \
                          persuasion or calls to action. ";

#[expect(clippy::expect_used, reason = "literal pattern is covered by tests")]
static PERSUASION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(convince|vote|support|campaign|donate|join|persuade|urge|endorse|rally|party|elect)\b",
    )
    .expect("invalid persuasion pattern")
});

/// Asks for a neutral tone in prompts and flags responses containing calls
/// to action with a neutrality disclaimer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralToneStage;

impl Stage for NeutralToneStage {
    fn name(&self) -> &str {
        "neutral-tone"
    }

    fn on_prompt(
        &self,
        text: &str,
        _context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        if text.to_lowercase().starts_with(PREFACE_MARKER) {
            return Ok(text.to_owned());
        }
        Ok(format!("{PREFACE}{text}"))
    }

    fn on_response(
        &self,
        text: &str,
        _context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        if PERSUASION.is_match(text) {
            return Ok(format!("{DISCLAIMER}{text}"));
        }
        Ok(text.to_owned())
    }
}
