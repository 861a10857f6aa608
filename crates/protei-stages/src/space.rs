//! Units guidance for space and science conversations.

use protei_plugins::{Stage, StageError, TransformationContext};

const PREFACE_START: &str = "When discussing space or astrophysics";

const PREFACE: &str = "When discussing space or astrophysics, use clear SI units, cite known \
                       constants when relevant, and note assumptions. ";

const UNITS_NOTE: &str = "\nNote: Ensure all numeric quantities include units (e.g., km, m/s, kg).";

const UNIT_MARKERS: [&str; 3] = ["km", "m/s", "kg"];

/// Prefaces prompts with units guidance and reminds responses that quote
/// bare numbers to state their units.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaceStage;

impl Stage for SpaceStage {
    fn name(&self) -> &str {
        "space"
    }

    fn on_prompt(
        &self,
        text: &str,
        _context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        if text.is_empty() || text.starts_with(PREFACE_START) {
            return Ok(text.to_owned());
        }
        Ok(format!("{PREFACE}{text}"))
    }

    fn on_response(
        &self,
        text: &str,
        _context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        let has_digit = text.chars().any(|ch| ch.is_ascii_digit());
        let has_units = UNIT_MARKERS.iter().any(|unit| text.contains(unit));
        if has_digit && !has_units {
            return Ok(format!("{text}{UNITS_NOTE}"));
        }
        Ok(text.to_owned())
    }
}
