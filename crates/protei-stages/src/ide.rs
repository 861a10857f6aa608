//! IDE-flavoured response clean-up.

use std::sync::LazyLock;

use protei_plugins::{Stage, StageError, TransformationContext};
use regex::Regex;

const FENCE: &str = "```";

/// Minimum number of code-like lines before an unfenced response is wrapped.
const CODE_LINE_THRESHOLD: usize = 3;

#[expect(clippy::expect_used, reason = "literal pattern is covered by tests")]
static CODE_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(def |class |import |from |function |var |let |const |#include )")
        .expect("invalid code hint pattern")
});

/// Balances Markdown code fences in responses.
///
/// An odd number of fences gets a closing fence appended. A response without
/// fences in which at least three non-blank lines look like source code is
/// wrapped in a plain fence.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdeStage;

impl IdeStage {
    fn balance_fences(text: &str) -> String {
        if text.matches(FENCE).count().is_multiple_of(2) {
            text.to_owned()
        } else {
            format!("{text}\n{FENCE}")
        }
    }

    fn looks_like_code(text: &str) -> bool {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| CODE_HINT.is_match(line))
            .count()
            >= CODE_LINE_THRESHOLD
    }
}

impl Stage for IdeStage {
    fn name(&self) -> &str {
        "ide"
    }

    fn on_response(
        &self,
        text: &str,
        _context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        if text.is_empty() {
            return Ok(String::new());
        }
        let balanced = Self::balance_fences(text);
        if !balanced.contains(FENCE) && Self::looks_like_code(&balanced) {
            return Ok(format!("{FENCE}\n{balanced}\n{FENCE}"));
        }
        Ok(balanced)
    }
}
