//! Log output formats for the Protei binaries.
//!
//! Diagnostics always go to stderr so that command output on stdout stays
//! machine-readable; the format only changes how each event is rendered.

use strum::{Display, EnumString};

/// How tracing events are rendered on stderr.
///
/// Parsed case-insensitively from `--log-format` or `PROTEI_LOG_FORMAT`.
/// `compact` is the default since the CLI is normally run from a terminal;
/// `json` is meant for log collectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, event fields flattened into the top level.
    Json,
    /// One human-readable line per event.
    #[default]
    Compact,
}
