//! Neutral, high-level summaries of economic ideologies.
//!
//! `ideology.info` returns the summary of one topic and `ideology.compare`
//! places two summaries side by side with any known similarities and
//! differences. Unknown topics get a placeholder summary rather than an
//! error.


use protei_plugins::PluginMeta;
use protei_plugins::server::{ToolError, ToolHandler};
use serde::Serialize;
use serde_json::{Value, json};

use crate::args::required_text;

/// Name reported in the handshake.
pub const PLUGIN_NAME: &str = "ideology";

/// Tool summarising one topic.
pub const TOOL_INFO: &str = "ideology.info";

/// Tool comparing two topics.
pub const TOOL_COMPARE: &str = "ideology.compare";

/// Summary returned for topics without an entry.
pub const NO_SUMMARY: &str = "No summary available.";

/// Note attached to every comparison.
pub const COMPARE_DISCLAIMER: &str = "This is a brief, neutral summary for informational \
                                       purposes; consult primary sources for depth.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Communism,
    Socialism,
    Capitalism,
}

impl Topic {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "communism" => Some(Self::Communism),
            "socialism" => Some(Self::Socialism),
            "capitalism" => Some(Self::Capitalism),
            _ => None,
        }
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Communism => "communism",
            Self::Socialism => "socialism",
            Self::Capitalism => "capitalism",
        }
    }

    const fn summary(self) -> &'static str {
        match self {
            Self::Communism => {
                "Communism is a socio-economic ideology and movement advocating for a classless, \
                 stateless society featuring common ownership of the means of production and \
                 production for use."
            }
            Self::Socialism => {
                "Socialism generally refers to systems where the means of production are \
                 collectively or publicly owned, with varying degrees of market mechanisms and \
                 planning across different models."
            }
            Self::Capitalism => {
                "Capitalism is an economic system characterized by private ownership of the means \
                 of production, market-based allocation of goods and services, and profit-driven \
                 enterprise."
            }
        }
    }

    const fn core_principles(self) -> [&'static str; 3] {
        match self {
            Self::Communism => [
                "Common ownership of productive assets",
                "Abolition of class distinctions",
                "Allocation based on needs rather than market exchange",
            ],
            Self::Socialism => [
                "Collective or public ownership of major industries",
                "Economic coordination through planning or regulated markets",
                "Greater emphasis on social welfare and equity",
            ],
            Self::Capitalism => [
                "Private property and capital accumulation",
                "Voluntary exchange via markets",
                "Competition and price signals for resource allocation",
            ],
        }
    }
}

/// Summary of one topic as returned by `ideology.info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSummary {
    topic: String,
    summary: &'static str,
    core_principles: Vec<&'static str>,
}

impl TopicSummary {
    /// Looks `topic` up case-insensitively. Known topics report their
    /// canonical lowercase name; unknown ones echo the request.
    #[must_use]
    pub fn lookup(topic: &str) -> Self {
        Topic::parse(topic).map_or_else(
            || Self {
                topic: topic.to_owned(),
                summary: NO_SUMMARY,
                core_principles: Vec::new(),
            },
            |known| Self {
                topic: known.key().to_owned(),
                summary: known.summary(),
                core_principles: known.core_principles().to_vec(),
            },
        )
    }

    /// Returns the topic name.
    #[must_use]
    pub const fn topic(&self) -> &str {
        self.topic.as_str()
    }

    /// Returns the summary text.
    #[must_use]
    pub const fn summary(&self) -> &str {
        self.summary
    }
}

/// Handler for the ideology tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdeologyHandler;

impl ToolHandler for IdeologyHandler {
    fn meta(&self) -> PluginMeta {
        PluginMeta::new(
            PLUGIN_NAME,
            env!("CARGO_PKG_VERSION"),
            "rust",
            [TOOL_INFO, TOOL_COMPARE],
        )
    }

    fn invoke(&self, tool: &str, args: &Value) -> Result<Value, ToolError> {
        match tool {
            TOOL_INFO => {
                let topic = required_text(args, "topic")?;
                to_value(&TopicSummary::lookup(&topic))
            }
            TOOL_COMPARE => {
                let (Ok(first), Ok(second)) = (required_text(args, "a"), required_text(args, "b"))
                else {
                    return Err(ToolError::new("'a' and 'b' are required"));
                };
                compare(&first, &second)
            }
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn compare(first: &str, second: &str) -> Result<Value, ToolError> {
    let mut similarities = Vec::new();
    let mut differences = Vec::new();
    match (Topic::parse(first), Topic::parse(second)) {
        (Some(Topic::Communism), Some(Topic::Socialism))
        | (Some(Topic::Socialism), Some(Topic::Communism)) => {
            similarities
                .push("Both emphasize collective approaches over purely private ownership.");
            differences.push(
                "Communism typically envisions a stateless, classless end-state; socialism spans \
                 diverse models.",
            );
        }
        (Some(Topic::Capitalism), Some(Topic::Communism | Topic::Socialism))
        | (Some(Topic::Communism | Topic::Socialism), Some(Topic::Capitalism)) => {
            similarities
                .push("All are frameworks addressing production, ownership, and distribution.");
            differences.push(
                "Capitalism centers private ownership and markets; the others increase or \
                 prioritize collective ownership.",
            );
        }
        _ => {}
    }

    let left = to_value(&TopicSummary::lookup(first))?;
    let right = to_value(&TopicSummary::lookup(second))?;
    Ok(json!({
        "a": left,
        "b": right,
        "similarities": similarities,
        "differences": differences,
        "disclaimer": COMPARE_DISCLAIMER,
    }))
}

fn to_value(summary: &TopicSummary) -> Result<Value, ToolError> {
    serde_json::to_value(summary).map_err(|error| ToolError::new(error.to_string()))
}
