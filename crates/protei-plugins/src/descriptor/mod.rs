//! Plugin descriptors and handshake metadata.
//!
//! A [`PluginDescriptor`] is one roster entry: an id, a kind, a command and a
//! startup policy. [`PluginMeta`] is what a running plugin reports about itself
//! in reply to the `get_meta` handshake.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::PluginError;

/// Log target for descriptor handling.
const DESCRIPTOR_TARGET: &str = "protei_plugins::descriptor";

/// Default bounded wait applied to each plugin call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// File name of the builtin tools plugin executable.
pub const BUILTIN_TOOLS_BINARY: &str = "protei-plugin-tools";

/// Flag that puts a plugin executable into serve mode.
pub const SERVE_FLAG: &str = "--serve";

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// How a descriptor's command is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginKind {
    /// The bundled tools plugin; the command comes from orchestrator
    /// configuration rather than the descriptor.
    #[serde(rename = "builtin_tools", alias = "builtin", alias = "builtin_pytools")]
    BuiltinTool,
    /// An arbitrary executable; the descriptor command is used verbatim.
    #[serde(rename = "process")]
    ExternalProcess,
}

impl PluginKind {
    /// Returns the canonical serialised name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuiltinTool => "builtin_tools",
            Self::ExternalProcess => "process",
        }
    }

    /// Parses a kind from its canonical name or one of its aliases.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "builtin_tools" | "builtin" | "builtin_pytools" => Some(Self::BuiltinTool),
            "process" => Some(Self::ExternalProcess),
            _ => None,
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One roster entry describing a plugin to start.
///
/// # Example
///
/// ```
/// use protei_plugins::{PluginDescriptor, PluginKind};
///
/// let descriptor = PluginDescriptor::process(
///     "node-basic",
///     vec!["node".into(), "basic.js".into(), "--serve".into()],
/// )
/// .with_optional(true);
///
/// assert_eq!(descriptor.kind(), PluginKind::ExternalProcess);
/// assert!(descriptor.is_optional());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    id: String,
    kind: PluginKind,
    #[serde(default)]
    command: Vec<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

impl PluginDescriptor {
    /// Creates a descriptor for the builtin tools plugin.
    #[must_use]
    pub fn builtin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: PluginKind::BuiltinTool,
            command: Vec::new(),
            optional: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Creates a descriptor for an external plugin process.
    #[must_use]
    pub fn process(id: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            id: id.into(),
            kind: PluginKind::ExternalProcess,
            command,
            optional: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets whether a startup failure is tolerated.
    #[must_use]
    pub const fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Sets the per-call wait in seconds; `0` waits indefinitely.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Descriptor`] when the id is blank.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.id.trim().is_empty() {
            return Err(PluginError::Descriptor {
                message: String::from("plugin id must not be empty"),
            });
        }
        Ok(())
    }

    /// Returns the descriptor id.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the plugin kind.
    #[must_use]
    pub const fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Returns the command as written in the descriptor.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Returns whether a startup failure is tolerated.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns the per-call wait in seconds.
    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Returns the per-call wait, or `None` when waits are unbounded.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    /// Resolves the command line to execute for this descriptor.
    ///
    /// Builtin descriptors use `builtin_command`; external descriptors use
    /// their own command verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Launch`] when the resolved command is empty.
    pub fn resolve_command(&self, builtin_command: &[String]) -> Result<Vec<String>, PluginError> {
        let command = match self.kind {
            PluginKind::BuiltinTool => builtin_command,
            PluginKind::ExternalProcess => self.command.as_slice(),
        };
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(PluginError::Launch {
                id: self.id.clone(),
                message: format!("no command configured for {} plugin", self.kind),
                source: None,
            });
        }
        Ok(command.to_vec())
    }
}

/// Returns the default command line for the builtin tools plugin.
///
/// The executable is looked up next to the running binary first, falling back
/// to a bare name resolved through `PATH`.
#[must_use]
pub fn default_builtin_command() -> Vec<String> {
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(builtin_file_name())))
        .filter(|candidate| candidate.is_file());
    let program = sibling.map_or_else(
        || String::from(BUILTIN_TOOLS_BINARY),
        |path: PathBuf| path.to_string_lossy().into_owned(),
    );
    vec![program, String::from(SERVE_FLAG)]
}

fn builtin_file_name() -> String {
    format!("{BUILTIN_TOOLS_BINARY}{}", std::env::consts::EXE_SUFFIX)
}

/// Metadata reported by a plugin during the `get_meta` handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMeta {
    name: String,
    version: String,
    language: String,
    capabilities: BTreeSet<String>,
}

impl PluginMeta {
    /// Creates metadata from its parts.
    #[must_use]
    pub fn new<I, S>(
        name: impl Into<String>,
        version: impl Into<String>,
        language: impl Into<String>,
        capabilities: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            version: version.into(),
            language: language.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds metadata from a raw handshake result.
    ///
    /// Missing `name`, `version` and `language` default to the descriptor id,
    /// `"0.0.0"` and `"unknown"`; a missing `capabilities` array yields an
    /// empty set. Non-string capability entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidResponse`] when the result is not an
    /// object or `capabilities` is present but not an array.
    pub fn from_handshake(id: &str, result: Value) -> Result<Self, PluginError> {
        let Value::Object(mut fields) = result else {
            return Err(PluginError::InvalidResponse {
                id: id.to_owned(),
                message: String::from("get_meta result is not an object"),
            });
        };

        let text = |value: Option<Value>, default: &str| match value {
            Some(Value::String(text)) => text,
            _ => default.to_owned(),
        };
        let name = text(fields.remove("name"), id);
        let version = text(fields.remove("version"), "0.0.0");
        let language = text(fields.remove("language"), "unknown");

        let capabilities = match fields.remove("capabilities") {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(Value::Array(entries)) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Value::String(capability) => Some(capability),
                    other => {
                        warn!(
                            target: DESCRIPTOR_TARGET,
                            plugin = id,
                            entry = %other,
                            "skipping non-string capability"
                        );
                        None
                    }
                })
                .collect(),
            Some(_) => {
                return Err(PluginError::InvalidResponse {
                    id: id.to_owned(),
                    message: String::from("capabilities is not an array"),
                });
            }
        };

        Ok(Self {
            name,
            version,
            language,
            capabilities,
        })
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the implementation language.
    #[must_use]
    pub const fn language(&self) -> &str {
        self.language.as_str()
    }

    /// Returns the declared capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// Returns whether the plugin declares `tool`.
    #[must_use]
    pub fn supports(&self, tool: &str) -> bool {
        self.capabilities.contains(tool)
    }
}
