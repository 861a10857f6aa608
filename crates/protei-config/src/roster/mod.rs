//! YAML plugin roster loading.
//!
//! A roster document is a mapping with a `plugins` sequence:
//!
//! ```yaml
//! plugins:
//!   - id: tools
//!     kind: builtin_tools
//!   - id: node-basic
//!     kind: process
//!     command: ["node", "plugins/node/basic.js", "--serve"]
//!     optional: true
//!     timeout_secs: 10
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use protei_plugins::{PluginDescriptor, PluginKind};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Log target for roster loading.
const ROSTER_TARGET: &str = "protei_config::roster";

/// Identifier of the builtin tools plugin in the default roster.
pub const DEFAULT_ROSTER_ID: &str = "builtin-tools";

/// Errors raised while loading a plugin roster.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The roster file could not be read.
    #[error("failed to read roster '{}': {source}", path.display())]
    Read {
        /// Path of the roster file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The roster document is not valid YAML.
    #[error("failed to parse roster: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },
    /// The `plugins` key does not hold a sequence.
    #[error("roster 'plugins' must be a sequence")]
    PluginsNotSequence,
    /// A mandatory entry names a kind that is not supported.
    #[error("plugin entry {index} ('{id}') has unsupported kind '{kind}'")]
    UnknownKind {
        /// Zero-based position of the entry.
        index: usize,
        /// Entry identifier, or an empty string when absent.
        id: String,
        /// Kind as written in the roster.
        kind: String,
    },
    /// An entry could not be decoded into a descriptor.
    #[error("plugin entry {index} is invalid: {message}")]
    InvalidEntry {
        /// Zero-based position of the entry.
        index: usize,
        /// Decoder diagnostic.
        message: String,
    },
}

/// Returns the roster used when no roster file is configured.
#[must_use]
pub fn default_roster() -> Vec<PluginDescriptor> {
    vec![PluginDescriptor::builtin(DEFAULT_ROSTER_ID)]
}

/// Loads the roster at `path`, or the default roster when `path` is `None`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read or its content is not
/// a valid roster.
pub fn load_roster(path: Option<&Path>) -> Result<Vec<PluginDescriptor>, ConfigError> {
    let Some(roster_path) = path else {
        debug!(target: ROSTER_TARGET, "no roster configured, using default");
        return Ok(default_roster());
    };
    let text = fs::read_to_string(roster_path).map_err(|source| ConfigError::Read {
        path: roster_path.to_path_buf(),
        source: Arc::new(source),
    })?;
    let roster = parse_roster(&text)?;
    debug!(
        target: ROSTER_TARGET,
        path = %roster_path.display(),
        plugins = roster.len(),
        "roster loaded"
    );
    Ok(roster)
}

/// Parses roster YAML.
///
/// An empty document, or one whose root is not a mapping, yields an empty
/// roster. Entries with an unsupported kind are skipped when marked optional.
///
/// # Errors
///
/// Returns [`ConfigError`] for malformed YAML, a non-sequence `plugins` value,
/// an unsupported kind on a mandatory entry, or an entry that does not
/// describe a plugin.
pub fn parse_roster(text: &str) -> Result<Vec<PluginDescriptor>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let document: Option<Value> =
        serde_saphyr::from_str(text).map_err(|error| ConfigError::Parse {
            message: error.to_string(),
        })?;

    let Some(Value::Object(mut root)) = document else {
        warn!(target: ROSTER_TARGET, "roster root is not a mapping, ignoring it");
        return Ok(Vec::new());
    };
    let entries = match root.remove("plugins") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(ConfigError::PluginsNotSequence),
    };

    let mut roster = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if let Some(descriptor) = parse_entry(index, entry)? {
            roster.push(descriptor);
        }
    }
    Ok(roster)
}

fn parse_entry(index: usize, entry: Value) -> Result<Option<PluginDescriptor>, ConfigError> {
    let kind = entry.get("kind").and_then(Value::as_str).unwrap_or_default();
    if PluginKind::from_name(kind).is_none() {
        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let optional = entry
            .get("optional")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if optional {
            warn!(
                target: ROSTER_TARGET,
                index,
                plugin = %id,
                kind,
                "skipping optional plugin with unsupported kind"
            );
            return Ok(None);
        }
        return Err(ConfigError::UnknownKind {
            index,
            id,
            kind: kind.to_owned(),
        });
    }

    let descriptor: PluginDescriptor =
        serde_json::from_value(entry).map_err(|error| ConfigError::InvalidEntry {
            index,
            message: error.to_string(),
        })?;
    Ok(Some(descriptor))
}
