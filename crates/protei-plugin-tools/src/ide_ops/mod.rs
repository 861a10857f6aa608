//! File tools confined to a workspace root.
//!
//! Every tool accepts an optional `root` argument and falls back to the
//! handler's default root. Requested paths may be relative to the root or
//! absolute, but must resolve inside it; anything else fails with
//! `Path escapes root`.
//!
//! | Tool         | Arguments                                                   |
//! |--------------|-------------------------------------------------------------|
//! | `ide.list`   | `path` (`.`), `max_entries` (5000)                          |
//! | `ide.read`   | `path` (required), `max_bytes` (200000), `encoding`         |
//! | `ide.write`  | `path` (required), `content`, `create_dirs` (true)          |
//! | `ide.search` | `path` (`.`), `pattern`, `regex`, `ignore_case` (true), `max_matches` (2000) |

mod paths;

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use protei_plugins::PluginMeta;
use protei_plugins::server::{ToolError, ToolHandler};
use regex::RegexBuilder;
use serde_json::{Value, json};
use walkdir::{DirEntry, WalkDir};

use self::paths::Workspace;
use crate::args::{flag, limit, required_text, text};

/// Name reported in the handshake.
pub const PLUGIN_NAME: &str = "ide-ops";

/// Tool listing a directory.
pub const TOOL_LIST: &str = "ide.list";

/// Tool reading a file.
pub const TOOL_READ: &str = "ide.read";

/// Tool writing a file.
pub const TOOL_WRITE: &str = "ide.write";

/// Tool searching file contents line by line.
pub const TOOL_SEARCH: &str = "ide.search";

/// Root used when a request names none.
pub const DEFAULT_ROOT: &str = "/workspace";

const DEFAULT_MAX_ENTRIES: usize = 5000;
const DEFAULT_MAX_BYTES: usize = 200_000;
const DEFAULT_MAX_MATCHES: usize = 2000;

/// Directories `ide.search` never descends into.
const SKIPPED_DIRS: [&str; 5] = [".git", "node_modules", "venv", ".venv", "__pycache__"];

/// Handler for the workspace file tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeOpsHandler {
    default_root: PathBuf,
}

impl IdeOpsHandler {
    /// Creates a handler whose requests default to `default_root`.
    #[must_use]
    pub fn new(default_root: impl Into<PathBuf>) -> Self {
        Self {
            default_root: default_root.into(),
        }
    }

    /// Returns the root used when a request names none.
    #[must_use]
    pub fn default_root(&self) -> &Path {
        &self.default_root
    }

    fn workspace(&self, args: &Value) -> Result<Workspace, ToolError> {
        text(args, "root").map_or_else(
            || Workspace::new(&self.default_root),
            |root| Workspace::new(Path::new(&root)),
        )
    }

    fn list(&self, args: &Value) -> Result<Value, ToolError> {
        let workspace = self.workspace(args)?;
        let requested = text(args, "path").unwrap_or_else(|| String::from("."));
        let dir = workspace.resolve(&requested)?;
        let max_entries = limit(args, "max_entries", DEFAULT_MAX_ENTRIES)?;
        if !dir.is_dir() {
            return Err(ToolError::new("Not a directory"));
        }

        let mut children: Vec<(String, PathBuf)> = fs::read_dir(&dir)
            .map_err(|error| io_failure("list", &workspace.relative(&dir), &error))?
            .filter_map(Result::ok)
            .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
            .collect();
        children.sort_by(|left, right| left.0.cmp(&right.0));

        let entries: Vec<Value> = children
            .into_iter()
            .filter_map(|(name, path)| {
                let metadata = fs::metadata(&path).ok()?;
                Some(json!({
                    "name": name,
                    "is_dir": metadata.is_dir(),
                    "size": metadata.len(),
                }))
            })
            .take(max_entries)
            .collect();

        let relative = workspace.relative(&dir);
        let shown = if relative == "." {
            String::from("/")
        } else {
            relative
        };
        Ok(json!({
            "root": workspace.root().to_string_lossy(),
            "path": shown,
            "entries": entries,
        }))
    }

    fn read(&self, args: &Value) -> Result<Value, ToolError> {
        let workspace = self.workspace(args)?;
        let file = workspace.resolve(&required_text(args, "path")?)?;
        let max_bytes = limit(args, "max_bytes", DEFAULT_MAX_BYTES)?;
        check_encoding(args)?;
        if !file.is_file() {
            return Err(ToolError::new("Not a file"));
        }

        let relative = workspace.relative(&file);
        let mut data = Vec::new();
        File::open(&file)
            .and_then(|handle| {
                handle
                    .take(u64::try_from(max_bytes).unwrap_or(u64::MAX))
                    .read_to_end(&mut data)
            })
            .map_err(|error| io_failure("read", &relative, &error))?;

        Ok(json!({
            "root": workspace.root().to_string_lossy(),
            "path": relative,
            "mode": "text",
            "content": String::from_utf8_lossy(&data),
        }))
    }

    fn write(&self, args: &Value) -> Result<Value, ToolError> {
        let workspace = self.workspace(args)?;
        let file = workspace.resolve(&required_text(args, "path")?)?;
        let content = text(args, "content").unwrap_or_default();
        check_encoding(args)?;
        let relative = workspace.relative(&file);

        if flag(args, "create_dirs", true)
            && let Some(parent) = file.parent()
            && !parent.is_dir()
        {
            fs::create_dir_all(parent).map_err(|error| io_failure("create", &relative, &error))?;
        }
        fs::write(&file, content.as_bytes())
            .map_err(|error| io_failure("write", &relative, &error))?;

        Ok(json!({
            "root": workspace.root().to_string_lossy(),
            "path": relative,
            "written_bytes": content.len(),
        }))
    }

    fn search(&self, args: &Value) -> Result<Value, ToolError> {
        let workspace = self.workspace(args)?;
        let requested = text(args, "path").unwrap_or_else(|| String::from("."));
        let start = workspace.resolve(&requested)?;
        let pattern = text(args, "pattern").unwrap_or_default();
        let max_matches = limit(args, "max_matches", DEFAULT_MAX_MATCHES)?;
        if !start.is_dir() {
            return Err(ToolError::new("Search path must be a directory"));
        }

        let source = if flag(args, "regex", false) {
            pattern.clone()
        } else {
            regex::escape(&pattern)
        };
        let matcher = RegexBuilder::new(&source)
            .case_insensitive(flag(args, "ignore_case", true))
            .build()
            .map_err(|error| ToolError::new(format!("invalid pattern: {error}")))?;

        let mut matches = Vec::new();
        let files = WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file());

        'files: for entry in files {
            let Ok(bytes) = fs::read(entry.path()) else {
                continue;
            };
            let file = workspace.relative(entry.path());
            for (index, line) in String::from_utf8_lossy(&bytes).lines().enumerate() {
                let Some(found) = matcher.find(line) else {
                    continue;
                };
                matches.push(json!({
                    "file": file,
                    "line": index + 1,
                    "start": found.start(),
                    "end": found.end(),
                    "preview": line,
                }));
                if matches.len() >= max_matches {
                    break 'files;
                }
            }
        }

        Ok(json!({
            "root": workspace.root().to_string_lossy(),
            "path": workspace.relative(&start),
            "pattern": pattern,
            "matches": matches,
        }))
    }
}

impl Default for IdeOpsHandler {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl ToolHandler for IdeOpsHandler {
    fn meta(&self) -> PluginMeta {
        PluginMeta::new(
            PLUGIN_NAME,
            env!("CARGO_PKG_VERSION"),
            "rust",
            [TOOL_LIST, TOOL_READ, TOOL_WRITE, TOOL_SEARCH],
        )
    }

    fn invoke(&self, tool: &str, args: &Value) -> Result<Value, ToolError> {
        match tool {
            TOOL_LIST => self.list(args),
            TOOL_READ => self.read(args),
            TOOL_WRITE => self.write(args),
            TOOL_SEARCH => self.search(args),
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Only UTF-8 content is supported; undecodable bytes are replaced on read.
fn check_encoding(args: &Value) -> Result<(), ToolError> {
    match text(args, "encoding") {
        None => Ok(()),
        Some(encoding) if matches!(encoding.to_ascii_lowercase().as_str(), "utf-8" | "utf8") => {
            Ok(())
        }
        Some(encoding) => Err(ToolError::new(format!("unsupported encoding: {encoding}"))),
    }
}

fn io_failure(action: &str, path: &str, error: &io::Error) -> ToolError {
    ToolError::new(format!("failed to {action} '{path}': {error}"))
}
