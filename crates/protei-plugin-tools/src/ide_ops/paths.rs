//! Lexical confinement of requested paths to a workspace root.

use std::path::{Component, Path, PathBuf};

use protei_plugins::server::ToolError;

/// Message reported when a request resolves outside the root.
pub(crate) const ESCAPES_ROOT: &str = "Path escapes root";

/// A workspace root that every requested path must stay inside.
///
/// Resolution is purely lexical: `.` and `..` are collapsed without touching
/// the file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates a workspace rooted at `root`, made absolute against the
    /// current directory.
    pub(crate) fn new(root: &Path) -> Result<Self, ToolError> {
        let absolute = std::path::absolute(root).map_err(|error| {
            ToolError::new(format!("invalid root '{}': {error}", root.display()))
        })?;
        Ok(Self {
            root: normalise(&absolute),
        })
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `requested` against the root. Absolute requests are accepted
    /// when they lie inside it.
    pub(crate) fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        let candidate = normalise(&self.root.join(requested));
        if candidate.starts_with(&self.root) {
            Ok(candidate)
        } else {
            Err(ToolError::new(ESCAPES_ROOT))
        }
    }

    /// Returns `path` relative to the root with `/` separators, or `.` for
    /// the root itself.
    pub(crate) fn relative(&self, path: &Path) -> String {
        let parts: Vec<String> = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            String::from(".")
        } else {
            parts.join("/")
        }
    }
}

/// Collapses `.` and `..` components. `..` at the root stays at the root.
pub(crate) fn normalise(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}
