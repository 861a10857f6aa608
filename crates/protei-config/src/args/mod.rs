//! Command-line and environment settings shared by the binaries.

use std::path::{Path, PathBuf};

use clap::Args;
use protei_plugins::PluginDescriptor;

use crate::logging::LogFormat;
use crate::roster::{ConfigError, load_roster};

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Environment variable naming the roster file.
pub const CONFIG_PATH_ENV: &str = "PROTEI_CONFIG_PATH";

/// Environment variable holding the log filter.
pub const LOG_FILTER_ENV: &str = "PROTEI_LOG_FILTER";

/// Environment variable holding the log format.
pub const LOG_FORMAT_ENV: &str = "PROTEI_LOG_FORMAT";

/// Environment variable overriding the builtin plugin command.
pub const BUILTIN_COMMAND_ENV: &str = "PROTEI_BUILTIN_COMMAND";

/// Settings resolved from flags, falling back to environment variables and
/// then to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ConfigArgs {
    /// Path to the YAML plugin roster.
    #[arg(long, env = CONFIG_PATH_ENV, global = true, value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Tracing filter directive, for example `info` or `protei_plugins=debug`.
    #[arg(
        long,
        env = LOG_FILTER_ENV,
        global = true,
        default_value = DEFAULT_LOG_FILTER,
        value_name = "FILTER"
    )]
    pub log_filter: String,

    /// Log output format.
    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        global = true,
        default_value_t = LogFormat::default(),
        value_name = "FORMAT"
    )]
    pub log_format: LogFormat,

    /// Command line used to launch the builtin tools plugin, split on
    /// whitespace.
    #[arg(long, env = BUILTIN_COMMAND_ENV, global = true, value_name = "CMD")]
    pub builtin_command: Option<String>,
}

impl Default for ConfigArgs {
    fn default() -> Self {
        Self {
            config_path: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            builtin_command: None,
        }
    }
}

impl ConfigArgs {
    /// Returns the roster path, if one was configured.
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Returns the builtin plugin command override as argv.
    ///
    /// A blank override is treated as absent.
    #[must_use]
    pub fn builtin_command(&self) -> Option<Vec<String>> {
        let command: Vec<String> = self
            .builtin_command
            .as_deref()?
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        if command.is_empty() {
            None
        } else {
            Some(command)
        }
    }

    /// Loads the roster at the configured path, or the default roster.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the roster cannot be read or parsed.
    pub fn roster(&self) -> Result<Vec<PluginDescriptor>, ConfigError> {
        load_roster(self.config_path())
    }
}

#[cfg(test)]
mod tests;
