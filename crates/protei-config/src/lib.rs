//! Shared configuration for the Protei binaries.
//!
//! Configuration has two layers. Process-level settings (log filter, log
//! format, roster path and builtin plugin command) come from command-line
//! flags with environment variable fallbacks, see [`ConfigArgs`]. The plugin
//! roster itself lives in a YAML file loaded by [`load_roster`].

mod args;
mod logging;
mod roster;

pub use self::args::{
    BUILTIN_COMMAND_ENV, CONFIG_PATH_ENV, ConfigArgs, DEFAULT_LOG_FILTER, LOG_FILTER_ENV,
    LOG_FORMAT_ENV,
};
pub use self::logging::LogFormat;
pub use self::roster::{
    ConfigError, DEFAULT_ROSTER_ID, default_roster, load_roster, parse_roster,
};
