//! Roster start-up and capability routing.
//!
//! The [`Orchestrator`] starts one client per [`PluginDescriptor`], performs
//! the `get_meta` handshake, and registers the plugin under its descriptor id.
//! Invocations are routed to the first registered plugin whose capability set
//! contains the requested tool.
//!
//! Clients are produced by a [`PluginLauncher`] so tests can substitute
//! in-memory doubles for real processes.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::ProcessRpcClient;
use crate::descriptor::{PluginDescriptor, PluginMeta, default_builtin_command};
use crate::error::PluginError;

/// Log target for orchestrator operations.
const ORCHESTRATOR_TARGET: &str = "protei_plugins::orchestrator";

/// Operations the orchestrator needs from a plugin client.
///
/// The production implementation is [`ProcessRpcClient`].
pub trait PluginClient {
    /// Starts the plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Launch`] when the plugin cannot be started.
    fn start(&self) -> Result<(), PluginError>;

    /// Performs the `get_meta` handshake.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying call.
    fn fetch_meta(&self) -> Result<PluginMeta, PluginError>;

    /// Invokes `tool` with `args`.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying call.
    fn invoke(&self, tool: &str, args: Value) -> Result<Value, PluginError>;

    /// Shuts the plugin down. Must be idempotent.
    fn stop(&self);
}

impl PluginClient for ProcessRpcClient {
    fn start(&self) -> Result<(), PluginError> {
        Self::start(self)
    }

    fn fetch_meta(&self) -> Result<PluginMeta, PluginError> {
        Self::fetch_meta(self)
    }

    fn invoke(&self, tool: &str, args: Value) -> Result<Value, PluginError> {
        Self::invoke(self, tool, args)
    }

    fn stop(&self) {
        Self::stop(self);
    }
}

/// Factory producing an unstarted client for a descriptor.
///
/// # Example
///
/// ```
/// use protei_plugins::{PluginDescriptor, PluginLauncher, ProcessLauncher};
///
/// let descriptor = PluginDescriptor::process("echo", vec!["cat".into()]);
/// let client = ProcessLauncher.prepare(&descriptor, descriptor.command().to_vec());
/// assert!(!client.is_running());
/// ```
pub trait PluginLauncher {
    /// Client type produced by this launcher.
    type Client: PluginClient;

    /// Creates a client that will run `command` for `descriptor`.
    fn prepare(&self, descriptor: &PluginDescriptor, command: Vec<String>) -> Self::Client;
}

/// Launcher producing [`ProcessRpcClient`]s bounded by the descriptor timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl PluginLauncher for ProcessLauncher {
    type Client = ProcessRpcClient;

    fn prepare(&self, descriptor: &PluginDescriptor, command: Vec<String>) -> Self::Client {
        ProcessRpcClient::new(descriptor.id(), command).with_timeout(descriptor.timeout())
    }
}

/// Result of starting one roster entry.
#[derive(Debug)]
pub enum StartOutcome {
    /// The plugin started and completed its handshake.
    Started {
        /// Descriptor id.
        id: String,
        /// Metadata reported by the plugin.
        meta: PluginMeta,
    },
    /// An optional plugin failed to start and was skipped.
    SkippedOptional {
        /// Descriptor id.
        id: String,
        /// Failure that caused the skip.
        error: PluginError,
    },
    /// A mandatory plugin failed to start.
    FailedFatal {
        /// Descriptor id.
        id: String,
        /// Failure that aborts start-up.
        error: PluginError,
    },
}

impl StartOutcome {
    /// Returns the descriptor id the outcome refers to.
    #[must_use]
    pub const fn id(&self) -> &str {
        match self {
            Self::Started { id, .. }
            | Self::SkippedOptional { id, .. }
            | Self::FailedFatal { id, .. } => id.as_str(),
        }
    }

    /// Returns whether the plugin was registered.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

struct RegisteredPlugin<C> {
    id: String,
    meta: PluginMeta,
    client: C,
}

/// Owns every started plugin and routes invocations by capability.
///
/// # Example
///
/// ```no_run
/// use protei_plugins::{Orchestrator, PluginDescriptor};
/// use serde_json::json;
///
/// let mut orchestrator = Orchestrator::new();
/// orchestrator.start(&[PluginDescriptor::builtin("tools")])?;
/// let sum = orchestrator.invoke("math.add", json!({"a": 2, "b": 3}))?;
/// assert_eq!(sum, json!(5));
/// orchestrator.stop();
/// # Ok::<(), protei_plugins::PluginError>(())
/// ```
pub struct Orchestrator<L: PluginLauncher = ProcessLauncher> {
    launcher: L,
    builtin_command: Vec<String>,
    plugins: Vec<RegisteredPlugin<L::Client>>,
}

impl Orchestrator<ProcessLauncher> {
    /// Creates an orchestrator that launches real processes and finds the
    /// builtin tools plugin next to the running executable.
    #[must_use]
    pub fn new() -> Self {
        Self::with_launcher(ProcessLauncher)
    }
}

impl Default for Orchestrator<ProcessLauncher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: PluginLauncher> Orchestrator<L> {
    /// Creates an orchestrator using `launcher` to produce clients.
    #[must_use]
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            launcher,
            builtin_command: default_builtin_command(),
            plugins: Vec::new(),
        }
    }

    /// Overrides the command used for builtin descriptors.
    #[must_use]
    pub fn with_builtin_command(mut self, command: Vec<String>) -> Self {
        self.builtin_command = command;
        self
    }

    /// Returns the command used for builtin descriptors.
    #[must_use]
    pub fn builtin_command(&self) -> &[String] {
        &self.builtin_command
    }

    /// Starts every descriptor in roster order.
    ///
    /// Optional plugins that fail are skipped. Plugins started before a
    /// mandatory failure stay registered; call [`stop`](Self::stop) either
    /// way.
    ///
    /// # Errors
    ///
    /// Returns the error of the first mandatory plugin that fails to start.
    pub fn start(&mut self, roster: &[PluginDescriptor]) -> Result<Vec<StartOutcome>, PluginError> {
        let mut outcomes = Vec::with_capacity(roster.len());
        for descriptor in roster {
            match self.start_plugin(descriptor) {
                StartOutcome::FailedFatal { id, error: failure } => {
                    error!(
                        target: ORCHESTRATOR_TARGET,
                        plugin = %id,
                        error = %failure,
                        "mandatory plugin failed to start"
                    );
                    return Err(failure);
                }
                outcome => outcomes.push(outcome),
            }
        }
        Ok(outcomes)
    }

    /// Starts a single descriptor and registers it on success.
    pub fn start_plugin(&mut self, descriptor: &PluginDescriptor) -> StartOutcome {
        let id = descriptor.id().to_owned();
        match self.try_start(descriptor) {
            Ok(meta) => {
                info!(
                    target: ORCHESTRATOR_TARGET,
                    plugin = %id,
                    name = meta.name(),
                    version = meta.version(),
                    language = meta.language(),
                    capabilities = ?meta.capabilities(),
                    "plugin started"
                );
                StartOutcome::Started { id, meta }
            }
            Err(failure) if descriptor.is_optional() => {
                warn!(
                    target: ORCHESTRATOR_TARGET,
                    plugin = %id,
                    error = %failure,
                    "skipping optional plugin"
                );
                StartOutcome::SkippedOptional { id, error: failure }
            }
            Err(failure) => StartOutcome::FailedFatal { id, error: failure },
        }
    }

    fn try_start(&mut self, descriptor: &PluginDescriptor) -> Result<PluginMeta, PluginError> {
        descriptor.validate()?;
        let id = descriptor.id();
        if self.plugins.iter().any(|plugin| plugin.id == id) {
            return Err(PluginError::Descriptor {
                message: format!("plugin '{id}' is already registered"),
            });
        }

        let command = descriptor.resolve_command(&self.builtin_command)?;
        let client = self.launcher.prepare(descriptor, command);
        client.start()?;
        let meta = match client.fetch_meta() {
            Ok(meta) => meta,
            Err(failure) => {
                client.stop();
                return Err(failure);
            }
        };

        if meta.capabilities().is_empty() {
            warn!(
                target: ORCHESTRATOR_TARGET,
                plugin = id,
                "plugin declares no capabilities"
            );
        }

        self.plugins.push(RegisteredPlugin {
            id: id.to_owned(),
            meta: meta.clone(),
            client,
        });
        Ok(meta)
    }

    /// Returns the metadata of every registered plugin in registration order.
    #[must_use]
    pub fn list_plugins(&self) -> Vec<&PluginMeta> {
        self.plugins.iter().map(|plugin| &plugin.meta).collect()
    }

    /// Returns the descriptor ids of registered plugins in registration
    /// order.
    #[must_use]
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.id.as_str()).collect()
    }

    /// Invokes `tool` on the first registered plugin that declares it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnsupportedTool`] without touching any process
    /// when no plugin declares `tool`, otherwise any error from the plugin
    /// call.
    pub fn invoke(&self, tool: &str, args: Value) -> Result<Value, PluginError> {
        let plugin = self
            .plugins
            .iter()
            .find(|candidate| candidate.meta.supports(tool))
            .ok_or_else(|| PluginError::UnsupportedTool {
                tool: tool.to_owned(),
            })?;

        debug!(
            target: ORCHESTRATOR_TARGET,
            plugin = %plugin.id,
            tool,
            "routing invocation"
        );
        plugin.client.invoke(tool, args)
    }

    /// Stops every plugin and clears the registry. Safe to call repeatedly.
    ///
    /// A client whose `stop` panics is logged and does not prevent the
    /// remaining plugins from being stopped.
    pub fn stop(&mut self) {
        for plugin in self.plugins.drain(..) {
            debug!(target: ORCHESTRATOR_TARGET, plugin = %plugin.id, "stopping plugin");
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| plugin.client.stop()));
            if let Err(payload) = outcome {
                warn!(
                    target: ORCHESTRATOR_TARGET,
                    plugin = %plugin.id,
                    panic = panic_detail(&*payload),
                    "plugin client panicked while stopping"
                );
            }
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl<L: PluginLauncher> fmt::Debug for Orchestrator<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("builtin_command", &self.builtin_command)
            .field("plugins", &self.plugin_ids())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
