//! Process-backed JSON-RPC client for a single plugin.
//!
//! [`ProcessRpcClient`] owns one child process. Each call writes one request
//! line to the child's stdin and blocks until a response with the same id
//! arrives on stdout, the stream closes, or the bounded wait expires. A mutex
//! guards the whole exchange so at most one request is outstanding per
//! process.

mod lifecycle;
mod reader;

use std::fmt;
use std::io::{self, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use self::lifecycle::{kill_quietly, terminate_child};
use self::reader::{WaitError, await_response, spawn_stderr_drain, spawn_stdout_reader};
use crate::descriptor::PluginMeta;
use crate::error::PluginError;
use crate::protocol::{
    METHOD_GET_META, METHOD_INVOKE, METHOD_SHUTDOWN, RpcRequest, RpcResponse, encode_line,
};

/// Log target for client operations.
pub(crate) const CLIENT_TARGET: &str = "protei_plugins::client";

/// Wait applied to the courtesy `shutdown` request issued by [`ProcessRpcClient::stop`].
const SHUTDOWN_WAIT: Duration = Duration::from_secs(2);

/// Live resources of a started plugin.
struct RunningPlugin {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    next_id: i64,
}

impl RunningPlugin {
    fn next_request_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn send(&mut self, line: &str) -> io::Result<()> {
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.flush()
    }
}

enum ClientState {
    NotStarted,
    Running(RunningPlugin),
    Stopped,
}

/// Result of one request/response exchange before it is mapped to a
/// [`PluginError`].
enum Exchange {
    Answered(RpcResponse),
    WriteFailed(io::Error),
    Closed,
    TimedOut,
}

/// Client owning one plugin process.
///
/// # Example
///
/// ```no_run
/// use protei_plugins::ProcessRpcClient;
/// use serde_json::json;
///
/// let client = ProcessRpcClient::new(
///     "tools",
///     vec!["protei-plugin-tools".into(), "--serve".into()],
/// );
/// client.start()?;
/// let meta = client.fetch_meta()?;
/// assert!(meta.supports("echo"));
/// let echoed = client.invoke("echo", json!({"text": "hi"}))?;
/// assert_eq!(echoed, json!("hi"));
/// client.stop();
/// # Ok::<(), protei_plugins::PluginError>(())
/// ```
pub struct ProcessRpcClient {
    id: String,
    command: Vec<String>,
    timeout: Option<Duration>,
    state: Mutex<ClientState>,
}

impl ProcessRpcClient {
    /// Creates a client for `command` without starting it.
    ///
    /// Calls wait indefinitely until [`with_timeout`](Self::with_timeout)
    /// sets a bound.
    #[must_use]
    pub fn new(id: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            id: id.into(),
            command,
            timeout: None,
            state: Mutex::new(ClientState::NotStarted),
        }
    }

    /// Sets the bounded wait applied to each call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the plugin id used in errors and logs.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the command line the client launches.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Returns whether the plugin process is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.lock_state(), ClientState::Running(_))
    }

    /// Spawns the plugin process. Does nothing when it is already running.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Launch`] when the command is empty or the
    /// executable cannot be started.
    pub fn start(&self) -> Result<(), PluginError> {
        let mut state = self.lock_state();
        if matches!(*state, ClientState::Running(_)) {
            return Ok(());
        }
        *state = ClientState::Running(self.spawn()?);
        Ok(())
    }

    /// Sends one request and returns its result.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotRunning`] before `start`, after `stop`, or
    /// after the process died; [`PluginError::Terminated`] when the process
    /// closes its output first; [`PluginError::Timeout`] when the bounded wait
    /// expires (the process is killed); and [`PluginError::Remote`] when the
    /// plugin answers with an error.
    pub fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value, PluginError> {
        self.call_within(method, params, self.timeout)
    }

    /// Performs the `get_meta` handshake.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`call`](Self::call), or
    /// [`PluginError::InvalidResponse`] when the result is not an object.
    pub fn fetch_meta(&self) -> Result<PluginMeta, PluginError> {
        let result = self.call(METHOD_GET_META, Map::new())?;
        PluginMeta::from_handshake(&self.id, result)
    }

    /// Invokes `tool` with `args`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`call`](Self::call).
    pub fn invoke(&self, tool: &str, args: Value) -> Result<Value, PluginError> {
        let mut params = Map::new();
        params.insert(String::from("tool"), Value::String(tool.to_owned()));
        params.insert(String::from("args"), args);
        self.call(METHOD_INVOKE, params)
    }

    /// Asks the plugin to shut down and terminates the process.
    ///
    /// The `shutdown` request is best effort. The process gets a short grace
    /// period before it is killed. Safe to call repeatedly and on a client
    /// that never started.
    pub fn stop(&self) {
        if self.is_running()
            && let Err(error) = self.call_within(METHOD_SHUTDOWN, Map::new(), Some(SHUTDOWN_WAIT))
        {
            debug!(
                target: CLIENT_TARGET,
                plugin = %self.id,
                %error,
                "shutdown request failed"
            );
        }

        let mut state = self.lock_state();
        if let ClientState::Running(running) = std::mem::replace(&mut *state, ClientState::Stopped)
        {
            let RunningPlugin {
                mut child, stdin, ..
            } = running;
            drop(stdin);
            terminate_child(&self.id, &mut child);
            debug!(target: CLIENT_TARGET, plugin = %self.id, "plugin stopped");
        }
    }

    fn call_within(
        &self,
        method: &str,
        params: Map<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, PluginError> {
        let mut state = self.lock_state();
        let exchange = {
            let ClientState::Running(running) = &mut *state else {
                return Err(PluginError::NotRunning {
                    id: self.id.clone(),
                });
            };
            let request_id = running.next_request_id();
            let request = RpcRequest::new(request_id, method, params);
            let line = encode_line(&request).map_err(PluginError::SerializeRequest)?;

            debug!(
                target: CLIENT_TARGET,
                plugin = %self.id,
                method,
                id = request_id,
                "sending request"
            );

            match running.send(&line) {
                Err(error) => Exchange::WriteFailed(error),
                Ok(()) => match await_response(&mut running.lines, request_id, timeout) {
                    Ok(response) => Exchange::Answered(response),
                    Err(WaitError::Closed) => Exchange::Closed,
                    Err(WaitError::TimedOut) => Exchange::TimedOut,
                },
            }
        };

        match exchange {
            Exchange::Answered(response) => {
                response
                    .into_outcome()
                    .map_err(|error| PluginError::Remote {
                        id: self.id.clone(),
                        message: error.message().to_owned(),
                    })
            }
            Exchange::WriteFailed(error) if error.kind() == io::ErrorKind::BrokenPipe => {
                self.retire(&mut state, false);
                Err(self.terminated(method))
            }
            Exchange::WriteFailed(error) => Err(PluginError::Io {
                id: self.id.clone(),
                source: Arc::new(error),
            }),
            Exchange::Closed => {
                self.retire(&mut state, false);
                Err(self.terminated(method))
            }
            Exchange::TimedOut => {
                self.retire(&mut state, true);
                let wait = timeout.unwrap_or_default();
                Err(PluginError::Timeout {
                    id: self.id.clone(),
                    method: method.to_owned(),
                    timeout_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    /// Moves a failed plugin to the stopped state, reaping its process.
    fn retire(&self, state: &mut ClientState, kill: bool) {
        if let ClientState::Running(running) = std::mem::replace(state, ClientState::Stopped) {
            let RunningPlugin {
                mut child, stdin, ..
            } = running;
            drop(stdin);
            if kill {
                debug!(target: CLIENT_TARGET, plugin = %self.id, "killing unresponsive plugin");
                kill_quietly(&mut child);
            } else {
                terminate_child(&self.id, &mut child);
            }
        }
    }

    fn terminated(&self, method: &str) -> PluginError {
        PluginError::Terminated {
            id: self.id.clone(),
            method: method.to_owned(),
        }
    }

    fn spawn(&self) -> Result<RunningPlugin, PluginError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(self.launch_error(String::from("command is empty"), None));
        };

        debug!(
            target: CLIENT_TARGET,
            plugin = %self.id,
            program = %program,
            ?args,
            "spawning plugin process"
        );

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| {
                let message = if error.kind() == io::ErrorKind::NotFound {
                    format!("executable not found: {program}")
                } else {
                    format!("failed to start {program}")
                };
                self.launch_error(message, Some(error))
            })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            kill_quietly(&mut child);
            return Err(self.launch_error(String::from("failed to capture stdio"), None));
        };

        let readers = spawn_stdout_reader(&self.id, stdout)
            .and_then(|receiver| spawn_stderr_drain(&self.id, stderr).map(|()| receiver));
        let lines = match readers {
            Ok(receiver) => receiver,
            Err(error) => {
                kill_quietly(&mut child);
                return Err(self.launch_error(
                    String::from("failed to spawn output reader"),
                    Some(error),
                ));
            }
        };

        debug!(
            target: CLIENT_TARGET,
            plugin = %self.id,
            pid = child.id(),
            "plugin process spawned"
        );

        Ok(RunningPlugin {
            child,
            stdin,
            lines,
            next_id: 1,
        })
    }

    fn launch_error(&self, message: String, source: Option<io::Error>) -> PluginError {
        PluginError::Launch {
            id: self.id.clone(),
            message,
            source: source.map(Arc::new),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ProcessRpcClient {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let ClientState::Running(running) = state {
            kill_quietly(&mut running.child);
        }
    }
}

impl fmt::Debug for ProcessRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRpcClient")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .field("running", &self.is_running())
            .finish()
    }
}
