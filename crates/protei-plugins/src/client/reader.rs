//! Background readers for plugin output streams and response correlation.

use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::CLIENT_TARGET;
use crate::protocol::{RpcResponse, decode_response};

/// Output lines buffered between the reader thread and the caller.
///
/// Once full, the reader thread stops reading until a call drains the queue,
/// which in turn blocks a plugin that keeps printing while idle.
pub(crate) const STDOUT_BACKLOG: usize = 1024;

/// Why no further line could be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitError {
    /// The stream reached end of file.
    Closed,
    /// The deadline passed before a line arrived.
    TimedOut,
}

/// A blocking source of raw output lines.
pub(crate) trait LineSource {
    /// Returns the next line, waiting no later than `deadline` when one is
    /// given.
    fn next_line(&mut self, deadline: Option<Instant>) -> Result<String, WaitError>;
}

impl LineSource for Receiver<String> {
    fn next_line(&mut self, deadline: Option<Instant>) -> Result<String, WaitError> {
        let Some(limit) = deadline else {
            return self.recv().map_err(|_| WaitError::Closed);
        };
        let remaining = limit.saturating_duration_since(Instant::now());
        self.recv_timeout(remaining).map_err(|error| match error {
            RecvTimeoutError::Timeout => WaitError::TimedOut,
            RecvTimeoutError::Disconnected => WaitError::Closed,
        })
    }
}

/// Reads lines until one decodes as a response carrying `request_id`.
///
/// Undecodable lines and responses for other ids are discarded.
pub(crate) fn await_response(
    source: &mut impl LineSource,
    request_id: i64,
    timeout: Option<Duration>,
) -> Result<RpcResponse, WaitError> {
    let deadline = timeout.map(|wait| Instant::now() + wait);
    loop {
        let line = source.next_line(deadline)?;
        match decode_response(&line) {
            Some(response) if response.id() == request_id => return Ok(response),
            Some(response) => {
                warn!(
                    target: CLIENT_TARGET,
                    expected = request_id,
                    received = response.id(),
                    "skipping response with non-matching id"
                );
            }
            None => {
                debug!(
                    target: CLIENT_TARGET,
                    line = line.trim_end(),
                    "skipping non-protocol output line"
                );
            }
        }
    }
}

/// Spawns a thread forwarding each stdout line to the returned channel.
///
/// At most [`STDOUT_BACKLOG`] lines are queued. The channel disconnects when
/// the plugin closes its stdout.
pub(crate) fn spawn_stdout_reader(
    plugin_id: &str,
    stdout: impl Read + Send + 'static,
) -> std::io::Result<Receiver<String>> {
    let (sender, receiver) = mpsc::sync_channel(STDOUT_BACKLOG);
    let id = plugin_id.to_owned();
    thread::Builder::new()
        .name(format!("plugin-stdout-{plugin_id}"))
        .spawn(move || {
            for_each_line(stdout, |line| sender.send(line).is_ok());
            debug!(target: CLIENT_TARGET, plugin = %id, "plugin stdout closed");
        })?;
    Ok(receiver)
}

/// Spawns a thread logging each stderr line at debug level.
pub(crate) fn spawn_stderr_drain(
    plugin_id: &str,
    stderr: impl Read + Send + 'static,
) -> std::io::Result<()> {
    let id = plugin_id.to_owned();
    thread::Builder::new()
        .name(format!("plugin-stderr-{plugin_id}"))
        .spawn(move || {
            for_each_line(stderr, |line| {
                debug!(target: CLIENT_TARGET, plugin = %id, line = line.trim_end(), "plugin stderr");
                true
            });
        })?;
    Ok(())
}

/// Feeds lossily decoded lines to `sink` until end of file, a read error, or
/// `sink` returning `false`.
fn for_each_line(stream: impl Read, mut sink: impl FnMut(String) -> bool) {
    let mut reader = BufReader::new(stream);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => return,
            Ok(_) => {
                if !sink(String::from_utf8_lossy(&buffer).into_owned()) {
                    return;
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => {}
            Err(error) => {
                debug!(target: CLIENT_TARGET, %error, "plugin stream read failed");
                return;
            }
        }
    }
}
