//! Child process teardown.

use std::process::Child;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::CLIENT_TARGET;

/// Time a plugin is given to exit on its own before it is killed.
const GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Waits briefly for the child to exit, killing it if it does not.
pub(super) fn terminate_child(plugin_id: &str, child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(target: CLIENT_TARGET, plugin = plugin_id, ?status, "plugin exited");
            return;
        }
        Ok(None) => {}
        Err(error) => {
            warn!(
                target: CLIENT_TARGET,
                plugin = plugin_id,
                %error,
                "failed to check plugin status, waiting before killing"
            );
        }
    }

    thread::sleep(GRACE_PERIOD);
    if let Ok(Some(status)) = child.try_wait() {
        debug!(
            target: CLIENT_TARGET,
            plugin = plugin_id,
            ?status,
            "plugin exited during grace period"
        );
        return;
    }

    warn!(
        target: CLIENT_TARGET,
        plugin = plugin_id,
        "plugin did not exit gracefully, killing"
    );
    kill_quietly(child);
}

/// Kills and reaps the child, ignoring failures from an already dead process.
pub(super) fn kill_quietly(child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(target: CLIENT_TARGET, %error, "plugin kill failed");
    }
    if let Err(error) = child.wait() {
        debug!(target: CLIENT_TARGET, %error, "plugin reap failed");
    }
}
