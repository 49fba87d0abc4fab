// SPDX-License-Identifier: MIT

use thrum_core::Clock;
use tracing::{info, warn};

use super::Running;

/// Reverses [`super::startup`] in order: stop accepting connections,
/// cancel the replication loops, remove the socket/port files, then
/// release the instance lock and remove the PID/lock file last (§4.11).
pub fn shutdown<C: Clock>(running: Running<C>) {
    info!("thrum daemon shutting down");

    running.rpc_cancel.cancel();
    running.git_sync.shutdown();
    running.peer_sync.shutdown();

    let config = running.daemon.config.clone();
    if config.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.socket_path) {
            warn!(error = %e, "failed to remove socket file");
        }
    }
    if config.port_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.port_path) {
            warn!(error = %e, "failed to remove port file");
        }
    }

    // Dropping the lock file releases the fs2 advisory lock; only then is
    // it safe to remove it, so a racing startup can't see a gap where the
    // path exists but nothing holds it.
    drop(running.lock_file);
    if let Err(e) = std::fs::remove_file(&config.lock_path) {
        warn!(error = %e, "failed to remove lock file");
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
