// SPDX-License-Identifier: MIT

use std::io::Write as _;
use std::sync::Arc;

use fs2::FileExt;
use thrum_core::{Clock, DaemonId, Repo, RepoId};
use thrum_storage::Store;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Running;
use crate::config::Config;
use crate::daemon::Daemon;
use crate::error::LifecycleError;
use crate::notify::bus::NotificationBus;
use crate::rpc::dispatch::Dispatcher;
use crate::rpc::{UnixServer, WsServer};
use crate::sync::{GitSyncLoop, PeerSyncLoop};

/// Brings the daemon up to the point of serving requests: lock, store,
/// identity, crash recovery, replication loops, both RPC listeners.
pub async fn startup<C: Clock + Send + Sync + 'static>(
    config: Arc<Config>,
    clock: C,
) -> Result<Running<C>, LifecycleError> {
    match startup_inner(config.clone(), clock).await {
        Ok(running) => Ok(running),
        Err(e) => {
            // A lock conflict means another instance owns these files —
            // touching them would be a race against a live daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&config);
            }
            Err(e)
        }
    }
}

async fn startup_inner<C: Clock + Send + Sync + 'static>(
    config: Arc<Config>,
    clock: C,
) -> Result<Running<C>, LifecycleError> {
    config.ensure_dirs()?;

    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let store = Arc::new(Store::open(&config.db_path)?);
    let now = clock.utc_now();

    let (repo_id, daemon_id) = match thrum_storage::repo::repo::load(&store)? {
        Some(repo) => (repo.repo_id, repo.daemon_id),
        None => {
            let repo = Repo { repo_id: RepoId::new(), daemon_id: DaemonId::new(), installed_at: now };
            thrum_storage::repo::repo::install(&store, &repo)?;
            (repo.repo_id, repo.daemon_id)
        }
    };
    info!(%repo_id, %daemon_id, "thrum identity resolved");

    let notify = Arc::new(NotificationBus::new());
    let daemon = Arc::new(Daemon::new(store, daemon_id, repo_id, clock, config.clone(), notify));

    thrum_storage::repo::groups::ensure_everyone(&daemon.store, now)?;
    recover_orphaned_sessions(&daemon);

    let git_sync = Arc::new(GitSyncLoop::spawn(daemon.clone()));
    let peer_sync = Arc::new(PeerSyncLoop::spawn(daemon.clone()));
    let dispatcher = Arc::new(Dispatcher::new(daemon.clone(), git_sync.clone(), peer_sync.clone()));

    let rpc_cancel = CancellationToken::new();
    spawn_unix_listener(&config, dispatcher.clone(), daemon.clone(), rpc_cancel.clone());

    // Bound last, after every fallible step above has succeeded (§4.11).
    let ws_port =
        WsServer::serve(config.ws_port, dispatcher, daemon.clone(), config.clone(), rpc_cancel.clone()).await?;
    std::fs::write(&config.port_path, ws_port.to_string())?;

    Ok(Running { daemon, ws_port, lock_file, git_sync, peer_sync, rpc_cancel })
}

fn spawn_unix_listener<C: Clock + Send + Sync + 'static>(
    config: &Arc<Config>,
    dispatcher: Arc<Dispatcher<C>>,
    daemon: Arc<Daemon<C>>,
    cancel: CancellationToken,
) {
    let socket_path = config.socket_path.clone();
    tokio::spawn(async move {
        if let Err(e) = UnixServer::serve(&socket_path, dispatcher, daemon, cancel).await {
            warn!(error = %e, "unix RPC listener exited");
        }
    });
}

/// A session still marked active at startup belonged to a process that
/// held the instance lock before us — since we just acquired it, that
/// process is gone, so every such session is a crash orphan (§4.11).
fn recover_orphaned_sessions<C: Clock>(daemon: &Daemon<C>) {
    let sessions = match thrum_storage::repo::sessions::list_all_active(&daemon.store) {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(error = %e, "failed to list active sessions for crash recovery");
            return;
        }
    };
    for session in sessions {
        if let Err(e) = daemon.end_session(&session.session_id, thrum_core::EndReason::Crash) {
            warn!(error = %e, session_id = %session.session_id, "failed to mark orphaned session as crashed");
        }
    }
}

fn cleanup_on_failure(config: &Config) {
    let _ = std::fs::remove_file(&config.socket_path);
    let _ = std::fs::remove_file(&config.port_path);
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
