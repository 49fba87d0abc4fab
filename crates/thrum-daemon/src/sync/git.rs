// SPDX-License-Identifier: MIT

//! C9 GitSyncLoop (§4.9): replication via a dedicated `a-sync` branch
//! mounted as an auxiliary worktree at `.git/thrum-sync/a-sync`.
//!
//! Layout on that branch: one append-only file per producing daemon,
//! `events/<daemon_id>.jsonl`, one JSON `Event` per line. The file set and
//! its contents are opaque to everything except this loop and the
//! Projector that replays them — §4.9 only constrains the invariants, not
//! the encoding.
//!
//! Grounded on `WorkContextExtractor`'s subprocess-with-timeout style
//! (`crate::sessions`): every `git` invocation here goes through the same
//! bounded `tokio::process::Command` + `tokio::time::timeout` pattern.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thrum_core::{Clock, Event};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::daemon::Daemon;

const GIT_SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(10);
const SYNC_AUTHOR: &str = "Thrum <thrum@local>";
const SYNC_BRANCH: &str = "a-sync";
const SYNC_REMOTE: &str = "origin";

/// Loop status, exposed verbatim via RPC `sync.status` (§4.9 step 6).
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    pub local_only: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct GitSyncHandle {
    pub status: Arc<Mutex<SyncStatus>>,
    force: mpsc::Sender<()>,
    cancel: CancellationToken,
}

impl GitSyncHandle {
    /// `sync.force` (§4.9): triggers one cycle immediately, independent of
    /// the periodic timer. Best-effort — if a cycle is already running the
    /// request is simply coalesced into a pending one.
    pub async fn force(&self) -> bool {
        self.force.send(()).await.is_ok()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.lock().clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

pub struct GitSyncLoop<C: Clock> {
    daemon: Arc<Daemon<C>>,
    repo_root: PathBuf,
    worktree_path: PathBuf,
    interval: Duration,
    status: Arc<Mutex<SyncStatus>>,
}

impl<C: Clock + Send + Sync + 'static> GitSyncLoop<C> {
    /// Spawns the loop on its own task and returns a handle for
    /// `sync.force`/`sync.status` and shutdown (§4.9, §5 "never blocks RPC").
    pub fn spawn(daemon: Arc<Daemon<C>>) -> GitSyncHandle {
        let repo_root = daemon.config.repo_root.clone();
        let worktree_path = daemon.config.sync_worktree_path.clone();
        let interval = daemon.config.sync_interval;
        let local_only = daemon.config.local_only;

        let status = Arc::new(Mutex::new(SyncStatus { local_only, ..Default::default() }));
        let (force_tx, mut force_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let loop_state = GitSyncLoop { daemon, repo_root, worktree_path, interval, status: status.clone() };
        let loop_cancel = cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(loop_state.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = force_rx.recv() => {}
                    _ = loop_cancel.cancelled() => break,
                }
                loop_state.run_cycle().await;
            }
        });

        GitSyncHandle { status, force: force_tx, cancel }
    }
}

impl<C: Clock> GitSyncLoop<C> {
    async fn run_cycle(&self) {
        debug!("git sync cycle starting");
        let no_remote = !self.has_remote().await;
        let local_only = self.daemon.config.local_only || no_remote;

        if let Err(e) = self.ensure_worktree().await {
            self.record_error(format!("worktree setup failed: {e}"));
            return;
        }

        if !local_only {
            if let Err(e) = self.fetch().await {
                warn!(error = %e, "git fetch failed, continuing with local state");
                self.record_error(format!("fetch failed: {e}"));
            } else if let Err(e) = self.fast_forward_local().await {
                warn!(error = %e, "git fast-forward failed");
                self.record_error(format!("fast-forward failed: {e}"));
            }
        }

        if let Err(e) = self.import_foreign_events().await {
            warn!(error = %e, "importing foreign events failed");
            self.record_error(format!("import failed: {e}"));
        }

        if let Err(e) = self.export_local_events().await {
            warn!(error = %e, "exporting local events failed");
            self.record_error(format!("export failed: {e}"));
            return;
        }

        let committed = match self.commit_if_dirty().await {
            Ok(c) => c,
            Err(e) => {
                self.record_error(format!("commit failed: {e}"));
                return;
            }
        };

        if !local_only && committed {
            if let Err(e) = self.push().await {
                warn!(error = %e, "git push failed");
                self.record_error(format!("push failed: {e}"));
                return;
            }
        }

        let mut status = self.status.lock();
        status.local_only = local_only;
        status.last_sync_at = Some(self.daemon.clock.utc_now());
        status.last_error = None;
        debug!("git sync cycle complete");
    }

    fn record_error(&self, message: String) {
        self.status.lock().last_error = Some(message);
    }

    async fn has_remote(&self) -> bool {
        matches!(self.run(&self.repo_root, &["remote", "get-url", SYNC_REMOTE]).await, Some(_))
    }

    /// Mounts `a-sync` as an auxiliary worktree if it is not already
    /// present (§6.2 "materialized as an auxiliary Git worktree").
    async fn ensure_worktree(&self) -> Result<(), String> {
        if self.worktree_path.is_dir() {
            return Ok(());
        }
        if let Some(parent) = self.worktree_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| e.to_string())?;
        }
        let path = self.worktree_path.to_string_lossy().to_string();
        if self.run(&self.repo_root, &["worktree", "add", &path, SYNC_BRANCH]).await.is_some() {
            return Ok(());
        }
        // Branch doesn't exist anywhere yet — create it fresh off HEAD.
        self.run(&self.repo_root, &["worktree", "add", "-b", SYNC_BRANCH, &path])
            .await
            .map(|_| ())
            .ok_or_else(|| "git worktree add failed".to_string())
    }

    async fn fetch(&self) -> Result<(), String> {
        self.run(&self.repo_root, &["fetch", SYNC_REMOTE, SYNC_BRANCH])
            .await
            .map(|_| ())
            .ok_or_else(|| "git fetch failed".to_string())
    }

    async fn fast_forward_local(&self) -> Result<(), String> {
        let remote_ref = format!("{SYNC_REMOTE}/{SYNC_BRANCH}");
        if self.run(&self.worktree_path, &["rev-parse", "--verify", &remote_ref]).await.is_none() {
            // Nothing fetched yet (first run against a brand new remote branch).
            return Ok(());
        }
        self.run(&self.worktree_path, &["merge", "--ff-only", &remote_ref])
            .await
            .map(|_| ())
            .ok_or_else(|| "fast-forward merge failed (diverged history)".to_string())
    }

    /// Reads every `events/*.jsonl` file except this daemon's own and feeds
    /// its contents through the Projector, keyed per source so repeated
    /// full rereads stay idempotent (§4.2 idempotence contract).
    async fn import_foreign_events(&self) -> Result<(), String> {
        let events_dir = self.worktree_path.join("events");
        let mut read_dir = match tokio::fs::read_dir(&events_dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.to_string()),
        };

        while let Some(entry) = read_dir.next_entry().await.map_err(|e| e.to_string())? {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let source_daemon_id = thrum_core::DaemonId::from_string(stem.to_string());
            if source_daemon_id == self.daemon.daemon_id {
                continue;
            }
            let contents = tokio::fs::read_to_string(&path).await.map_err(|e| e.to_string())?;
            let events: Vec<Event> = contents
                .lines()
                .filter(|l| !l.trim().is_empty())
                .filter_map(|line| serde_json::from_str(line).ok())
                .collect();
            if events.is_empty() {
                continue;
            }
            thrum_storage::projector::apply_and_advance(&self.daemon.store, &source_daemon_id, &events)
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Appends this daemon's own events produced since the last export
    /// (tracked via the same `applied_cursor` table, keyed by this
    /// daemon's own id — a natural reuse: "how far has source X been
    /// consumed" applies equally to "how far have I exported myself").
    async fn export_local_events(&self) -> Result<(), String> {
        let since = thrum_storage::repo::cursor::get(&self.daemon.store, &self.daemon.daemon_id).map_err(|e| e.to_string())?;
        let events = thrum_storage::event_log::entries_after(&self.daemon.store, &self.daemon.daemon_id, since)
            .map_err(|e| e.to_string())?;
        if events.is_empty() {
            return Ok(());
        }

        let events_dir = self.worktree_path.join("events");
        tokio::fs::create_dir_all(&events_dir).await.map_err(|e| e.to_string())?;
        let file_path = events_dir.join(format!("{}.jsonl", self.daemon.daemon_id));

        let mut buf = String::new();
        let mut latest = since;
        for event in &events {
            buf.push_str(&serde_json::to_string(event).map_err(|e| e.to_string())?);
            buf.push('\n');
            latest = event.sequence;
        }
        append_to_file(&file_path, &buf).await.map_err(|e| e.to_string())?;

        thrum_storage::repo::cursor::advance(&self.daemon.store, &self.daemon.daemon_id, latest).map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Commits whatever `export_local_events`/the import step changed.
    /// Returns `false` with no commit if the worktree is clean ("nothing
    /// to commit" is not an error, §4.9 step 4).
    async fn commit_if_dirty(&self) -> Result<bool, String> {
        let status = self
            .run(&self.worktree_path, &["status", "--porcelain"])
            .await
            .ok_or_else(|| "git status failed".to_string())?;
        if status.trim().is_empty() {
            return Ok(false);
        }
        self.run(&self.worktree_path, &["add", "-A"]).await.ok_or_else(|| "git add failed".to_string())?;
        self.run(
            &self.worktree_path,
            &["commit", "--no-verify", "--allow-empty", "--author", SYNC_AUTHOR, "-m", "sync"],
        )
        .await
        .ok_or_else(|| "git commit failed".to_string())?;
        Ok(true)
    }

    async fn push(&self) -> Result<(), String> {
        self.run(&self.worktree_path, &["push", SYNC_REMOTE, SYNC_BRANCH])
            .await
            .map(|_| ())
            .ok_or_else(|| "git push failed".to_string())
    }

    async fn run(&self, cwd: &Path, args: &[&str]) -> Option<String> {
        let mut cmd = Command::new("git");
        cmd.current_dir(cwd).args(args);
        #[cfg(unix)]
        cmd.kill_on_drop(true);

        match timeout(GIT_SUBPROCESS_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => Some(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            Ok(Ok(output)) => {
                debug!(code = ?output.status.code(), args = ?args, stderr = %String::from_utf8_lossy(&output.stderr), "git subprocess exited non-zero");
                None
            }
            Ok(Err(e)) => {
                debug!(error = %e, args = ?args, "git subprocess failed to spawn");
                None
            }
            Err(_) => {
                debug!(args = ?args, "git subprocess timed out");
                None
            }
        }
    }
}

async fn append_to_file(path: &Path, contents: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;
    let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(contents.as_bytes()).await
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
