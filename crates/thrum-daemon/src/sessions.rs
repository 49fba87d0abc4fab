// SPDX-License-Identifier: MIT

//! AgentRegistry + C6 SessionEngine (§4.6): agent registration/presence
//! and session lifecycle. Bundled in one module because every session
//! operation also touches the owning agent's `last_seen_at`, and the
//! spec's §4.6 groups both under one heading.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thrum_core::{
    derive_agent_id, is_active, Agent, AgentId, AgentKind, Clock, EndReason, Ref, Scope, Session,
    SessionId, WorkContext,
};
use thrum_wire::methods::RegisterStatus;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::daemon::Daemon;
use crate::error::{DaemonError, SessionError};

/// Each `git` invocation is capped at this long — a heartbeat must never
/// hang because a worktree is mid-rebase or on a stalled network mount
/// (§4.6 supplement, "boundary behaviors").
const GIT_SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RegisterRequest {
    pub name: Option<String>,
    pub role: String,
    pub module: String,
    pub kind: AgentKind,
    pub display: Option<String>,
    pub worktree_label: Option<String>,
    pub re_register: bool,
    pub force: bool,
}

impl<C: Clock> Daemon<C> {
    /// Registers or re-registers an agent (§4.6 "Registration rules").
    ///
    /// `agent_id` is deterministically derived from `(repo_id, name)` or
    /// `(repo_id, role, module)`, so a crashed-and-restarted agent with no
    /// persisted name rejoins its own identity rather than minting a new
    /// one. A name collision with a *different* derived id is a conflict
    /// unless `force` is set.
    pub fn register_agent(&self, req: RegisterRequest) -> Result<(AgentId, RegisterStatus), DaemonError> {
        let now = self.clock.utc_now();
        let agent_id = derive_agent_id(&self.repo_id, req.name.as_deref(), &req.role, &req.module);

        if let Some(name) = &req.name {
            if let Some(existing) = thrum_storage::repo::agents::find_by_name(&self.store, name).map_err(SessionError::from)? {
                if existing.agent_id != agent_id && !req.force {
                    return Ok((existing.agent_id, RegisterStatus::Conflict));
                }
            }
        }

        let existing = thrum_storage::repo::agents::find_by_id(&self.store, &agent_id).map_err(SessionError::from)?;
        let status = if existing.is_some() { RegisterStatus::Updated } else { RegisterStatus::Registered };

        let agent = Agent {
            agent_id,
            kind: req.kind,
            role: req.role,
            module: req.module,
            display: req.display,
            name: req.name,
            registered_at: existing.map(|a| a.registered_at).unwrap_or(now),
            last_seen_at: now,
            worktree_label: req.worktree_label,
        };
        thrum_storage::repo::agents::upsert(&self.store, &agent).map_err(SessionError::from)?;
        thrum_storage::event_log::append(
            &self.store,
            &self.daemon_id,
            &thrum_core::EventPayload::AgentRegistered {
                agent_id: agent.agent_id,
                snapshot: serde_json::to_value(&agent).map_err(|e| SessionError::NotFound(e.to_string()))?,
            },
            now,
        )
        .map_err(SessionError::from)?;

        Ok((agent_id, status))
    }

    pub fn list_agents(&self, role: Option<&str>) -> Result<Vec<Agent>, DaemonError> {
        let agents = match role {
            Some(role) => thrum_storage::repo::agents::list_by_role(&self.store, role),
            None => thrum_storage::repo::agents::list_all(&self.store),
        }
        .map_err(SessionError::from)?;
        Ok(agents)
    }

    pub fn whoami(&self, agent_id: &AgentId) -> Result<Option<Agent>, DaemonError> {
        Ok(thrum_storage::repo::agents::find_by_id(&self.store, agent_id).map_err(SessionError::from)?)
    }

    /// `team.list` (§6.1): every agent plus derived presence (§4.6).
    pub fn team_list(&self) -> Result<Vec<(Agent, bool)>, DaemonError> {
        let now = self.clock.utc_now();
        let agents = thrum_storage::repo::agents::list_all(&self.store).map_err(SessionError::from)?;
        Ok(agents.into_iter().map(|a| { let active = is_active(a.last_seen_at, now); (a, active) }).collect())
    }

    pub fn delete_agent(&self, agent_id: &AgentId) -> Result<(), DaemonError> {
        thrum_storage::repo::agents::delete(&self.store, agent_id).map_err(SessionError::from)?;
        Ok(())
    }

    /// `agent.cleanup` (§4.6): agents with no heartbeat for `stale_after`
    /// and no active session are candidates; only deleted when `force`.
    pub fn cleanup_agents(&self, force: bool, stale_after_days: u32) -> Result<(Vec<AgentId>, Vec<AgentId>), DaemonError> {
        let now = self.clock.utc_now();
        let stale_before = now - chrono::Duration::days(stale_after_days as i64);
        let stale = thrum_storage::repo::agents::list_stale(&self.store, stale_before).map_err(SessionError::from)?;
        let candidates: Vec<AgentId> = stale.iter().map(|a| a.agent_id).collect();

        let mut deleted = Vec::new();
        if force {
            for agent_id in &candidates {
                thrum_storage::repo::agents::delete(&self.store, agent_id).map_err(SessionError::from)?;
                deleted.push(*agent_id);
            }
        }
        Ok((candidates, deleted))
    }

    /// Starts a session for `agent_id`. Enforces "at most one active
    /// session per agent" (§3, §8-3) by ending any prior active session
    /// with [`EndReason::Superseded`] first.
    pub fn start_session(
        &self,
        agent_id: AgentId,
        intent: Option<String>,
        task: Option<String>,
        scopes: Vec<Scope>,
        refs: Vec<Ref>,
    ) -> Result<(SessionId, Option<SessionId>), DaemonError> {
        let now = self.clock.utc_now();
        let superseded = thrum_storage::repo::sessions::find_active_for_agent(&self.store, &agent_id).map_err(SessionError::from)?;
        if let Some(prior) = &superseded {
            thrum_storage::repo::sessions::end(&self.store, &prior.session_id, now, EndReason::Superseded)
                .map_err(SessionError::from)?;
            thrum_storage::event_log::append(
                &self.store,
                &self.daemon_id,
                &thrum_core::EventPayload::SessionEnded { session_id: prior.session_id, ended_at: now, reason: EndReason::Superseded },
                now,
            )
            .map_err(SessionError::from)?;
        }

        let mut session = Session::new(agent_id, now);
        session.intent = intent;
        session.task = task;
        session.scopes = scopes.into_iter().collect();
        session.refs = refs.into_iter().collect();

        thrum_storage::repo::sessions::insert(&self.store, &session).map_err(SessionError::from)?;
        thrum_storage::repo::agents::touch_last_seen(&self.store, &agent_id, now).map_err(SessionError::from)?;
        thrum_storage::event_log::append(
            &self.store,
            &self.daemon_id,
            &thrum_core::EventPayload::SessionStarted {
                session_id: session.session_id,
                agent_id,
                started_at: now,
                snapshot: serde_json::to_value(&session).map_err(|e| SessionError::NotFound(e.to_string()))?,
            },
            now,
        )
        .map_err(SessionError::from)?;

        Ok((session.session_id, superseded.map(|s| s.session_id)))
    }

    pub fn end_session(&self, session_id: &SessionId, reason: EndReason) -> Result<(), DaemonError> {
        let now = self.clock.utc_now();
        let session = thrum_storage::repo::sessions::find_by_id(&self.store, session_id)
            .map_err(SessionError::from)?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if !session.is_active() {
            return Err(SessionError::Conflict(format!("{session_id} is already ended")).into());
        }
        thrum_storage::repo::sessions::end(&self.store, session_id, now, reason).map_err(SessionError::from)?;
        thrum_storage::event_log::append(
            &self.store,
            &self.daemon_id,
            &thrum_core::EventPayload::SessionEnded { session_id: *session_id, ended_at: now, reason },
            now,
        )
        .map_err(SessionError::from)?;
        Ok(())
    }

    pub fn list_sessions(&self, agent_id: Option<&AgentId>, active_only: bool) -> Result<Vec<Session>, DaemonError> {
        let sessions = match agent_id {
            Some(agent_id) => thrum_storage::repo::sessions::list_for_agent(&self.store, agent_id).map_err(SessionError::from)?,
            None if active_only => thrum_storage::repo::sessions::list_all_active(&self.store).map_err(SessionError::from)?,
            None => {
                let mut out = Vec::new();
                for agent in thrum_storage::repo::agents::list_all(&self.store).map_err(SessionError::from)? {
                    out.extend(thrum_storage::repo::sessions::list_for_agent(&self.store, &agent.agent_id).map_err(SessionError::from)?);
                }
                out
            }
        };
        Ok(if active_only { sessions.into_iter().filter(|s| s.is_active()).collect() } else { sessions })
    }

    pub fn set_intent(&self, session_id: &SessionId, intent: &str) -> Result<(), DaemonError> {
        thrum_storage::repo::sessions::set_intent(&self.store, session_id, intent).map_err(SessionError::from)?;
        Ok(())
    }

    pub fn set_task(&self, session_id: &SessionId, task: &str) -> Result<(), DaemonError> {
        thrum_storage::repo::sessions::set_task(&self.store, session_id, task).map_err(SessionError::from)?;
        Ok(())
    }

    /// Applies a heartbeat's scope/ref deltas, refreshes `last_seen_at`
    /// for the owning agent, and re-extracts `WorkContext` from
    /// `worktree_path` (§4.6).
    pub async fn heartbeat(
        &self,
        session_id: &SessionId,
        add_scopes: Vec<Scope>,
        remove_scopes: Vec<Scope>,
        add_refs: Vec<Ref>,
        remove_refs: Vec<Ref>,
        worktree_path: &Path,
    ) -> Result<WorkContext, DaemonError> {
        let now = self.clock.utc_now();
        let session = thrum_storage::repo::sessions::find_by_id(&self.store, session_id)
            .map_err(SessionError::from)?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if !session.is_active() {
            return Err(SessionError::NoActiveSession.into());
        }

        let mut scopes = session.scopes.clone();
        for s in add_scopes {
            scopes.insert(s);
        }
        for s in &remove_scopes {
            scopes.remove(s);
        }
        let mut refs = session.refs.clone();
        for r in add_refs {
            refs.insert(r);
        }
        for r in &remove_refs {
            refs.remove(r);
        }

        let work_context = WorkContextExtractor::extract(worktree_path, now).await;

        thrum_storage::repo::sessions::heartbeat(&self.store, session_id, now, &scopes, &refs, &work_context)
            .map_err(SessionError::from)?;
        thrum_storage::repo::agents::touch_last_seen(&self.store, &session.agent_id, now).map_err(SessionError::from)?;
        thrum_storage::event_log::append(
            &self.store,
            &self.daemon_id,
            &thrum_core::EventPayload::SessionHeartbeat { session_id: *session_id, at: now },
            now,
        )
        .map_err(SessionError::from)?;

        Ok(work_context)
    }
}

/// Derives [`WorkContext`] from `git` state in `worktree_path`. Every
/// field is best-effort: a non-zero exit or a timed-out subprocess leaves
/// it `None`/empty rather than failing the heartbeat (§4.6 supplement).
struct WorkContextExtractor;

impl WorkContextExtractor {
    async fn extract(worktree_path: &Path, at: DateTime<Utc>) -> WorkContext {
        let branch = Self::run(worktree_path, &["rev-parse", "--abbrev-ref", "HEAD"]).await;
        let status = Self::run(worktree_path, &["status", "--porcelain"]).await;
        let unmerged = Self::run(worktree_path, &["log", "--oneline", "@{u}..HEAD"]).await;

        let (uncommitted_files, changed_files) = match &status {
            Some(out) => {
                let mut uncommitted = Vec::new();
                let mut changed = Vec::new();
                for line in out.lines() {
                    if let Some(path) = line.get(3..) {
                        uncommitted.push(path.to_string());
                        changed.push(path.to_string());
                    }
                }
                (uncommitted, changed)
            }
            None => (Vec::new(), Vec::new()),
        };

        WorkContext {
            branch,
            worktree_path: Some(worktree_path.to_path_buf()),
            uncommitted_files,
            changed_files,
            unmerged_commits: unmerged.map(|s| s.lines().map(str::to_string).collect()).unwrap_or_default(),
            git_updated_at: Some(at),
        }
    }

    async fn run(cwd: &Path, args: &[&str]) -> Option<String> {
        let mut cmd = Command::new("git");
        cmd.current_dir(cwd).args(args);
        match timeout(GIT_SUBPROCESS_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(Ok(output)) => {
                debug!(code = ?output.status.code(), args = ?args, "git subprocess exited non-zero");
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

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
