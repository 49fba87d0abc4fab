// SPDX-License-Identifier: MIT

//! Session: an active work context for an agent (§3 "Session").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::agent::AgentId;
use crate::define_id;
use crate::scope::{Ref, Scope};

define_id! {
    pub struct SessionId("ses-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Normal,
    Crash,
    Superseded,
}

/// Git work context derived during a heartbeat (§4.6).
///
/// Every field is best-effort: a non-zero `git` exit or a timed-out
/// subprocess leaves the corresponding field `None`/empty rather than
/// failing the heartbeat (see SPEC_FULL.md's WorkContext supplement).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkContext {
    pub branch: Option<String>,
    pub worktree_path: Option<PathBuf>,
    pub uncommitted_files: Vec<String>,
    pub changed_files: Vec<String>,
    pub unmerged_commits: Vec<String>,
    pub git_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<EndReason>,
    pub intent: Option<String>,
    pub task: Option<String>,
    pub scopes: BTreeSet<Scope>,
    pub refs: BTreeSet<Ref>,
    pub last_heartbeat_at: DateTime<Utc>,
    pub work_context: WorkContext,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn new(agent_id: AgentId, now: DateTime<Utc>) -> Self {
        Self {
            session_id: SessionId::new(),
            agent_id,
            started_at: now,
            ended_at: None,
            end_reason: None,
            intent: None,
            task: None,
            scopes: BTreeSet::new(),
            refs: BTreeSet::new(),
            last_heartbeat_at: now,
            work_context: WorkContext::default(),
        }
    }

    /// Marks this session ended, per the "at most one active session per
    /// agent" invariant enforced by `SessionEngine::start` (§3, §4.6, §8-3).
    pub fn end(&mut self, now: DateTime<Utc>, reason: EndReason) {
        self.ended_at = Some(now);
        self.end_reason = Some(reason);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
