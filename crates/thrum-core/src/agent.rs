// SPDX-License-Identifier: MIT

//! Agent identity (§3 "Agent").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::define_id;
use crate::repo::RepoId;

define_id! {
    /// Opaque identity for an agent or user registered in a repo.
    pub struct AgentId("agt-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Agent,
    User,
}

/// An identity registered to act in a repo.
///
/// Invariants (§3): `(repo_id, name)` is unique when `name` is set;
/// re-registering with the same derivation key is idempotent and only
/// updates mutable fields (`display`, `last_seen_at`, `worktree_label`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    pub kind: AgentKind,
    pub role: String,
    pub module: String,
    pub display: Option<String>,
    pub name: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub worktree_label: Option<String>,
}

/// Derives a stable `AgentId` from either an explicit human-chosen name,
/// or deterministically from `(repo_id, role, module)` when unnamed.
///
/// Deterministic derivation is what makes re-registration idempotent: the
/// same `(repo_id, role, module)` triple always yields the same agent_id,
/// so a crashed-and-restarted agent with no persisted name rejoins its own
/// identity instead of minting a new one.
pub fn derive_agent_id(repo_id: &RepoId, name: Option<&str>, role: &str, module: &str) -> AgentId {
    match name {
        Some(name) if !name.is_empty() => {
            let mut hasher = Sha256::new();
            hasher.update(repo_id.as_str().as_bytes());
            hasher.update(b"\0name\0");
            hasher.update(name.as_bytes());
            AgentId::from_string(format!(
                "{}{}",
                AgentId::PREFIX,
                &hex_digest(hasher)[..crate::id::ID_MAX_LEN - AgentId::PREFIX.len()]
            ))
        }
        _ => {
            let mut hasher = Sha256::new();
            hasher.update(repo_id.as_str().as_bytes());
            hasher.update(b"\0role\0");
            hasher.update(role.as_bytes());
            hasher.update(b"\0module\0");
            hasher.update(module.as_bytes());
            AgentId::from_string(format!(
                "{}{}",
                AgentId::PREFIX,
                &hex_digest(hasher)[..crate::id::ID_MAX_LEN - AgentId::PREFIX.len()]
            ))
        }
    }
}

fn hex_digest(hasher: Sha256) -> String {
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

/// "active" iff `now - last_seen_at < 2 minutes` (§4.6).
pub const PRESENCE_WINDOW: chrono::Duration = chrono::Duration::minutes(2);

pub fn is_active(last_seen_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(last_seen_at) < PRESENCE_WINDOW
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
