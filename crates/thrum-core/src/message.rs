// SPDX-License-Identifier: MIT

//! Message: an immutable-by-id addressed record (§3 "Message").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::agent::AgentId;
use crate::error::CoreError;
use crate::message_id::MessageId;
use crate::repo::DaemonId;
use crate::scope::{Ref, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFormat {
    Markdown,
    Plain,
    Json,
}

impl std::str::FromStr for BodyFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(Self::Markdown),
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => {
                Err(CoreError::Invalid { field: "body.format", value: other.to_string() })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub format: BodyFormat,
    pub content: String,
}

/// Ordered low-to-high so `Priority::Low < Priority::Critical`, matching
/// the order given in §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl std::str::FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(CoreError::Invalid { field: "priority", value: other.to_string() }),
        }
    }
}

/// Placeholder rendered for a tombstoned message (§3: "content is
/// tombstoned").
pub const DELETED_PLACEHOLDER: &str = "[message deleted]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub author_agent_id: AgentId,
    /// The underlying human/user if the author is an agent acting on
    /// their behalf (`acting_as`, §4.5).
    pub authored_by: Option<AgentId>,
    /// When `false`, `authored_by` is persisted but not surfaced (§4.5).
    pub disclosed: bool,
    pub body: MessageBody,
    /// Opaque to the daemon by design (§9: "Dynamic JSON payloads for
    /// `structured`" — the daemon MUST NOT inspect or validate contents).
    pub structured: Option<serde_json::Value>,
    pub priority: Priority,
    pub mentions: BTreeSet<String>,
    pub scopes: BTreeSet<Scope>,
    pub refs: BTreeSet<Ref>,
    pub reply_to: Option<MessageId>,
    pub thread_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Daemon that produced the current `body.content`/`updated_at` — the
    /// tiebreaker half of the `(updated_at, daemon_id)` last-writer-wins
    /// key for concurrent edits (§4.3). `None` until the first edit.
    pub updated_by_daemon_id: Option<DaemonId>,
    /// Derived at send time (§4.4) and persisted alongside the message so
    /// reads and filters do not re-expand addressing.
    pub audience: Vec<AgentId>,
}

impl Message {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// What `get`/`list` should render for a deleted message's body (§3).
    pub fn visible_content(&self) -> &str {
        if self.is_deleted() {
            DELETED_PLACEHOLDER
        } else {
            &self.body.content
        }
    }

    /// The author identity a client should render: `agent_id (via
    /// user_id)` when `authored_by` is set and `disclosed` is true,
    /// otherwise just `author_agent_id` (§4.5).
    pub fn display_author(&self) -> String {
        match (&self.authored_by, self.disclosed) {
            (Some(user), true) => format!("{} (via {})", self.author_agent_id, user),
            _ => self.author_agent_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReceipt {
    pub message_id: MessageId,
    pub reader_agent_id: AgentId,
    pub read_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
