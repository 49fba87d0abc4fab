// SPDX-License-Identifier: MIT

//! Event: append-only record of a state change (§3 "Event", §4.2).
//!
//! Every write that escapes the daemon's process boundary is first
//! recorded as an `Event` within the transaction that applies its effect.
//! Serializes with `{"kind": "message_created", ...fields}`, matching the
//! teacher's `{"type": "event:name", ...}` tagged-enum convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentId;
use crate::group::{GroupId, MemberType};
use crate::message::Priority;
use crate::message_id::MessageId;
use crate::repo::DaemonId;
use crate::scope::Scope;
use crate::session::{EndReason, SessionId};

/// The payload half of an [`Event`]. Kept separate from the envelope
/// (`daemon_id`/`sequence`/`produced_at`) so the Projector can match on
/// `kind` without destructuring the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventPayload {
    #[serde(rename = "message_created")]
    MessageCreated {
        message_id: MessageId,
        author_agent_id: AgentId,
        audience: Vec<AgentId>,
        mentions: Vec<String>,
        scopes: Vec<Scope>,
        priority: Priority,
        reply_to: Option<MessageId>,
        thread_id: Option<MessageId>,
        created_at: DateTime<Utc>,
        /// Opaque message snapshot, re-hydrated by the Projector. Kept as
        /// `Value` so the EventLog doesn't need a second copy of
        /// `Message`'s full schema.
        snapshot: Value,
    },

    #[serde(rename = "message_edited")]
    MessageEdited { message_id: MessageId, content: String, updated_at: DateTime<Utc> },

    #[serde(rename = "message_deleted")]
    MessageDeleted { message_id: MessageId, deleted_at: DateTime<Utc> },

    #[serde(rename = "read_marked")]
    ReadMarked { message_id: MessageId, reader_agent_id: AgentId, read_at: DateTime<Utc> },

    #[serde(rename = "agent_registered")]
    AgentRegistered { agent_id: AgentId, snapshot: Value },

    #[serde(rename = "session_started")]
    SessionStarted {
        session_id: SessionId,
        agent_id: AgentId,
        started_at: DateTime<Utc>,
        /// Full `Session` snapshot so peers can rehydrate without a
        /// second round trip (mirrors `MessageCreated`'s `snapshot`).
        snapshot: Value,
    },

    #[serde(rename = "session_heartbeat")]
    SessionHeartbeat { session_id: SessionId, at: DateTime<Utc> },

    #[serde(rename = "session_ended")]
    SessionEnded { session_id: SessionId, ended_at: DateTime<Utc>, reason: EndReason },

    #[serde(rename = "group_created")]
    GroupCreated { group_id: GroupId, name: String, created_at: DateTime<Utc> },

    #[serde(rename = "group_deleted")]
    GroupDeleted { group_id: GroupId },

    #[serde(rename = "group_member_added")]
    GroupMemberAdded { group_id: GroupId, member_type: MemberType, member_value: String },

    #[serde(rename = "group_member_removed")]
    GroupMemberRemoved { group_id: GroupId, member_type: MemberType, member_value: String },

    #[serde(rename = "context_updated")]
    ContextUpdated {
        agent_id: AgentId,
        updated_at: DateTime<Utc>,
        /// `Some(content)` for a save, `None` for a clear.
        content: Option<String>,
        /// Distinguishes the context slot from the preamble slot — both
        /// produce this event kind since they share the same lifecycle.
        is_preamble: bool,
    },
}

/// `(daemon_id, sequence)` is globally unique; events are strictly ordered
/// per daemon and consumed in order by replicas (§3, §5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub daemon_id: DaemonId,
    pub sequence: u64,
    pub payload: EventPayload,
    pub produced_at: DateTime<Utc>,
}

impl Event {
    pub fn cursor(&self) -> (DaemonId, u64) {
        (self.daemon_id, self.sequence)
    }
}
