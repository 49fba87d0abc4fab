// SPDX-License-Identifier: MIT

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::agent::{Agent, AgentId, AgentKind};
use crate::message::{BodyFormat, Message, MessageBody, Priority};
use crate::message_id::MessageId;
use crate::session::{Session, SessionId};
use chrono::Utc;
use std::collections::BTreeSet;

/// Builds a minimal [`Agent`] for tests, overriding only what the test cares
/// about. Mirrors the fluent builder style used for `CrewBuilder`/
/// `JobBuilder` in the teacher's `test-support` feature.
pub struct AgentBuilder {
    agent: Agent,
}

impl AgentBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            agent: Agent {
                agent_id: AgentId::new(),
                kind: AgentKind::Agent,
                role: "impl".to_string(),
                module: "test".to_string(),
                display: None,
                name: None,
                registered_at: now,
                last_seen_at: now,
                worktree_label: None,
            },
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.agent.name = Some(name.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.agent.role = role.into();
        self
    }

    pub fn kind(mut self, kind: AgentKind) -> Self {
        self.agent.kind = kind;
        self
    }

    pub fn build(self) -> Agent {
        self.agent
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn session_for(agent_id: AgentId) -> Session {
    Session::new(agent_id, Utc::now())
}

pub fn message_builder(author: AgentId, content: &str) -> Message {
    Message {
        message_id: MessageId::generate(Utc::now()),
        author_agent_id: author,
        authored_by: None,
        disclosed: false,
        body: MessageBody { format: BodyFormat::Plain, content: content.to_string() },
        structured: None,
        priority: Priority::Normal,
        mentions: BTreeSet::new(),
        scopes: BTreeSet::new(),
        refs: BTreeSet::new(),
        reply_to: None,
        thread_id: None,
        created_at: Utc::now(),
        updated_at: None,
        deleted_at: None,
        updated_by_daemon_id: None,
        audience: vec![],
    }
}

/// Unused directly by `thrum-core`'s own tests but exported for
/// `thrum-storage`/`thrum-daemon` proptest suites (audience-resolution
/// idempotence, §8 law 1).
pub mod strategies {
    use crate::message::Priority;
    use proptest::prelude::*;

    pub fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Low),
            Just(Priority::Normal),
            Just(Priority::High),
            Just(Priority::Critical),
        ]
    }

    pub fn arb_token() -> impl Strategy<Value = String> {
        "[a-z]{3,10}"
    }
}

/// Quick fixture for crates that need a bare `SessionId` without a full
/// `Session`.
pub fn fresh_session_id() -> SessionId {
    SessionId::new()
}
