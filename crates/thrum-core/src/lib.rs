// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! thrum-core: shared domain types for the Thrum messaging daemon.
//!
//! Every entity in §3 of the specification lives here as a plain,
//! serializable struct/enum with no I/O — storage, addressing, and RPC
//! concerns are layered on top in `thrum-storage`, `thrum-wire`, and
//! `thrum-daemon` respectively.

pub mod agent;
pub mod clock;
pub mod error;
pub mod event;
pub mod group;
pub mod id;
pub mod message;
pub mod message_id;
pub mod peer;
pub mod repo;
pub mod scope;
pub mod session;
pub mod subscription;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{derive_agent_id, is_active, Agent, AgentId, AgentKind, PRESENCE_WINDOW};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::CoreError;
pub use event::{Event, EventPayload};
pub use group::{Group, GroupId, GroupMember, MemberType, EVERYONE_GROUP_NAME};
pub use id::short;
pub use message::{BodyFormat, Message, MessageBody, Priority, ReadReceipt, DELETED_PLACEHOLDER};
pub use message_id::MessageId;
pub use peer::{PairingCode, Peer, PAIRING_CODE_TTL};
pub use repo::{DaemonId, Repo, RepoId};
pub use scope::{Ref, Scope};
pub use session::{EndReason, Session, SessionId, WorkContext};
pub use subscription::{Subscription, SubscriptionId, SubscriptionMode};
