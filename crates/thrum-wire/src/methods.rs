// SPDX-License-Identifier: MIT

//! RPC method names and their param/result payloads (§6.1).
//!
//! Method names are part of the wire contract and MUST match this module's
//! constants exactly — clients dispatch on the literal strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use thrum_core::{
    Agent, AgentId, AgentKind, DaemonId, EndReason, Group, GroupId, GroupMember, MemberType,
    Message, MessageId, Peer, Priority, Ref, Scope, Session, SessionId, Subscription,
    SubscriptionMode, WorkContext,
};

pub mod method_name {
    pub const HEALTH: &str = "health";

    pub const AGENT_REGISTER: &str = "agent.register";
    pub const AGENT_LIST: &str = "agent.list";
    pub const AGENT_WHOAMI: &str = "agent.whoami";
    pub const AGENT_LIST_CONTEXT: &str = "agent.listContext";
    pub const AGENT_DELETE: &str = "agent.delete";
    pub const AGENT_CLEANUP: &str = "agent.cleanup";

    pub const TEAM_LIST: &str = "team.list";

    pub const SESSION_START: &str = "session.start";
    pub const SESSION_END: &str = "session.end";
    pub const SESSION_LIST: &str = "session.list";
    pub const SESSION_HEARTBEAT: &str = "session.heartbeat";
    pub const SESSION_SET_INTENT: &str = "session.setIntent";
    pub const SESSION_SET_TASK: &str = "session.setTask";

    pub const GROUP_CREATE: &str = "group.create";
    pub const GROUP_DELETE: &str = "group.delete";
    pub const GROUP_MEMBER_ADD: &str = "group.member.add";
    pub const GROUP_MEMBER_REMOVE: &str = "group.member.remove";
    pub const GROUP_LIST: &str = "group.list";
    pub const GROUP_INFO: &str = "group.info";
    pub const GROUP_MEMBERS: &str = "group.members";

    pub const MESSAGE_SEND: &str = "message.send";
    pub const MESSAGE_GET: &str = "message.get";
    pub const MESSAGE_LIST: &str = "message.list";
    pub const MESSAGE_DELETE: &str = "message.delete";
    pub const MESSAGE_EDIT: &str = "message.edit";
    pub const MESSAGE_MARK_READ: &str = "message.markRead";

    pub const SUBSCRIBE: &str = "subscribe";
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    pub const SUBSCRIPTIONS_LIST: &str = "subscriptions.list";

    pub const CONTEXT_SAVE: &str = "context.save";
    pub const CONTEXT_SHOW: &str = "context.show";
    pub const CONTEXT_CLEAR: &str = "context.clear";
    pub const CONTEXT_PREAMBLE_SAVE: &str = "context.preamble.save";
    pub const CONTEXT_PREAMBLE_SHOW: &str = "context.preamble.show";

    pub const SYNC_FORCE: &str = "sync.force";
    pub const SYNC_STATUS: &str = "sync.status";

    pub const PEER_START_PAIRING: &str = "peer.start_pairing";
    pub const PEER_WAIT_PAIRING: &str = "peer.wait_pairing";
    pub const PEER_JOIN: &str = "peer.join";
    pub const PEER_LIST: &str = "peer.list";
    pub const PEER_REMOVE: &str = "peer.remove";
    pub const PEER_STATUS: &str = "peer.status";

    pub const USER_REGISTER: &str = "user.register";
    pub const USER_IDENTIFY: &str = "user.identify";

    /// Server-initiated notification (§6.1), never dispatched as a request.
    pub const NOTIFICATION_MESSAGE: &str = "notification.message";

    /// Daemon-to-daemon peer protocol (§4.10). Not part of the §6.1 client
    /// catalog — these only ever travel over a peer connection, never from
    /// an ordinary client.
    pub const PAIR_REQUEST: &str = "pair.request";
    pub const SYNC_PULL: &str = "sync.pull";
    pub const SYNC_NOTIFY: &str = "sync.notify";
}

// ---- health ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResult {
    pub uptime_s: u64,
    pub version: String,
    pub repo_id: String,
    pub daemon_id: DaemonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tailscale: Option<bool>,
}

// ---- agent.* ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegisterParams {
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    pub module: String,
    #[serde(default)]
    pub kind: Option<AgentKind>,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub worktree_label: Option<String>,
    #[serde(default)]
    pub re_register: bool,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
    Registered,
    Updated,
    Conflict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegisterResult {
    pub agent_id: AgentId,
    pub status: RegisterStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentListParams {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentListResult {
    pub agents: Vec<Agent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentWhoamiParams {
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentWhoamiResult {
    pub agent: Option<Agent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentListContextParams {
    #[serde(default)]
    pub agent_id: Option<AgentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContextSummary {
    pub agent_id: AgentId,
    pub has_context: bool,
    pub has_preamble: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentListContextResult {
    pub contexts: Vec<AgentContextSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDeleteParams {
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentCleanupParams {
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub stale_after_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCleanupResult {
    pub candidates: Vec<AgentId>,
    pub deleted: Vec<AgentId>,
}

// ---- team.list ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEntry {
    pub agent_id: AgentId,
    pub name: Option<String>,
    pub role: String,
    pub module: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamListResult {
    pub entries: Vec<TeamEntry>,
}

// ---- session.* ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartParams {
    pub agent_id: AgentId,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub refs: Vec<Ref>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartResult {
    pub session_id: SessionId,
    /// Set when starting this session superseded a prior active one
    /// (§3 "Session" lifecycle rule).
    pub superseded_session_id: Option<SessionId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEndParams {
    pub session_id: SessionId,
    #[serde(default)]
    pub reason: Option<EndReason>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionListParams {
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResult {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHeartbeatParams {
    pub session_id: SessionId,
    #[serde(default)]
    pub add_scopes: Vec<Scope>,
    #[serde(default)]
    pub remove_scopes: Vec<Scope>,
    #[serde(default)]
    pub add_refs: Vec<Ref>,
    #[serde(default)]
    pub remove_refs: Vec<Ref>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHeartbeatResult {
    pub work_context: WorkContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSetIntentParams {
    pub session_id: SessionId,
    pub intent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSetTaskParams {
    pub session_id: SessionId,
    pub task: String,
}

// ---- group.* ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCreateParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCreateResult {
    pub group_id: GroupId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDeleteParams {
    pub group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberParams {
    pub group: String,
    pub member_type: MemberType,
    pub member_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupListResult {
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfoParams {
    pub group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfoResult {
    pub group: Option<Group>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembersParams {
    pub group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembersResult {
    pub members: Vec<GroupMember>,
}

// ---- message.* ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub author: AgentId,
    pub content: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub refs: Vec<Ref>,
    #[serde(default)]
    pub reply_to: Option<MessageId>,
    #[serde(default)]
    pub structured: Option<serde_json::Value>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default)]
    pub acting_as: Option<AgentId>,
    #[serde(default)]
    pub disclosed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendResult {
    pub message_id: MessageId,
    pub thread_id: MessageId,
    pub created_at: DateTime<Utc>,
    pub resolved_to: Vec<AgentId>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageGetParams {
    pub message_id: MessageId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageGetResult {
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageListFilter {
    #[serde(default)]
    pub for_agent: Option<AgentId>,
    #[serde(default)]
    pub for_agent_role: Option<String>,
    #[serde(default)]
    pub unread_for_agent: Option<AgentId>,
    #[serde(default)]
    pub mention: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub thread_id: Option<MessageId>,
    #[serde(default)]
    pub exclude_self: bool,
    #[serde(default)]
    pub caller_agent_id: Option<AgentId>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_page() -> u32 {
    1
}

/// Hard cap enforced regardless of the requested value (§8 "Boundary
/// behaviors": "`page_size > 100` is silently clamped to 100").
pub const MAX_PAGE_SIZE: u32 = 100;

fn default_page_size() -> u32 {
    50
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageListResult {
    pub messages: Vec<Message>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteParams {
    pub message_id: MessageId,
    pub caller: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEditParams {
    pub message_id: MessageId,
    pub new_content: String,
    pub caller: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMarkReadParams {
    pub message_ids: Vec<MessageId>,
    pub reader: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMarkReadResult {
    pub marked: usize,
}

// ---- subscribe / unsubscribe ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeParams {
    pub client_session_id: String,
    pub mode: SubscriptionMode,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub mention_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeResult {
    pub subscription: Subscription,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeParams {
    pub subscription_id: thrum_core::SubscriptionId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionsListParams {
    #[serde(default)]
    pub client_session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionsListResult {
    pub subscriptions: Vec<Subscription>,
}

// ---- context.* ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSaveParams {
    pub agent_id: AgentId,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextShowParams {
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextShowResult {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextClearParams {
    pub agent_id: AgentId,
}

// ---- sync.* ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncForceResult {
    pub triggered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusResult {
    pub local_only: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub pending_export_count: u64,
}

// ---- peer.* ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStartPairingResult {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerWaitPairingResult {
    pub peer: Peer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerJoinParams {
    pub address: String,
    pub code: String,
    pub name: String,
    /// The joining daemon's own identity, so the accepting side can key
    /// its `Peer` row (and later `applied_cursor` replay) on the real
    /// `daemon_id` its events will arrive tagged with (§4.2, §4.10).
    pub daemon_id: DaemonId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerJoinResult {
    pub peer: Peer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerListResult {
    pub peers: Vec<Peer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRemoveParams {
    pub daemon_id: DaemonId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStatusEntry {
    pub daemon_id: DaemonId,
    pub name: String,
    pub connected: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_known_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStatusResult {
    pub peers: Vec<PeerStatusEntry>,
}

// ---- peer protocol (§4.10, daemon-to-daemon only) ----

/// Sent by the joining daemon over the connection it dials to the
/// pairing daemon's listener, completing the handshake `peer.join`
/// started on the client-facing side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRequestParams {
    pub code: String,
    pub name: String,
    pub daemon_id: DaemonId,
    /// Address the accepting side should dial back for future syncing.
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRequestResult {
    pub peer: Peer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPullParams {
    pub pair_token: String,
    pub since_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPullResult {
    pub events: Vec<thrum_core::Event>,
    pub latest_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncNotifyParams {
    pub pair_token: String,
    pub daemon_id: DaemonId,
    pub latest_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncNotifyResult {
    pub pulled: u64,
}

// ---- user.* ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisterParams {
    pub name: String,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisterResult {
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentifyParams {
    pub agent_id: AgentId,
}

// ---- notification.message (server push, §4.7/§6.1) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessageParams {
    pub message_id: MessageId,
    pub preview: String,
    pub agent_id: AgentId,
    pub timestamp: DateTime<Utc>,
}

/// §3's `scopes`/`refs` maps arrive over the wire as plain objects in
/// some contexts (e.g. `context.save` metadata); this helper keeps that
/// encoding consistent wherever it's needed instead of leaking
/// `BTreeMap<String, String>` construction into callers.
pub fn empty_metadata() -> BTreeMap<String, String> {
    BTreeMap::new()
}

#[cfg(test)]
#[path = "methods_tests.rs"]
mod tests;
