// SPDX-License-Identifier: MIT

//! The shared dispatch table (§4.8): one handler per method name in
//! [`thrum_wire::methods::method_name`]. Both transports (`unix.rs`,
//! `ws.rs`) call [`Dispatcher::dispatch`] and never touch a [`Daemon`]
//! directly, so the two listeners cannot drift in behavior.
//!
//! Every handler returns a `DaemonError`; [`Dispatcher::dispatch`] is the
//! single place that converts it into the wire-level [`ThrumError`] (§7
//! "propagation policy").

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thrum_core::{AgentId, Clock, PAIRING_CODE_TTL};
use thrum_wire::methods::{self, method_name as m};
use thrum_wire::{JsonRpcRequest, JsonRpcResponse, ThrumError};

use crate::daemon::Daemon;
use crate::error::{DaemonError, PeerError, SessionError};
use crate::messages::SendRequest;
use crate::peers::PairingStatus;
use crate::sync::{GitSyncHandle, PeerSyncHandle};

/// Agents idle this long with no active session are `agent.cleanup`
/// candidates when the caller doesn't specify `stale_after_days` (§4.6).
const DEFAULT_STALE_AFTER_DAYS: u32 = 30;

/// A peer counts as "connected" for `peer.status` if it synced within two
/// safety-net pull intervals — a peer that hasn't answered in that long is
/// presumed offline rather than merely between ticks.
const PEER_CONNECTED_WINDOW: chrono::Duration = chrono::Duration::seconds(20);

/// How long `peer.wait_pairing` blocks before giving up — matches the
/// issuing code's own TTL, since waiting past that point is pointless.
fn pairing_wait_deadline() -> chrono::Duration {
    PAIRING_CODE_TTL
}

pub struct Dispatcher<C: Clock> {
    daemon: Arc<Daemon<C>>,
    git_sync: Arc<GitSyncHandle>,
    #[allow(dead_code)]
    peer_sync: Arc<PeerSyncHandle>,
    started_at: Instant,
}

impl<C: Clock + Send + Sync + 'static> Dispatcher<C> {
    pub fn new(daemon: Arc<Daemon<C>>, git_sync: Arc<GitSyncHandle>, peer_sync: Arc<PeerSyncHandle>) -> Self {
        Self { daemon, git_sync, peer_sync, started_at: Instant::now() }
    }

    /// Handles one request end to end, never propagating a panic from a
    /// handler out to the caller — a bug in one method must not take down
    /// a connection serving other clients (§7).
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let method = request.method.clone();
        let result = match std::panic::AssertUnwindSafe(self.handle(&method, request.params))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => Err(DaemonError::Invalid(format!("handler for {method} panicked"))),
        };
        match result {
            Ok(value) => JsonRpcResponse::ok(id, value),
            Err(err) => JsonRpcResponse::err(id, &ThrumError::from(&err)),
        }
    }

    async fn handle(&self, method: &str, params: Value) -> Result<Value, DaemonError> {
        match method {
            m::HEALTH => self.health(),

            m::AGENT_REGISTER => self.agent_register(params).await,
            m::AGENT_LIST => self.agent_list(params),
            m::AGENT_WHOAMI => self.agent_whoami(params),
            m::AGENT_LIST_CONTEXT => self.agent_list_context(params),
            m::AGENT_DELETE => self.agent_delete(params),
            m::AGENT_CLEANUP => self.agent_cleanup(params),

            m::TEAM_LIST => self.team_list(),

            m::SESSION_START => self.session_start(params).await,
            m::SESSION_END => self.session_end(params).await,
            m::SESSION_LIST => self.session_list(params),
            m::SESSION_HEARTBEAT => self.session_heartbeat(params).await,
            m::SESSION_SET_INTENT => self.session_set_intent(params),
            m::SESSION_SET_TASK => self.session_set_task(params),

            m::GROUP_CREATE => self.group_create(params).await,
            m::GROUP_DELETE => self.group_delete(params).await,
            m::GROUP_MEMBER_ADD => self.group_member_add(params).await,
            m::GROUP_MEMBER_REMOVE => self.group_member_remove(params).await,
            m::GROUP_LIST => self.group_list(),
            m::GROUP_INFO => self.group_info(params),
            m::GROUP_MEMBERS => self.group_members(params),

            m::MESSAGE_SEND => self.message_send(params).await,
            m::MESSAGE_GET => self.message_get(params),
            m::MESSAGE_LIST => self.message_list(params),
            m::MESSAGE_DELETE => self.message_delete(params).await,
            m::MESSAGE_EDIT => self.message_edit(params).await,
            m::MESSAGE_MARK_READ => self.message_mark_read(params).await,

            m::SUBSCRIBE => self.subscribe(params),
            m::UNSUBSCRIBE => self.unsubscribe(params),
            m::SUBSCRIPTIONS_LIST => self.subscriptions_list(params),

            m::CONTEXT_SAVE => self.context_save(params).await,
            m::CONTEXT_SHOW => self.context_show(params),
            m::CONTEXT_CLEAR => self.context_clear(params).await,
            m::CONTEXT_PREAMBLE_SAVE => self.context_preamble_save(params).await,
            m::CONTEXT_PREAMBLE_SHOW => self.context_preamble_show(params),

            m::SYNC_FORCE => self.sync_force().await,
            m::SYNC_STATUS => self.sync_status(),

            m::PEER_START_PAIRING => self.peer_start_pairing(),
            m::PEER_WAIT_PAIRING => self.peer_wait_pairing().await,
            m::PEER_JOIN => self.peer_join(params).await,
            m::PEER_LIST => self.peer_list(),
            m::PEER_REMOVE => self.peer_remove(params),
            m::PEER_STATUS => self.peer_status(),

            m::USER_REGISTER => self.user_register(params).await,
            m::USER_IDENTIFY => self.user_identify(params),

            m::PAIR_REQUEST => self.pair_request(params),
            m::SYNC_PULL => self.sync_pull(params),
            m::SYNC_NOTIFY => self.sync_notify(params).await,

            m::NOTIFICATION_MESSAGE => {
                Err(DaemonError::Invalid(format!("{method} is server-initiated only")))
            }

            other => Err(DaemonError::Invalid(format!("unknown method: {other}"))),
        }
    }

    /// Schedules `sync.notify` to every peer without making the caller
    /// wait for it — a peer that's slow or unreachable must not add
    /// latency to the RPC that triggered the broadcast (§4.10, §5 "never
    /// blocks RPC").
    fn notify_peers_in_background(&self) {
        let daemon = self.daemon.clone();
        tokio::spawn(async move {
            crate::sync::peer::notify_all_peers(&daemon).await;
        });
    }

    // ---- health ----

    fn health(&self) -> Result<Value, DaemonError> {
        let result = methods::HealthResult {
            uptime_s: self.started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            repo_id: self.daemon.repo_id.to_string(),
            daemon_id: self.daemon.daemon_id,
            tailscale: None,
        };
        to_value(result)
    }

    // ---- agent.* ----

    async fn agent_register(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::AgentRegisterParams = parse_params(params)?;
        let req = crate::sessions::RegisterRequest {
            name: params.name,
            role: params.role,
            module: params.module,
            kind: params.kind.unwrap_or(thrum_core::AgentKind::Agent),
            display: params.display,
            worktree_label: params.worktree_label,
            re_register: params.re_register,
            force: params.force,
        };
        let (agent_id, status) = self.daemon.register_agent(req)?;
        self.notify_peers_in_background();
        to_value(methods::AgentRegisterResult { agent_id, status })
    }

    fn agent_list(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::AgentListParams = parse_params(params)?;
        let agents = self.daemon.list_agents(params.role.as_deref())?;
        to_value(methods::AgentListResult { agents })
    }

    fn agent_whoami(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::AgentWhoamiParams = parse_params(params)?;
        let agent = self.daemon.whoami(&params.agent_id)?;
        to_value(methods::AgentWhoamiResult { agent })
    }

    fn agent_list_context(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::AgentListContextParams = parse_params(params)?;
        let contexts = self
            .daemon
            .list_context_summaries()?
            .into_iter()
            .filter(|c| params.agent_id.is_none_or(|id| c.agent_id == id))
            .map(|c| methods::AgentContextSummary {
                agent_id: c.agent_id,
                has_context: c.has_context,
                has_preamble: c.has_preamble,
                updated_at: c.updated_at,
            })
            .collect();
        to_value(methods::AgentListContextResult { contexts })
    }

    fn agent_delete(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::AgentDeleteParams = parse_params(params)?;
        self.daemon.delete_agent(&params.agent_id)?;
        Ok(Value::Null)
    }

    fn agent_cleanup(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::AgentCleanupParams = parse_params(params)?;
        let stale_after_days = params.stale_after_days.unwrap_or(DEFAULT_STALE_AFTER_DAYS);
        let (candidates, deleted) = self.daemon.cleanup_agents(params.force, stale_after_days)?;
        to_value(methods::AgentCleanupResult { candidates, deleted })
    }

    // ---- team.list ----

    fn team_list(&self) -> Result<Value, DaemonError> {
        let entries = self
            .daemon
            .team_list()?
            .into_iter()
            .map(|(agent, active)| methods::TeamEntry {
                agent_id: agent.agent_id,
                name: agent.name,
                role: agent.role,
                module: agent.module,
                active,
            })
            .collect();
        to_value(methods::TeamListResult { entries })
    }

    // ---- session.* ----

    async fn session_start(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SessionStartParams = parse_params(params)?;
        let (session_id, superseded_session_id) =
            self.daemon.start_session(params.agent_id, params.intent, params.task, params.scopes, params.refs)?;
        self.notify_peers_in_background();
        to_value(methods::SessionStartResult { session_id, superseded_session_id })
    }

    async fn session_end(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SessionEndParams = parse_params(params)?;
        self.daemon.end_session(&params.session_id, params.reason.unwrap_or(thrum_core::EndReason::Normal))?;
        self.notify_peers_in_background();
        Ok(Value::Null)
    }

    fn session_list(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SessionListParams = parse_params(params)?;
        let sessions = self.daemon.list_sessions(params.agent_id.as_ref(), params.active_only)?;
        to_value(methods::SessionListResult { sessions })
    }

    /// Uses the daemon's own checkout root as the worktree to inspect —
    /// §6.1 doesn't carry a per-call path, and a daemon only ever watches
    /// the one repo it was started against (§4.6).
    async fn session_heartbeat(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SessionHeartbeatParams = parse_params(params)?;
        let work_context = self
            .daemon
            .heartbeat(
                &params.session_id,
                params.add_scopes,
                params.remove_scopes,
                params.add_refs,
                params.remove_refs,
                &self.daemon.config.repo_root,
            )
            .await?;
        self.notify_peers_in_background();
        to_value(methods::SessionHeartbeatResult { work_context })
    }

    /// `setIntent`/`setTask` are not event-sourced (§4.6 supplement): they
    /// are local annotations on an already-replicated session, so there is
    /// nothing for `sync.notify` to propagate here.
    fn session_set_intent(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SessionSetIntentParams = parse_params(params)?;
        self.daemon.set_intent(&params.session_id, &params.intent)?;
        Ok(Value::Null)
    }

    fn session_set_task(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SessionSetTaskParams = parse_params(params)?;
        self.daemon.set_task(&params.session_id, &params.task)?;
        Ok(Value::Null)
    }

    // ---- group.* ----

    async fn group_create(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::GroupCreateParams = parse_params(params)?;
        let group_id = self.daemon.create_group(&params.name, params.description)?;
        self.notify_peers_in_background();
        to_value(methods::GroupCreateResult { group_id })
    }

    async fn group_delete(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::GroupDeleteParams = parse_params(params)?;
        let deleted = self.daemon.delete_group(&params.group)?;
        if deleted {
            self.notify_peers_in_background();
        }
        to_value(serde_json::json!({ "deleted": deleted }))
    }

    async fn group_member_add(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::GroupMemberParams = parse_params(params)?;
        self.daemon.add_group_member(&params.group, params.member_type, &params.member_value)?;
        self.notify_peers_in_background();
        Ok(Value::Null)
    }

    async fn group_member_remove(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::GroupMemberParams = parse_params(params)?;
        self.daemon.remove_group_member(&params.group, params.member_type, &params.member_value)?;
        self.notify_peers_in_background();
        Ok(Value::Null)
    }

    fn group_list(&self) -> Result<Value, DaemonError> {
        to_value(methods::GroupListResult { groups: self.daemon.list_groups()? })
    }

    fn group_info(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::GroupInfoParams = parse_params(params)?;
        to_value(methods::GroupInfoResult { group: self.daemon.group_info(&params.group)? })
    }

    fn group_members(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::GroupMembersParams = parse_params(params)?;
        to_value(methods::GroupMembersResult { members: self.daemon.group_members(&params.group)? })
    }

    // ---- message.* ----

    async fn message_send(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::MessageSendParams = parse_params(params)?;
        let format = params
            .format
            .as_deref()
            .map(str::parse::<thrum_core::BodyFormat>)
            .transpose()
            .map_err(|e| DaemonError::Invalid(e.to_string()))?;

        let outcome = self.daemon.send_message(SendRequest {
            author: params.author,
            content: &params.content,
            format,
            mentions: params.mentions,
            to: params.to,
            scopes: params.scopes,
            refs: params.refs,
            reply_to: params.reply_to,
            structured: params.structured,
            priority: params.priority.unwrap_or_default(),
            broadcast: params.broadcast,
            acting_as: params.acting_as,
            disclosed: params.disclosed.unwrap_or(false),
        })?;
        self.notify_peers_in_background();

        let thread_id = outcome.message.thread_id.clone().unwrap_or_else(|| outcome.message.message_id.clone());
        to_value(methods::MessageSendResult {
            message_id: outcome.message.message_id,
            thread_id,
            created_at: outcome.message.created_at,
            resolved_to: outcome.resolved_to,
            warnings: outcome.warnings,
        })
    }

    fn message_get(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::MessageGetParams = parse_params(params)?;
        to_value(methods::MessageGetResult { message: self.daemon.get_message(&params.message_id)? })
    }

    /// `for_agent_role = R` matches "messages mentioning role R" (§4.5's
    /// filter table) — the storage-level filter has no separate slot for
    /// it, since filtering by `mention` already implements exactly that
    /// predicate. An explicit `mention` takes priority if both are set.
    fn message_list(&self, params: Value) -> Result<Value, DaemonError> {
        let filter: methods::MessageListFilter = parse_params(params)?;
        let exclude_author =
            if filter.exclude_self { filter.caller_agent_id } else { None };
        let mention = filter.mention.or(filter.for_agent_role);
        let storage_filter = thrum_storage::repo::messages::MessageFilter {
            for_agent: filter.for_agent,
            unread_for_agent: filter.unread_for_agent,
            mention,
            scope: filter.scope,
            thread_id: filter.thread_id,
            exclude_author,
            include_deleted: false,
        };
        let sort = match filter.sort_order {
            methods::SortOrder::Asc => thrum_storage::repo::messages::SortOrder::Asc,
            methods::SortOrder::Desc => thrum_storage::repo::messages::SortOrder::Desc,
        };
        let page = filter.page.max(1);
        let page_size = filter.page_size.clamp(1, thrum_storage::repo::messages::MAX_PAGE_SIZE);
        let result = self.daemon.list_messages(&storage_filter, page, page_size, sort)?;
        let total_pages = (result.total + page_size as u64 - 1) / page_size as u64;
        to_value(methods::MessageListResult {
            messages: result.messages,
            page,
            page_size,
            total: result.total,
            total_pages,
        })
    }

    async fn message_delete(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::MessageDeleteParams = parse_params(params)?;
        self.daemon.delete_message(&params.message_id, &params.caller)?;
        self.notify_peers_in_background();
        Ok(Value::Null)
    }

    async fn message_edit(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::MessageEditParams = parse_params(params)?;
        self.daemon.edit_message(&params.message_id, &params.caller, &params.new_content)?;
        self.notify_peers_in_background();
        Ok(Value::Null)
    }

    async fn message_mark_read(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::MessageMarkReadParams = parse_params(params)?;
        let marked = self.daemon.mark_read(&params.message_ids, &params.reader)?;
        if marked > 0 {
            self.notify_peers_in_background();
        }
        to_value(methods::MessageMarkReadResult { marked })
    }

    // ---- subscribe / unsubscribe ----

    fn subscribe(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SubscribeParams = parse_params(params)?;
        let subscription =
            self.daemon.subscribe(&params.client_session_id, params.mode, params.scope, params.mention_role)?;
        to_value(methods::SubscribeResult { subscription })
    }

    fn unsubscribe(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::UnsubscribeParams = parse_params(params)?;
        self.daemon.unsubscribe(&params.subscription_id)?;
        Ok(Value::Null)
    }

    fn subscriptions_list(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SubscriptionsListParams = parse_params(params)?;
        let subscriptions = self.daemon.list_subscriptions(params.client_session_id.as_deref())?;
        to_value(methods::SubscriptionsListResult { subscriptions })
    }

    // ---- context.* ----

    async fn context_save(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::ContextSaveParams = parse_params(params)?;
        self.daemon.save_context(&params.agent_id, &params.content)?;
        self.notify_peers_in_background();
        Ok(Value::Null)
    }

    fn context_show(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::ContextShowParams = parse_params(params)?;
        to_value(methods::ContextShowResult { content: self.daemon.show_context(&params.agent_id)? })
    }

    async fn context_clear(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::ContextClearParams = parse_params(params)?;
        self.daemon.clear_context(&params.agent_id)?;
        self.notify_peers_in_background();
        Ok(Value::Null)
    }

    /// Shares `ContextSaveParams`'s shape — `{agent_id, content}` — with
    /// `context.save`; the preamble slot has no params of its own (§6.1).
    async fn context_preamble_save(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::ContextSaveParams = parse_params(params)?;
        self.daemon.save_preamble(&params.agent_id, &params.content)?;
        self.notify_peers_in_background();
        Ok(Value::Null)
    }

    fn context_preamble_show(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::ContextShowParams = parse_params(params)?;
        to_value(methods::ContextShowResult { content: self.daemon.show_preamble(&params.agent_id)? })
    }

    // ---- sync.* ----

    async fn sync_force(&self) -> Result<Value, DaemonError> {
        let triggered = self.git_sync.force().await;
        self.notify_peers_in_background();
        to_value(methods::SyncForceResult { triggered })
    }

    fn sync_status(&self) -> Result<Value, DaemonError> {
        let status = self.git_sync.status();
        let latest = thrum_storage::event_log::latest_sequence(&self.daemon.store, &self.daemon.daemon_id)?;
        let exported = thrum_storage::repo::cursor::get(&self.daemon.store, &self.daemon.daemon_id)?;
        to_value(methods::SyncStatusResult {
            local_only: status.local_only,
            last_sync_at: status.last_sync_at,
            last_error: status.last_error,
            pending_export_count: latest.saturating_sub(exported),
        })
    }

    // ---- peer.* ----

    fn peer_start_pairing(&self) -> Result<Value, DaemonError> {
        let code = self.daemon.start_pairing()?;
        let expires_at = code.issued_at + PAIRING_CODE_TTL;
        to_value(methods::PeerStartPairingResult { code: code.code, expires_at })
    }

    /// Polls `pairing_status` until it resolves, then diffs the peer table
    /// against its pre-call snapshot to identify which `Peer` just joined
    /// (§4.10 `peer.wait_pairing`).
    async fn peer_wait_pairing(&self) -> Result<Value, DaemonError> {
        let before: HashSet<thrum_core::DaemonId> =
            self.daemon.list_peers()?.into_iter().map(|p| p.daemon_id).collect();
        let deadline = self.daemon.clock.utc_now() + pairing_wait_deadline();
        loop {
            match self.daemon.pairing_status()? {
                PairingStatus::Completed => {
                    let peer = self
                        .daemon
                        .list_peers()?
                        .into_iter()
                        .find(|p| !before.contains(&p.daemon_id))
                        .ok_or_else(|| PeerError::NotFound("no new peer after pairing completed".into()))?;
                    return to_value(methods::PeerWaitPairingResult { peer });
                }
                PairingStatus::Expired => return Err(PeerError::PairingExpired.into()),
                PairingStatus::Pending => {
                    if self.daemon.clock.utc_now() >= deadline {
                        return Err(PeerError::Timeout.into());
                    }
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }
    }

    async fn peer_join(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::PeerJoinParams = parse_params(params)?;
        let peer = crate::sync::peer::join(&self.daemon, &params.address, &params.code).await?;
        to_value(methods::PeerJoinResult { peer })
    }

    fn peer_list(&self) -> Result<Value, DaemonError> {
        to_value(methods::PeerListResult { peers: self.daemon.list_peers()? })
    }

    fn peer_remove(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::PeerRemoveParams = parse_params(params)?;
        self.daemon.remove_peer(&params.daemon_id)?;
        Ok(Value::Null)
    }

    fn peer_status(&self) -> Result<Value, DaemonError> {
        let now = self.daemon.clock.utc_now();
        let peers = self
            .daemon
            .list_peers()?
            .into_iter()
            .map(|p| methods::PeerStatusEntry {
                daemon_id: p.daemon_id,
                name: p.name.clone(),
                connected: p.last_sync_at.is_some_and(|t| now - t < PEER_CONNECTED_WINDOW),
                last_sync_at: p.last_sync_at,
                last_known_seq: p.last_known_seq,
            })
            .collect();
        to_value(methods::PeerStatusResult { peers })
    }

    // ---- user.* ----

    async fn user_register(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::UserRegisterParams = parse_params(params)?;
        let req = crate::sessions::RegisterRequest {
            name: Some(params.name.clone()),
            role: "user".to_string(),
            module: "user".to_string(),
            kind: thrum_core::AgentKind::User,
            display: params.display,
            worktree_label: None,
            re_register: false,
            force: false,
        };
        let (agent_id, status) = self.daemon.register_agent(req)?;
        if status == thrum_wire::methods::RegisterStatus::Conflict {
            return Err(SessionError::Conflict(format!(
                "user name {:?} is already registered under a different identity",
                params.name
            ))
            .into());
        }
        self.notify_peers_in_background();
        to_value(methods::UserRegisterResult { agent_id })
    }

    fn user_identify(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::UserIdentifyParams = parse_params(params)?;
        to_value(methods::AgentWhoamiResult { agent: self.daemon.whoami(&params.agent_id)? })
    }

    // ---- peer protocol (§4.10, daemon-to-daemon only) ----

    fn pair_request(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::PairRequestParams = parse_params(params)?;
        let result = crate::sync::peer::accept_pair_request(&self.daemon, params).map_err(DaemonError::from)?;
        to_value(result)
    }

    fn sync_pull(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SyncPullParams = parse_params(params)?;
        let result = crate::sync::peer::handle_sync_pull(&self.daemon, params).map_err(DaemonError::from)?;
        to_value(result)
    }

    async fn sync_notify(&self, params: Value) -> Result<Value, DaemonError> {
        let params: methods::SyncNotifyParams = parse_params(params)?;
        let result = crate::sync::peer::handle_sync_notify(&self.daemon, params).await.map_err(DaemonError::from)?;
        to_value(result)
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, DaemonError> {
    serde_json::from_value(params).map_err(|e| DaemonError::Invalid(format!("invalid params: {e}")))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, DaemonError> {
    serde_json::to_value(value).map_err(|e| DaemonError::Invalid(e.to_string()))
}

/// Pulled in only for `catch_unwind` on the handler future — kept local to
/// this module rather than a crate-wide dependency since nothing else
/// needs it (§7 "a bug in one method must not take down a connection").
use futures_util::FutureExt;

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
