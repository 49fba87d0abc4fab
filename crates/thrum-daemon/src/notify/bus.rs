// SPDX-License-Identifier: MIT

//! C7 NotificationBus: matches newly-sent messages against live
//! subscriptions and fans them out to bounded per-client queues (§4.7).
//!
//! Grounded on the teacher's listener queue module: one bounded, drop-
//! oldest queue per connected client, woken via `tokio::sync::Notify`
//! rather than a channel, so a slow consumer never blocks the publisher.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use thrum_core::{AgentId, Message};
use thrum_wire::methods::method_name;
use thrum_wire::{JsonRpcNotification, JsonRpcVersion};
use tokio::sync::Notify;
use tracing::warn;

use thrum_storage::Store;

/// Default bound for a client's pending-notification queue (§4.7).
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

struct ClientQueue {
    agent_id: Option<AgentId>,
    pending: Mutex<VecDeque<JsonRpcNotification>>,
    notify: Notify,
    capacity: usize,
}

impl ClientQueue {
    fn push(&self, notification: JsonRpcNotification) {
        let mut pending = self.pending.lock();
        if pending.len() >= self.capacity {
            // Drop-oldest overflow policy (§4.7): a slow subscriber loses
            // history, not liveness.
            pending.pop_front();
            warn!(capacity = self.capacity, "notification queue full, dropping oldest");
        }
        pending.push_back(notification);
        drop(pending);
        self.notify.notify_one();
    }
}

/// Live fan-out state: one [`ClientQueue`] per connected client session.
/// Subscription rows themselves live in `thrum_storage::repo::subscriptions`
/// — this bus only owns the in-memory delivery queues, which cannot
/// survive a reconnect by design (§4.7: subscriptions are cleared on
/// disconnect).
#[derive(Default)]
pub struct NotificationBus {
    clients: Mutex<HashMap<String, std::sync::Arc<ClientQueue>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly connected client, capable of receiving
    /// notifications once it holds a subscription. `agent_id` is used
    /// only for self-suppression on `all`-mode subscriptions (§4.7).
    pub fn register(&self, client_session_id: impl Into<String>, agent_id: Option<AgentId>) {
        self.register_with_capacity(client_session_id, agent_id, DEFAULT_QUEUE_CAPACITY);
    }

    pub fn register_with_capacity(
        &self,
        client_session_id: impl Into<String>,
        agent_id: Option<AgentId>,
        capacity: usize,
    ) {
        let queue = std::sync::Arc::new(ClientQueue {
            agent_id,
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity,
        });
        self.clients.lock().insert(client_session_id.into(), queue);
    }

    /// Drops a client's queue. Callers are also responsible for clearing
    /// its subscription rows via
    /// `thrum_storage::repo::subscriptions::remove_for_client` (§4.7
    /// disconnect hook).
    pub fn deregister(&self, client_session_id: &str) {
        self.clients.lock().remove(client_session_id);
    }

    /// Waits for and pops the next queued notification for `client_session_id`.
    /// Returns `None` if the client is no longer registered.
    pub async fn recv(&self, client_session_id: &str) -> Option<JsonRpcNotification> {
        loop {
            let queue = self.clients.lock().get(client_session_id).cloned()?;
            if let Some(notification) = queue.pending.lock().pop_front() {
                return Some(notification);
            }
            queue.notify.notified().await;
        }
    }

    /// Matches `message` against every live subscription and enqueues a
    /// notification for each match (§4.7 matching rules):
    /// - `all`: matches everything except the author's own message.
    /// - `scope`: matches if `message.scopes` contains the subscription's scope.
    /// - `mention`: matches if `message.mentions` contains the subscription's role.
    pub fn publish(&self, store: &Store, message: &Message) {
        let subscriptions = match thrum_storage::repo::subscriptions::list_all(store) {
            Ok(subs) => subs,
            Err(e) => {
                warn!(error = %e, "failed to load subscriptions for notification fan-out");
                return;
            }
        };

        let clients = self.clients.lock();
        for sub in subscriptions {
            let Some(queue) = clients.get(&sub.client_session_id) else { continue };

            let matched = match sub.mode {
                thrum_core::SubscriptionMode::All => {
                    queue.agent_id.as_ref() != Some(&message.author_agent_id)
                }
                thrum_core::SubscriptionMode::Scope => {
                    sub.scope.as_ref().is_some_and(|s| message.scopes.contains(s))
                }
                thrum_core::SubscriptionMode::Mention => sub
                    .mention_role
                    .as_deref()
                    .is_some_and(|role| message.mentions.contains(role)),
            };
            if !matched {
                continue;
            }

            let params = thrum_wire::methods::NotificationMessageParams {
                message_id: message.message_id.clone(),
                preview: preview(message.visible_content()),
                agent_id: message.author_agent_id,
                timestamp: message.created_at,
            };
            let Ok(params_value) = serde_json::to_value(params) else { continue };
            queue.push(JsonRpcNotification {
                jsonrpc: JsonRpcVersion,
                method: method_name::NOTIFICATION_MESSAGE.to_string(),
                params: params_value,
            });
        }
    }
}

const PREVIEW_LEN: usize = 200;

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_LEN {
        content.to_string()
    } else {
        content.chars().take(PREVIEW_LEN).collect::<String>() + "…"
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
