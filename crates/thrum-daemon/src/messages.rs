// SPDX-License-Identifier: MIT

//! C5 MessageEngine (§4.5): send/get/list/edit/delete/markRead.
//!
//! Every mutation follows the same shape as `thrum_storage`'s repos: apply
//! the effect to the local store, then append the [`EventPayload`] that
//! describes it in the same logical step, mirroring the teacher's
//! `emit(&ctx.event_bus, Event::...)` call immediately after a mutation.

use std::collections::BTreeSet;

use thrum_core::{
    Clock, Message, MessageBody, MessageId, Priority, Ref, Scope,
};
use thrum_storage::repo::messages::{MessageFilter, Page, SortOrder};

use crate::address::AddressResolver;
use crate::daemon::Daemon;
use crate::error::{DaemonError, MessageError};

/// Everything a caller needs to build the wire-level `message.send` result
/// (§6.1 `MessageSendResult`).
pub struct SendOutcome {
    pub message: Message,
    pub resolved_to: Vec<thrum_core::AgentId>,
    pub warnings: Vec<String>,
}

#[allow(clippy::too_many_arguments)]
pub struct SendRequest<'a> {
    pub author: thrum_core::AgentId,
    pub content: &'a str,
    pub format: Option<thrum_core::BodyFormat>,
    pub mentions: Vec<String>,
    pub to: Vec<String>,
    pub scopes: Vec<Scope>,
    pub refs: Vec<Ref>,
    pub reply_to: Option<MessageId>,
    pub structured: Option<serde_json::Value>,
    pub priority: Priority,
    pub broadcast: bool,
    pub acting_as: Option<thrum_core::AgentId>,
    pub disclosed: bool,
}

impl<C: Clock> Daemon<C> {
    /// Sends a message. Recipients are resolved via [`AddressResolver`]
    /// from `mentions`/`to`; `broadcast` additionally attaches
    /// `Scope::everyone()` and expands the audience to every agent (§4.5).
    pub fn send_message(&self, req: SendRequest<'_>) -> Result<SendOutcome, DaemonError> {
        if req.content.trim().is_empty() {
            return Err(MessageError::Invalid("content must not be empty".into()).into());
        }

        let now = self.clock.utc_now();
        let mut audience = AddressResolver::resolve(&self.store, &req.author, &req.mentions, &req.to)
            .map_err(MessageError::from)?;

        let mut scopes: BTreeSet<Scope> = req.scopes.into_iter().collect();
        if req.broadcast {
            let everyone = thrum_storage::repo::agents::list_all(&self.store).map_err(MessageError::from)?;
            for agent in everyone {
                if agent.agent_id != req.author {
                    audience.agent_ids.push(agent.agent_id);
                }
            }
            audience.agent_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            audience.agent_ids.dedup();
            scopes.insert(AddressResolver::everyone_scope());
        } else if audience.is_everyone {
            scopes.insert(AddressResolver::everyone_scope());
        }

        let thread_id = match &req.reply_to {
            Some(parent_id) => Some(self.thread_root(parent_id)?),
            None => None,
        };

        let message = Message {
            message_id: MessageId::generate(now),
            author_agent_id: req.acting_as.unwrap_or(req.author),
            authored_by: req.acting_as.map(|_| req.author),
            disclosed: req.acting_as.is_some() && req.disclosed,
            body: MessageBody { format: req.format.unwrap_or(thrum_core::BodyFormat::Plain), content: req.content.to_string() },
            structured: req.structured,
            priority: req.priority,
            mentions: req.mentions.iter().cloned().collect(),
            scopes,
            refs: req.refs.into_iter().collect(),
            reply_to: req.reply_to,
            thread_id,
            created_at: now,
            updated_at: None,
            deleted_at: None,
            updated_by_daemon_id: None,
            audience: audience.agent_ids.clone(),
        };
        // A reply with no parent resolved is its own thread root (§4.5
        // "thread_id: walk reply_to to root").
        let message = if message.thread_id.is_none() {
            let mut m = message;
            m.thread_id = Some(m.message_id.clone());
            m
        } else {
            message
        };

        let snapshot = serde_json::to_value(&message).map_err(|e| MessageError::Invalid(e.to_string()))?;
        let payload = thrum_core::EventPayload::MessageCreated {
            message_id: message.message_id.clone(),
            author_agent_id: message.author_agent_id,
            audience: message.audience.clone(),
            mentions: message.mentions.iter().cloned().collect(),
            scopes: message.scopes.iter().cloned().collect(),
            priority: message.priority,
            reply_to: message.reply_to.clone(),
            thread_id: message.thread_id.clone(),
            created_at: message.created_at,
            snapshot,
        };
        // Message + audience rows and the `message_created` event commit
        // together (§4.2/§4.5) — a crash between the two would otherwise
        // leave a locally-visible message that never exports via sync.
        self.store
            .write(|tx| {
                thrum_storage::repo::messages::insert_tx(tx, &message)?;
                thrum_storage::event_log::append_tx(tx, &self.daemon_id, &payload, now)
            })
            .map_err(MessageError::from)?;

        self.notify.publish(&self.store, &message);

        Ok(SendOutcome { message, resolved_to: audience.agent_ids, warnings: audience.warnings })
    }

    /// Resolves `reply_to`'s thread root (§4.5: "thread_id: walk reply_to
    /// to root"). Every stored message already carries its own resolved
    /// `thread_id` (a root message's `thread_id` is itself), so one lookup
    /// of the immediate parent is enough — no recursive walk needed.
    fn thread_root(&self, parent_id: &MessageId) -> Result<MessageId, DaemonError> {
        match thrum_storage::repo::messages::find_by_id(&self.store, parent_id).map_err(MessageError::from)? {
            Some(parent) => Ok(parent.thread_id.unwrap_or(parent.message_id)),
            None => Ok(parent_id.clone()),
        }
    }

    pub fn get_message(&self, message_id: &MessageId) -> Result<Option<Message>, DaemonError> {
        Ok(thrum_storage::repo::messages::find_by_id(&self.store, message_id).map_err(MessageError::from)?)
    }

    pub fn list_messages(&self, filter: &MessageFilter, page: u32, page_size: u32, sort: SortOrder) -> Result<Page, DaemonError> {
        Ok(thrum_storage::repo::messages::list(&self.store, filter, page, page_size, sort).map_err(MessageError::from)?)
    }

    /// Only the author may edit their own message (§4.5 "author-only
    /// enforcement"); editing a deleted message is rejected.
    pub fn edit_message(&self, message_id: &MessageId, caller: &thrum_core::AgentId, new_content: &str) -> Result<(), DaemonError> {
        let message = thrum_storage::repo::messages::find_by_id(&self.store, message_id)
            .map_err(MessageError::from)?
            .ok_or_else(|| MessageError::NotFound(message_id.to_string()))?;
        if &message.author_agent_id != caller {
            return Err(MessageError::NotAuthorized(format!("{caller} is not the author of {message_id}")).into());
        }
        if message.is_deleted() {
            return Err(MessageError::Invalid("cannot edit a deleted message".into()).into());
        }
        let now = self.clock.utc_now();
        let payload = thrum_core::EventPayload::MessageEdited {
            message_id: message_id.clone(),
            content: new_content.to_string(),
            updated_at: now,
        };
        // Edit + its event commit atomically (§4.2/§4.5); a losing LWW
        // edit (see `edit_content_tx`) still records no event either way.
        self.store
            .write(|tx| {
                let applied = thrum_storage::repo::messages::edit_content_tx(
                    tx,
                    message_id,
                    new_content,
                    now,
                    &self.daemon_id,
                )?;
                if applied {
                    thrum_storage::event_log::append_tx(tx, &self.daemon_id, &payload, now)?;
                }
                Ok(())
            })
            .map_err(MessageError::from)?;
        Ok(())
    }

    /// Only the author may delete their own message (§4.5). Deletion is a
    /// tombstone, not a row removal (§3).
    pub fn delete_message(&self, message_id: &MessageId, caller: &thrum_core::AgentId) -> Result<(), DaemonError> {
        let message = thrum_storage::repo::messages::find_by_id(&self.store, message_id)
            .map_err(MessageError::from)?
            .ok_or_else(|| MessageError::NotFound(message_id.to_string()))?;
        if &message.author_agent_id != caller {
            return Err(MessageError::NotAuthorized(format!("{caller} is not the author of {message_id}")).into());
        }
        let now = self.clock.utc_now();
        let payload = thrum_core::EventPayload::MessageDeleted { message_id: message_id.clone(), deleted_at: now };
        self.store
            .write(|tx| {
                thrum_storage::repo::messages::soft_delete_tx(tx, message_id, now)?;
                thrum_storage::event_log::append_tx(tx, &self.daemon_id, &payload, now)?;
                Ok(())
            })
            .map_err(MessageError::from)?;
        Ok(())
    }

    /// Marks one or more messages read for `reader`. Commutative and
    /// idempotent by construction (§9 open question, resolved in
    /// DESIGN.md): re-marking an already-read message is a no-op, and the
    /// order of `message_ids` never matters.
    pub fn mark_read(&self, message_ids: &[MessageId], reader: &thrum_core::AgentId) -> Result<usize, DaemonError> {
        let now = self.clock.utc_now();
        let mut marked = 0;
        for message_id in message_ids {
            let payload = thrum_core::EventPayload::ReadMarked {
                message_id: message_id.clone(),
                reader_agent_id: *reader,
                read_at: now,
            };
            let changed = self
                .store
                .write(|tx| {
                    let changed = thrum_storage::repo::messages::mark_read_tx(tx, message_id, reader, now)?;
                    if changed {
                        thrum_storage::event_log::append_tx(tx, &self.daemon_id, &payload, now)?;
                    }
                    Ok(changed)
                })
                .map_err(MessageError::from)?;
            if changed {
                marked += 1;
            }
        }
        Ok(marked)
    }
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
