// SPDX-License-Identifier: MIT

//! C3 Projector: derives materialized rows from [`EventPayload`]s.
//!
//! Mirrors the teacher's `MaterializedState::apply_event` idempotency
//! discipline: every arm here MUST be safe to run twice. The local
//! daemon applies its own events synchronously (for read-your-writes
//! visibility) and again — harmlessly — via replay; foreign events
//! (git import, direct peer sync) apply through [`apply_and_advance`],
//! which additionally skips anything already past the source's cursor.

use thrum_core::{Agent, DaemonId, EventPayload, Message, Session};

use crate::error::StoreResult;
use crate::repo::{agents, context, cursor, groups, messages, sessions};
use crate::store::Store;

/// Applies one event's effect. Idempotent per the module doc.
///
/// `daemon_id` is the daemon that *produced* the event (not necessarily
/// this daemon) — needed for the `(updated_at, daemon_id)` last-writer-wins
/// tiebreak on `MessageEdited` (§4.3).
pub fn apply(store: &Store, daemon_id: &DaemonId, payload: &EventPayload) -> StoreResult<()> {
    match payload {
        EventPayload::MessageCreated { message_id, snapshot, .. } => {
            if messages::find_by_id(store, message_id)?.is_none() {
                let message: Message = serde_json::from_value(snapshot.clone())?;
                messages::insert(store, &message)?;
            }
        }

        EventPayload::MessageEdited { message_id, content, updated_at } => {
            messages::edit_content(store, message_id, content, *updated_at, daemon_id)?;
        }

        EventPayload::MessageDeleted { message_id, deleted_at } => {
            messages::soft_delete(store, message_id, *deleted_at)?;
        }

        EventPayload::ReadMarked { message_id, reader_agent_id, read_at } => {
            // insert-or-ignore: read cannot be unmade, and out-of-order
            // arrival from peers is harmless (§4.3).
            messages::mark_read(store, message_id, reader_agent_id, *read_at)?;
        }

        EventPayload::AgentRegistered { agent_id, snapshot } => {
            let mut agent: Agent = serde_json::from_value(snapshot.clone())?;
            agent.agent_id = *agent_id;
            agents::upsert(store, &agent)?;
        }

        EventPayload::SessionStarted { session_id, snapshot, .. } => {
            if sessions::find_by_id(store, session_id)?.is_none() {
                let session: Session = serde_json::from_value(snapshot.clone())?;
                sessions::insert(store, &session)?;
            }
        }

        EventPayload::SessionHeartbeat { session_id, at } => {
            if let Some(session) = sessions::find_by_id(store, session_id)? {
                sessions::heartbeat(store, session_id, *at, &session.scopes, &session.refs, &session.work_context)?;
            }
        }

        EventPayload::SessionEnded { session_id, ended_at, reason } => {
            sessions::end(store, session_id, *ended_at, *reason)?;
        }

        EventPayload::GroupCreated { group_id, name, created_at } => {
            if groups::find_by_id(store, group_id)?.is_none() {
                match groups::find_by_name(store, name)? {
                    None => {
                        groups::insert(
                            store,
                            &thrum_core::Group {
                                group_id: *group_id,
                                name: name.clone(),
                                description: None,
                                created_at: *created_at,
                            },
                        )?;
                    }
                    // §4.3: two daemons created a group with the same name
                    // concurrently. Earlier `created_at` wins (ties broken
                    // by `group_id` so every replica agrees); the loser's
                    // members are merged into the winner and the loser's
                    // id is aliased to it so events already addressed to
                    // it still land correctly.
                    Some(existing) => {
                        let incoming_wins = (*created_at, group_id.as_str()) < (existing.created_at, existing.group_id.as_str());
                        if incoming_wins {
                            groups::insert(
                                store,
                                &thrum_core::Group {
                                    group_id: *group_id,
                                    name: name.clone(),
                                    description: existing.description.clone(),
                                    created_at: *created_at,
                                },
                            )?;
                            groups::merge_into(store, &existing.group_id, group_id)?;
                        } else {
                            groups::add_alias(store, group_id, &existing.group_id)?;
                        }
                    }
                }
            }
        }

        EventPayload::GroupDeleted { group_id } => {
            let canonical = groups::resolve_alias(store, group_id)?;
            groups::delete(store, &canonical)?;
        }

        EventPayload::GroupMemberAdded { group_id, member_type, member_value } => {
            let canonical = groups::resolve_alias(store, group_id)?;
            groups::add_member(store, &canonical, *member_type, member_value)?;
        }

        EventPayload::GroupMemberRemoved { group_id, member_type, member_value } => {
            let canonical = groups::resolve_alias(store, group_id)?;
            groups::remove_member(store, &canonical, *member_type, member_value)?;
        }

        EventPayload::ContextUpdated { agent_id, updated_at, content, is_preamble } => match (content, is_preamble) {
            (Some(text), false) => context::save_context(store, agent_id, text, *updated_at)?,
            (Some(text), true) => context::save_preamble(store, agent_id, text, *updated_at)?,
            (None, false) => context::clear_context(store, agent_id)?,
            (None, true) => {
                // No explicit clear-preamble repo call exists yet; saving
                // an empty string is the closest idempotent equivalent.
                context::save_preamble(store, agent_id, "", *updated_at)?
            }
        },
    }
    Ok(())
}

/// Applies a batch of events known to originate from `source_daemon_id`,
/// skipping any at or below that source's already-applied cursor and
/// advancing it past the batch on success (§4.2/§4.3 replication).
pub fn apply_and_advance(
    store: &Store,
    source_daemon_id: &thrum_core::DaemonId,
    events: &[thrum_core::Event],
) -> StoreResult<u64> {
    let mut cursor_seq = cursor::get(store, source_daemon_id)?;
    for event in events {
        if event.sequence <= cursor_seq {
            continue;
        }
        apply(store, &event.daemon_id, &event.payload)?;
        cursor_seq = event.sequence;
    }
    cursor::advance(store, source_daemon_id, cursor_seq)?;
    Ok(cursor_seq)
}

#[cfg(test)]
#[path = "projector_tests.rs"]
mod tests;
