// SPDX-License-Identifier: MIT

//! C4 AddressResolver (§4.4): expands a send's recipient tokens into a
//! concrete audience with de-duplication and cycle protection.
//!
//! Grounded on `oj_core::crew.rs`'s membership-container shape, with the
//! cycle-guard style seen in the teacher's runtime reconciliation loops
//! (a `visited` set threaded through recursive expansion).

use std::collections::HashSet;

use thrum_core::{AgentId, GroupId, MemberType, Scope, EVERYONE_GROUP_NAME};
use thrum_storage::Store;

use crate::error::AddressError;

/// Result of resolving a send's recipient tokens (§4.4 "Return shape").
#[derive(Debug, Clone, Default)]
pub struct Audience {
    pub agent_ids: Vec<AgentId>,
    pub resolved_to: Vec<String>,
    pub warnings: Vec<String>,
    /// Whether the effective audience is "every agent" — callers attach
    /// `Scope::everyone()` when this is true (§4.4 third bullet).
    pub is_everyone: bool,
}

pub struct AddressResolver;

impl AddressResolver {
    /// Resolves `mentions` and `to` tokens (merged; both are recipient
    /// tokens per §4.4) against the current agent/group state.
    ///
    /// `author` is excluded from the final audience unless it was
    /// explicitly named by a token that resolved directly to its agent_id
    /// (§4.4: "the author is excluded from the audience of their own
    /// broadcast, but is included if explicitly named").
    pub fn resolve(
        store: &Store,
        author: &AgentId,
        mentions: &[String],
        to: &[String],
    ) -> Result<Audience, AddressError> {
        let mut audience = HashSet::new();
        let mut explicit_author_named = false;
        let mut resolved_to = Vec::new();
        let mut warnings = Vec::new();
        let mut is_everyone = false;

        let tokens = mentions.iter().chain(to.iter());
        for token in tokens {
            let normalized = token.trim_start_matches('@');
            let mut matched = false;

            // 1. a known agent name
            if let Some(agent) = thrum_storage::repo::agents::find_by_name(store, normalized)? {
                matched = true;
                if &agent.agent_id == author {
                    explicit_author_named = true;
                }
                audience.insert(agent.agent_id);
                resolved_to.push(agent.agent_id.to_string());
            }

            // 2. a known agent role (possibly multi-match)
            if !matched {
                let by_role = thrum_storage::repo::agents::list_by_role(store, normalized)?;
                if !by_role.is_empty() {
                    matched = true;
                    for agent in by_role {
                        audience.insert(agent.agent_id);
                    }
                    resolved_to.push(format!("role:{normalized}"));
                }
            }

            // 3. a known group name
            if !matched {
                if let Some(group) = thrum_storage::repo::groups::find_by_name(store, normalized)? {
                    matched = true;
                    let mut visited = HashSet::new();
                    let expanded = expand_group(store, &group.group_id, &mut visited)?;
                    audience.extend(expanded);
                    resolved_to.push(format!("group:{}", group.name));
                    if group.is_everyone() {
                        is_everyone = true;
                    }
                }
            }

            // 4. the literal @everyone
            if !matched && (normalized == "everyone" || token == EVERYONE_GROUP_NAME) {
                if let Some(group) = thrum_storage::repo::groups::find_by_name(store, EVERYONE_GROUP_NAME)? {
                    matched = true;
                    let mut visited = HashSet::new();
                    let expanded = expand_group(store, &group.group_id, &mut visited)?;
                    audience.extend(expanded);
                    resolved_to.push(format!("group:{EVERYONE_GROUP_NAME}"));
                    is_everyone = true;
                }
            }

            if !matched {
                warnings.push(format!("unresolved: {normalized}"));
            }
        }

        if !explicit_author_named {
            audience.remove(author);
        }

        let mut agent_ids: Vec<AgentId> = audience.into_iter().collect();
        agent_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        Ok(Audience { agent_ids, resolved_to, warnings, is_everyone })
    }

    /// The scope attached to a send whose audience is effectively every
    /// agent in the repo (§4.4).
    pub fn everyone_scope() -> Scope {
        Scope::everyone()
    }
}

/// Recursively expands a group's membership. `visited` truncates (not
/// errors) a branch that revisits an already-expanded group, handling
/// nested-group cycles (§4.4, §8-5).
fn expand_group(
    store: &Store,
    group_id: &GroupId,
    visited: &mut HashSet<GroupId>,
) -> Result<HashSet<AgentId>, AddressError> {
    let mut out = HashSet::new();
    if !visited.insert(*group_id) {
        return Ok(out);
    }

    for member in thrum_storage::repo::groups::members(store, group_id)? {
        match member.member_type {
            MemberType::Agent => {
                out.insert(AgentId::from_string(member.member_value));
            }
            MemberType::Role => {
                for agent in thrum_storage::repo::agents::list_by_role(store, &member.member_value)? {
                    out.insert(agent.agent_id);
                }
            }
            MemberType::Group => {
                if let Some(nested) = thrum_storage::repo::groups::find_by_id_or_name(store, &member.member_value)? {
                    out.extend(expand_group(store, &nested.group_id, visited)?);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod tests;
