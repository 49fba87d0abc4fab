// SPDX-License-Identifier: MIT

//! Group repository (§3 "Group"/"GroupMember", §4.4 membership expansion).

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension, Row};
use thrum_core::{AgentId, Group, GroupId, GroupMember, MemberType, EVERYONE_GROUP_NAME};

use super::util::{from_rfc3339, to_rfc3339};
use crate::error::StoreResult;
use crate::store::Store;

fn row_to_group(row: &Row) -> rusqlite::Result<Group> {
    let created_at: String = row.get("created_at")?;
    Ok(Group {
        group_id: GroupId::from_string(row.get::<_, String>("group_id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: from_rfc3339(&created_at).unwrap_or_default(),
    })
}

fn member_type_str(t: MemberType) -> &'static str {
    match t {
        MemberType::Agent => "agent",
        MemberType::Role => "role",
        MemberType::Group => "group",
    }
}

fn parse_member_type(s: &str) -> MemberType {
    match s {
        "role" => MemberType::Role,
        "group" => MemberType::Group,
        _ => MemberType::Agent,
    }
}

pub fn insert(store: &Store, group: &Group) -> StoreResult<()> {
    store.lock().execute(
        "INSERT INTO groups (group_id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![group.group_id.as_str(), group.name, group.description, to_rfc3339(group.created_at)],
    )?;
    Ok(())
}

/// Creates `@everyone` if it does not already exist (Lifecycle startup
/// step, §3/§4.4).
pub fn ensure_everyone(store: &Store, at: chrono::DateTime<chrono::Utc>) -> StoreResult<()> {
    if find_by_name(store, EVERYONE_GROUP_NAME)?.is_none() {
        insert(
            store,
            &Group {
                group_id: GroupId::new(),
                name: EVERYONE_GROUP_NAME.to_string(),
                description: Some("every agent registered in this repo".to_string()),
                created_at: at,
            },
        )?;
    }
    Ok(())
}

pub fn find_by_id(store: &Store, group_id: &GroupId) -> StoreResult<Option<Group>> {
    let conn = store.lock();
    Ok(conn
        .query_row("SELECT * FROM groups WHERE group_id = ?1", [group_id.as_str()], row_to_group)
        .optional()?)
}

pub fn find_by_name(store: &Store, name: &str) -> StoreResult<Option<Group>> {
    let conn = store.lock();
    Ok(conn.query_row("SELECT * FROM groups WHERE name = ?1", [name], row_to_group).optional()?)
}

/// Resolves either a `grp-...` id or a bare/`@`-prefixed name, the way
/// every group-taking RPC accepts both (§6.1).
pub fn find_by_id_or_name(store: &Store, group_ref: &str) -> StoreResult<Option<Group>> {
    if group_ref.starts_with(GroupId::PREFIX) {
        find_by_id(store, &GroupId::from_string(group_ref))
    } else {
        find_by_name(store, group_ref)
    }
}

pub fn list_all(store: &Store) -> StoreResult<Vec<Group>> {
    let conn = store.lock();
    let mut stmt = conn.prepare("SELECT * FROM groups ORDER BY created_at ASC")?;
    let rows = stmt.query_map([], row_to_group)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Refuses to delete `@everyone` (§3 invariant: it "MUST exist").
pub fn delete(store: &Store, group_id: &GroupId) -> StoreResult<bool> {
    if let Some(group) = find_by_id(store, group_id)? {
        if group.is_everyone() {
            return Ok(false);
        }
    }
    let mut conn = store.lock();
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM group_members WHERE group_id = ?1", [group_id.as_str()])?;
    tx.execute("DELETE FROM groups WHERE group_id = ?1", [group_id.as_str()])?;
    tx.commit()?;
    Ok(true)
}

pub fn add_member(store: &Store, group_id: &GroupId, member_type: MemberType, member_value: &str) -> StoreResult<()> {
    store.lock().execute(
        "INSERT OR IGNORE INTO group_members (group_id, member_type, member_value) VALUES (?1, ?2, ?3)",
        params![group_id.as_str(), member_type_str(member_type), member_value],
    )?;
    Ok(())
}

pub fn remove_member(store: &Store, group_id: &GroupId, member_type: MemberType, member_value: &str) -> StoreResult<()> {
    store.lock().execute(
        "DELETE FROM group_members WHERE group_id = ?1 AND member_type = ?2 AND member_value = ?3",
        params![group_id.as_str(), member_type_str(member_type), member_value],
    )?;
    Ok(())
}

pub fn members(store: &Store, group_id: &GroupId) -> StoreResult<Vec<GroupMember>> {
    let conn = store.lock();
    let mut stmt = conn.prepare(
        "SELECT member_type, member_value FROM group_members WHERE group_id = ?1 ORDER BY member_type, member_value",
    )?;
    let rows = stmt.query_map([group_id.as_str()], |row| {
        let t: String = row.get(0)?;
        let v: String = row.get(1)?;
        Ok(GroupMember { group_id: *group_id, member_type: parse_member_type(&t), member_value: v })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Follows a group-name conflict alias to its canonical group, or returns
/// `group_id` unchanged if it was never aliased away (§4.3).
pub fn resolve_alias(store: &Store, group_id: &GroupId) -> StoreResult<GroupId> {
    let conn = store.lock();
    let canonical: Option<String> = conn
        .query_row("SELECT canonical_group_id FROM group_aliases WHERE alias_group_id = ?1", [group_id.as_str()], |r| r.get(0))
        .optional()?;
    Ok(canonical.map(GroupId::from_string).unwrap_or(*group_id))
}

/// Merges a losing group's membership into the winning group's id and
/// records the redirect, so events already in flight against `from`
/// (`GroupMemberAdded`/`Removed`/`GroupDeleted`) land on `to` instead
/// (§4.3: "losing group's members are merged into the winner").
pub fn merge_into(store: &Store, from: &GroupId, to: &GroupId) -> StoreResult<()> {
    if from == to {
        return Ok(());
    }
    let mut conn = store.lock();
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT OR IGNORE INTO group_members (group_id, member_type, member_value) \
         SELECT ?1, member_type, member_value FROM group_members WHERE group_id = ?2",
        params![to.as_str(), from.as_str()],
    )?;
    tx.execute("DELETE FROM group_members WHERE group_id = ?1", [from.as_str()])?;
    tx.execute("DELETE FROM groups WHERE group_id = ?1", [from.as_str()])?;
    tx.execute(
        "INSERT OR REPLACE INTO group_aliases (alias_group_id, canonical_group_id) VALUES (?1, ?2)",
        params![from.as_str(), to.as_str()],
    )?;
    tx.commit()?;
    Ok(())
}

/// Records that `alias` lost a same-name creation race to `canonical`,
/// without `alias` ever having a `groups` row of its own (§4.3).
pub fn add_alias(store: &Store, alias: &GroupId, canonical: &GroupId) -> StoreResult<()> {
    store.lock().execute(
        "INSERT OR REPLACE INTO group_aliases (alias_group_id, canonical_group_id) VALUES (?1, ?2)",
        params![alias.as_str(), canonical.as_str()],
    )?;
    Ok(())
}

/// Every group whose membership lists `agent_id` directly (one hop, no
/// nested-group expansion — that lives in `AddressResolver`, §4.4).
pub fn groups_containing_agent(store: &Store, agent_id: &str) -> StoreResult<Vec<GroupId>> {
    let conn = store.lock();
    let mut stmt = conn.prepare(
        "SELECT group_id FROM group_members WHERE member_type = 'agent' AND member_value = ?1",
    )?;
    let rows = stmt.query_map([agent_id], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(GroupId::from_string(row?));
    }
    Ok(out)
}

/// Every group (by name) `agent_id` is a transitive member of — directly,
/// via `role`, or via nesting inside another such group. The mirror image
/// of `AddressResolver::expand_group`, which walks a group down to its
/// agents; this walks an agent up to every group that would reach it
/// (§4.4/§4.5's `for_agent` group-scope disjunct: "names a group of which
/// A is a transitive member").
///
/// Iterates to a fixpoint rather than recursing from the agent, since a
/// nested-group edge only names its child by id/name, not its parents —
/// finding "what contains me" means checking every group's membership
/// list against what's already known to contain the agent.
pub fn transitive_group_names_for_agent(
    store: &Store,
    agent_id: &AgentId,
    role: Option<&str>,
) -> StoreResult<HashSet<String>> {
    let all = list_all(store)?;
    let mut member_of: HashSet<GroupId> = HashSet::new();
    let mut changed = true;
    while changed {
        changed = false;
        for group in &all {
            if member_of.contains(&group.group_id) {
                continue;
            }
            let mut is_member = false;
            for member in members(store, &group.group_id)? {
                let hit = match member.member_type {
                    MemberType::Agent => member.member_value == agent_id.as_str(),
                    MemberType::Role => role == Some(member.member_value.as_str()),
                    MemberType::Group => find_by_id_or_name(store, &member.member_value)?
                        .is_some_and(|nested| member_of.contains(&nested.group_id)),
                };
                if hit {
                    is_member = true;
                    break;
                }
            }
            if is_member {
                member_of.insert(group.group_id);
                changed = true;
            }
        }
    }
    Ok(all.into_iter().filter(|g| member_of.contains(&g.group_id)).map(|g| g.name).collect())
}

#[cfg(test)]
#[path = "groups_tests.rs"]
mod tests;
