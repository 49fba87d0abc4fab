// SPDX-License-Identifier: MIT

//! Agent repository (§3 "Agent", §4.6 AgentRegistry operations).

use rusqlite::{params, OptionalExtension, Row};
use thrum_core::{Agent, AgentId, AgentKind};

use super::util::{from_rfc3339, to_rfc3339};
use crate::error::StoreResult;
use crate::store::Store;

fn row_to_agent(row: &Row) -> rusqlite::Result<Agent> {
    let kind_str: String = row.get("kind")?;
    let registered_at: String = row.get("registered_at")?;
    let last_seen_at: String = row.get("last_seen_at")?;
    Ok(Agent {
        agent_id: AgentId::from_string(row.get::<_, String>("agent_id")?),
        kind: if kind_str == "user" { AgentKind::User } else { AgentKind::Agent },
        role: row.get("role")?,
        module: row.get("module")?,
        display: row.get("display")?,
        name: row.get("name")?,
        registered_at: from_rfc3339(&registered_at).unwrap_or_default(),
        last_seen_at: from_rfc3339(&last_seen_at).unwrap_or_default(),
        worktree_label: row.get("worktree_label")?,
    })
}

/// Insert a brand-new agent or overwrite an existing row in place
/// (`force`/`re_register`, §4.6 "Registration rules").
pub fn upsert(store: &Store, agent: &Agent) -> StoreResult<()> {
    let kind_str = match agent.kind {
        AgentKind::Agent => "agent",
        AgentKind::User => "user",
    };
    store.lock().execute(
        "INSERT INTO agents (agent_id, kind, role, module, display, name, registered_at, last_seen_at, worktree_label)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(agent_id) DO UPDATE SET
            kind = excluded.kind,
            role = excluded.role,
            module = excluded.module,
            display = excluded.display,
            name = excluded.name,
            last_seen_at = excluded.last_seen_at,
            worktree_label = excluded.worktree_label",
        params![
            agent.agent_id.as_str(),
            kind_str,
            agent.role,
            agent.module,
            agent.display,
            agent.name,
            to_rfc3339(agent.registered_at),
            to_rfc3339(agent.last_seen_at),
            agent.worktree_label,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(store: &Store, agent_id: &AgentId) -> StoreResult<Option<Agent>> {
    let conn = store.lock();
    Ok(conn
        .query_row("SELECT * FROM agents WHERE agent_id = ?1", [agent_id.as_str()], row_to_agent)
        .optional()?)
}

pub fn find_by_name(store: &Store, name: &str) -> StoreResult<Option<Agent>> {
    let conn = store.lock();
    Ok(conn.query_row("SELECT * FROM agents WHERE name = ?1", [name], row_to_agent).optional()?)
}

pub fn list_all(store: &Store) -> StoreResult<Vec<Agent>> {
    let conn = store.lock();
    let mut stmt = conn.prepare("SELECT * FROM agents ORDER BY registered_at ASC")?;
    let rows = stmt.query_map([], row_to_agent)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_by_role(store: &Store, role: &str) -> StoreResult<Vec<Agent>> {
    let conn = store.lock();
    let mut stmt =
        conn.prepare("SELECT * FROM agents WHERE role = ?1 ORDER BY registered_at ASC")?;
    let rows = stmt.query_map([role], row_to_agent)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn touch_last_seen(store: &Store, agent_id: &AgentId, at: chrono::DateTime<chrono::Utc>) -> StoreResult<()> {
    store.lock().execute(
        "UPDATE agents SET last_seen_at = ?1 WHERE agent_id = ?2",
        params![to_rfc3339(at), agent_id.as_str()],
    )?;
    Ok(())
}

pub fn delete(store: &Store, agent_id: &AgentId) -> StoreResult<()> {
    store.lock().execute("DELETE FROM agents WHERE agent_id = ?1", [agent_id.as_str()])?;
    Ok(())
}

/// Candidates for `agent.cleanup`: agents with no session heartbeat in
/// `stale_after` and no active session (§4.6 "Cleanup").
pub fn list_stale(
    store: &Store,
    stale_before: chrono::DateTime<chrono::Utc>,
) -> StoreResult<Vec<Agent>> {
    let conn = store.lock();
    let mut stmt = conn.prepare(
        "SELECT a.* FROM agents a
         WHERE a.last_seen_at < ?1
         AND NOT EXISTS (SELECT 1 FROM sessions s WHERE s.agent_id = a.agent_id AND s.ended_at IS NULL)
         ORDER BY a.last_seen_at ASC",
    )?;
    let rows = stmt.query_map([to_rfc3339(stale_before)], row_to_agent)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
