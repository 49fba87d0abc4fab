// SPDX-License-Identifier: MIT

//! Per-agent saved context / preamble repository (§4.9 "Context & Preamble",
//! supplement — see SPEC_FULL.md).

use rusqlite::{params, OptionalExtension};
use thrum_core::AgentId;

use super::util::to_rfc3339;
use crate::error::StoreResult;
use crate::store::Store;

pub fn save_context(store: &Store, agent_id: &AgentId, content: &str, at: chrono::DateTime<chrono::Utc>) -> StoreResult<()> {
    store.lock().execute(
        "INSERT INTO agent_context (agent_id, content, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(agent_id) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
        params![agent_id.as_str(), content, to_rfc3339(at)],
    )?;
    Ok(())
}

pub fn show_context(store: &Store, agent_id: &AgentId) -> StoreResult<Option<String>> {
    let conn = store.lock();
    Ok(conn
        .query_row("SELECT content FROM agent_context WHERE agent_id = ?1", [agent_id.as_str()], |row| row.get(0))
        .optional()?)
}

pub fn clear_context(store: &Store, agent_id: &AgentId) -> StoreResult<()> {
    store.lock().execute("UPDATE agent_context SET content = NULL WHERE agent_id = ?1", [agent_id.as_str()])?;
    Ok(())
}

pub fn save_preamble(store: &Store, agent_id: &AgentId, content: &str, at: chrono::DateTime<chrono::Utc>) -> StoreResult<()> {
    store.lock().execute(
        "INSERT INTO agent_context (agent_id, preamble, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(agent_id) DO UPDATE SET preamble = excluded.preamble, updated_at = excluded.updated_at",
        params![agent_id.as_str(), content, to_rfc3339(at)],
    )?;
    Ok(())
}

pub fn show_preamble(store: &Store, agent_id: &AgentId) -> StoreResult<Option<String>> {
    let conn = store.lock();
    Ok(conn
        .query_row("SELECT preamble FROM agent_context WHERE agent_id = ?1", [agent_id.as_str()], |row| row.get(0))
        .optional()?)
}

/// Summary rows for `agent.listContext` (§6.1).
pub struct ContextSummary {
    pub agent_id: AgentId,
    pub has_context: bool,
    pub has_preamble: bool,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn list_summaries(store: &Store) -> StoreResult<Vec<ContextSummary>> {
    let conn = store.lock();
    let mut stmt = conn.prepare(
        "SELECT agent_id, content IS NOT NULL, preamble IS NOT NULL, updated_at FROM agent_context",
    )?;
    let rows = stmt.query_map([], |row| {
        let agent_id: String = row.get(0)?;
        let has_context: bool = row.get(1)?;
        let has_preamble: bool = row.get(2)?;
        let updated_at: Option<String> = row.get(3)?;
        Ok((agent_id, has_context, has_preamble, updated_at))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (agent_id, has_context, has_preamble, updated_at) = row?;
        out.push(ContextSummary {
            agent_id: AgentId::from_string(agent_id),
            has_context,
            has_preamble,
            updated_at: updated_at.and_then(|s| super::util::from_rfc3339(&s).ok()),
        });
    }
    Ok(out)
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
