// SPDX-License-Identifier: MIT

//! Session repository (§3 "Session", §4.6 SessionEngine operations).

use std::collections::BTreeSet;

use rusqlite::{params, OptionalExtension, Row};
use thrum_core::{AgentId, EndReason, Scope, Session, SessionId, WorkContext};

use super::util::{from_json, from_rfc3339, to_json, to_rfc3339};
use crate::error::StoreResult;
use crate::store::Store;

fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    let end_reason: Option<String> = row.get("end_reason")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let scopes_json: String = row.get("scopes")?;
    let refs_json: String = row.get("refs")?;
    let work_context_json: String = row.get("work_context")?;
    let started_at: String = row.get("started_at")?;
    let last_heartbeat_at: String = row.get("last_heartbeat_at")?;

    Ok(Session {
        session_id: SessionId::from_string(row.get::<_, String>("session_id")?),
        agent_id: AgentId::from_string(row.get::<_, String>("agent_id")?),
        started_at: from_rfc3339(&started_at).unwrap_or_default(),
        ended_at: ended_at.and_then(|s| from_rfc3339(&s).ok()),
        end_reason: end_reason.map(|r| match r.as_str() {
            "crash" => EndReason::Crash,
            "superseded" => EndReason::Superseded,
            _ => EndReason::Normal,
        }),
        intent: row.get("intent")?,
        task: row.get("task")?,
        scopes: from_json::<BTreeSet<Scope>>(&scopes_json).unwrap_or_default(),
        refs: from_json(&refs_json).unwrap_or_default(),
        last_heartbeat_at: from_rfc3339(&last_heartbeat_at).unwrap_or_default(),
        work_context: from_json::<WorkContext>(&work_context_json).unwrap_or_default(),
    })
}

pub fn insert(store: &Store, session: &Session) -> StoreResult<()> {
    store.lock().execute(
        "INSERT INTO sessions (session_id, agent_id, started_at, ended_at, end_reason, intent, task, scopes, refs, last_heartbeat_at, work_context)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            session.session_id.as_str(),
            session.agent_id.as_str(),
            to_rfc3339(session.started_at),
            session.ended_at.map(to_rfc3339),
            session.end_reason.map(end_reason_str),
            session.intent,
            session.task,
            to_json(&session.scopes)?,
            to_json(&session.refs)?,
            to_rfc3339(session.last_heartbeat_at),
            to_json(&session.work_context)?,
        ],
    )?;
    Ok(())
}

fn end_reason_str(r: EndReason) -> &'static str {
    match r {
        EndReason::Normal => "normal",
        EndReason::Crash => "crash",
        EndReason::Superseded => "superseded",
    }
}

pub fn find_by_id(store: &Store, session_id: &SessionId) -> StoreResult<Option<Session>> {
    let conn = store.lock();
    Ok(conn
        .query_row("SELECT * FROM sessions WHERE session_id = ?1", [session_id.as_str()], row_to_session)
        .optional()?)
}

/// At most one row per agent should ever satisfy this (§8-3 invariant);
/// callers are responsible for ending the prior session before starting a
/// new one.
pub fn find_active_for_agent(store: &Store, agent_id: &AgentId) -> StoreResult<Option<Session>> {
    let conn = store.lock();
    Ok(conn
        .query_row(
            "SELECT * FROM sessions WHERE agent_id = ?1 AND ended_at IS NULL",
            [agent_id.as_str()],
            row_to_session,
        )
        .optional()?)
}

pub fn list_for_agent(store: &Store, agent_id: &AgentId) -> StoreResult<Vec<Session>> {
    let conn = store.lock();
    let mut stmt =
        conn.prepare("SELECT * FROM sessions WHERE agent_id = ?1 ORDER BY started_at DESC")?;
    let rows = stmt.query_map([agent_id.as_str()], row_to_session)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_all_active(store: &Store) -> StoreResult<Vec<Session>> {
    let conn = store.lock();
    let mut stmt =
        conn.prepare("SELECT * FROM sessions WHERE ended_at IS NULL ORDER BY started_at DESC")?;
    let rows = stmt.query_map([], row_to_session)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn end(store: &Store, session_id: &SessionId, at: chrono::DateTime<chrono::Utc>, reason: EndReason) -> StoreResult<()> {
    store.lock().execute(
        "UPDATE sessions SET ended_at = ?1, end_reason = ?2 WHERE session_id = ?3",
        params![to_rfc3339(at), end_reason_str(reason), session_id.as_str()],
    )?;
    Ok(())
}

pub fn set_intent(store: &Store, session_id: &SessionId, intent: &str) -> StoreResult<()> {
    store.lock().execute(
        "UPDATE sessions SET intent = ?1 WHERE session_id = ?2",
        params![intent, session_id.as_str()],
    )?;
    Ok(())
}

pub fn set_task(store: &Store, session_id: &SessionId, task: &str) -> StoreResult<()> {
    store.lock().execute(
        "UPDATE sessions SET task = ?1 WHERE session_id = ?2",
        params![task, session_id.as_str()],
    )?;
    Ok(())
}

/// Applies a heartbeat's scope/ref deltas and refreshed work context
/// (§4.6 "Heartbeat").
#[allow(clippy::too_many_arguments)]
pub fn heartbeat(
    store: &Store,
    session_id: &SessionId,
    at: chrono::DateTime<chrono::Utc>,
    scopes: &BTreeSet<Scope>,
    refs: &BTreeSet<thrum_core::Ref>,
    work_context: &WorkContext,
) -> StoreResult<()> {
    store.lock().execute(
        "UPDATE sessions SET last_heartbeat_at = ?1, scopes = ?2, refs = ?3, work_context = ?4 WHERE session_id = ?5",
        params![
            to_rfc3339(at),
            to_json(scopes)?,
            to_json(refs)?,
            to_json(work_context)?,
            session_id.as_str(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
