// SPDX-License-Identifier: MIT

//! C2 EventLog: append-only, per-daemon sequence numbers (§3 "Event", §4.2).
//!
//! `(daemon_id, sequence)` is the cursor every replica (the git export/
//! import pipeline, direct peer sync) advances through. Sequences are
//! assigned here, never by the caller, so two concurrent appends for the
//! same `daemon_id` can never collide.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use thrum_core::{DaemonId, Event, EventPayload};

use crate::error::StoreResult;
use crate::store::Store;

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_default()
}

fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let payload_json: String = row.get("payload")?;
    let produced_at: String = row.get("produced_at")?;
    let payload: EventPayload = serde_json::from_str(&payload_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;
    Ok(Event {
        daemon_id: DaemonId::from_string(row.get::<_, String>("daemon_id")?),
        sequence: row.get::<_, i64>("sequence")? as u64,
        payload,
        produced_at: parse_rfc3339(&produced_at),
    })
}

/// Appends `payload` for `daemon_id`, assigning the next sequence number
/// in its own transaction. Callers that must have this event commit
/// atomically with the mutation it describes (§4.2/§4.5 "all in one
/// transaction") should use [`append_tx`] inside a [`Store::write`]
/// alongside the repo write instead.
pub fn append(store: &Store, daemon_id: &DaemonId, payload: &EventPayload, produced_at: chrono::DateTime<chrono::Utc>) -> StoreResult<Event> {
    store.write(|tx| append_tx(tx, daemon_id, payload, produced_at))
}

/// Transaction-scoped half of [`append`]: assigns the next sequence
/// number for `daemon_id` by reading the current max within `tx`, so a
/// repo write sharing the same transaction can never observe this event
/// committed without its effect, or vice versa.
pub fn append_tx(
    tx: &rusqlite::Transaction<'_>,
    daemon_id: &DaemonId,
    payload: &EventPayload,
    produced_at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<Event> {
    let next_seq: i64 = tx.query_row(
        "SELECT COALESCE(MAX(sequence), 0) + 1 FROM events WHERE daemon_id = ?1",
        [daemon_id.as_str()],
        |row| row.get(0),
    )?;
    let payload_json = serde_json::to_string(payload)?;
    tx.execute(
        "INSERT INTO events (daemon_id, sequence, payload, produced_at) VALUES (?1, ?2, ?3, ?4)",
        params![daemon_id.as_str(), next_seq, payload_json, produced_at.to_rfc3339()],
    )?;
    Ok(Event { daemon_id: *daemon_id, sequence: next_seq as u64, payload: payload.clone(), produced_at })
}

/// All events for `daemon_id` with `sequence > since`, in order — what
/// GitSyncLoop exports and what PeerSync streams to a freshly paired
/// peer (§4.2, §4.10).
pub fn entries_after(store: &Store, daemon_id: &DaemonId, since: u64) -> StoreResult<Vec<Event>> {
    let conn = store.lock();
    let mut stmt = conn.prepare(
        "SELECT * FROM events WHERE daemon_id = ?1 AND sequence > ?2 ORDER BY sequence ASC",
    )?;
    let rows = stmt.query_map(params![daemon_id.as_str(), since as i64], row_to_event)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn latest_sequence(store: &Store, daemon_id: &DaemonId) -> StoreResult<u64> {
    let conn = store.lock();
    let seq: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sequence), 0) FROM events WHERE daemon_id = ?1",
        [daemon_id.as_str()],
        |row| row.get(0),
    )?;
    Ok(seq as u64)
}

/// Appends an event that arrived pre-sequenced from a peer or the git
/// import pipeline — its `(daemon_id, sequence)` is foreign and must be
/// preserved verbatim, not reassigned (§4.3 replication).
pub fn append_foreign(store: &Store, event: &Event) -> StoreResult<()> {
    store.lock().execute(
        "INSERT OR IGNORE INTO events (daemon_id, sequence, payload, produced_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            event.daemon_id.as_str(),
            event.sequence as i64,
            serde_json::to_string(&event.payload)?,
            event.produced_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
