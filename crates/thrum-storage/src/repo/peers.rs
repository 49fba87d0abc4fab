// SPDX-License-Identifier: MIT

//! Peer repository (§3 "Peer", §4.10 pairing/sync bookkeeping).

use rusqlite::{params, OptionalExtension, Row};
use thrum_core::{DaemonId, PairingCode, Peer};

use super::util::{from_rfc3339, to_rfc3339};
use crate::error::StoreResult;
use crate::store::Store;

fn row_to_peer(row: &Row) -> rusqlite::Result<Peer> {
    let paired_at: String = row.get("paired_at")?;
    let last_sync_at: Option<String> = row.get("last_sync_at")?;
    Ok(Peer {
        daemon_id: DaemonId::from_string(row.get::<_, String>("daemon_id")?),
        name: row.get("name")?,
        address: row.get("address")?,
        pair_token: row.get::<_, Option<String>>("pair_token")?.unwrap_or_default(),
        paired_at: from_rfc3339(&paired_at).unwrap_or_default(),
        last_sync_at: last_sync_at.and_then(|s| from_rfc3339(&s).ok()),
        last_known_seq: row.get::<_, i64>("last_known_seq")? as u64,
    })
}

pub fn upsert(store: &Store, peer: &Peer) -> StoreResult<()> {
    store.lock().execute(
        "INSERT INTO peers (daemon_id, name, address, pair_token, paired_at, last_sync_at, last_known_seq)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(daemon_id) DO UPDATE SET
            name = excluded.name,
            address = excluded.address,
            pair_token = excluded.pair_token,
            last_sync_at = excluded.last_sync_at,
            last_known_seq = excluded.last_known_seq",
        params![
            peer.daemon_id.as_str(),
            peer.name,
            peer.address,
            peer.pair_token,
            to_rfc3339(peer.paired_at),
            peer.last_sync_at.map(to_rfc3339),
            peer.last_known_seq as i64,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(store: &Store, daemon_id: &DaemonId) -> StoreResult<Option<Peer>> {
    let conn = store.lock();
    Ok(conn
        .query_row("SELECT * FROM peers WHERE daemon_id = ?1", [daemon_id.as_str()], row_to_peer)
        .optional()?)
}

/// Looks a peer up by its shared `pair_token` — how every sync RPC
/// authorizes the caller (§4.10 "each sync RPC carries the `pair_token`").
pub fn find_by_pair_token(store: &Store, pair_token: &str) -> StoreResult<Option<Peer>> {
    let conn = store.lock();
    Ok(conn
        .query_row("SELECT * FROM peers WHERE pair_token = ?1", [pair_token], row_to_peer)
        .optional()?)
}

pub fn list_all(store: &Store) -> StoreResult<Vec<Peer>> {
    let conn = store.lock();
    let mut stmt = conn.prepare("SELECT * FROM peers ORDER BY paired_at ASC")?;
    let rows = stmt.query_map([], row_to_peer)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn remove(store: &Store, daemon_id: &DaemonId) -> StoreResult<()> {
    store.lock().execute("DELETE FROM peers WHERE daemon_id = ?1", [daemon_id.as_str()])?;
    Ok(())
}

pub fn update_sync_progress(store: &Store, daemon_id: &DaemonId, at: chrono::DateTime<chrono::Utc>, seq: u64) -> StoreResult<()> {
    store.lock().execute(
        "UPDATE peers SET last_sync_at = ?1, last_known_seq = ?2 WHERE daemon_id = ?3",
        params![to_rfc3339(at), seq as i64, daemon_id.as_str()],
    )?;
    Ok(())
}

/// Issues and persists a fresh pairing code, replacing any unexpired one
/// (only one code needs to be live at a time — §4.10).
pub fn issue_pairing_code(store: &Store, code: &PairingCode) -> StoreResult<()> {
    let mut conn = store.lock();
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM pairing_codes", [])?;
    tx.execute(
        "INSERT INTO pairing_codes (code, issued_at) VALUES (?1, ?2)",
        params![code.code, to_rfc3339(code.issued_at)],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn current_pairing_code(store: &Store) -> StoreResult<Option<PairingCode>> {
    let conn = store.lock();
    conn.query_row("SELECT code, issued_at FROM pairing_codes LIMIT 1", [], |row| {
        let issued_at: String = row.get(1)?;
        Ok((row.get::<_, String>(0)?, issued_at))
    })
    .optional()?
    .map(|(code, issued_at)| -> StoreResult<PairingCode> {
        Ok(PairingCode { code, issued_at: from_rfc3339(&issued_at)? })
    })
    .transpose()
}

pub fn clear_pairing_code(store: &Store) -> StoreResult<()> {
    store.lock().execute("DELETE FROM pairing_codes", [])?;
    Ok(())
}

#[cfg(test)]
#[path = "peers_tests.rs"]
mod tests;
