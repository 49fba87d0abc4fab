// SPDX-License-Identifier: MIT

//! Applied-cursor bookkeeping: how far the Projector has replayed events
//! from a given source daemon (§4.2, §4.3). The local daemon's own events
//! are applied synchronously at write time and never consult this table;
//! it exists for foreign streams (GitSyncLoop imports, PeerSync pulls).

use rusqlite::{params, OptionalExtension};
use thrum_core::DaemonId;

use crate::error::StoreResult;
use crate::store::Store;

pub fn get(store: &Store, source_daemon_id: &DaemonId) -> StoreResult<u64> {
    let conn = store.lock();
    let seq: Option<i64> = conn
        .query_row(
            "SELECT sequence FROM applied_cursor WHERE source_daemon_id = ?1",
            [source_daemon_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(seq.unwrap_or(0) as u64)
}

pub fn advance(store: &Store, source_daemon_id: &DaemonId, sequence: u64) -> StoreResult<()> {
    store.lock().execute(
        "INSERT INTO applied_cursor (source_daemon_id, sequence) VALUES (?1, ?2)
         ON CONFLICT(source_daemon_id) DO UPDATE SET sequence = MAX(sequence, excluded.sequence)",
        params![source_daemon_id.as_str(), sequence as i64],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
