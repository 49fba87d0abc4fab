// SPDX-License-Identifier: MIT

//! Event log compaction (SPEC_FULL.md supplement: "Store snapshotting for
//! fast restart").
//!
//! Unlike the teacher's WAL, this Store never needs to *replay* anything
//! at startup — the materialized tables are written in the same
//! transaction as the event they derive from. What still grows without
//! bound is the `events` table itself, since every peer may need to pull
//! any sequence it hasn't seen yet. `compact` archives everything up to
//! `keep_after` (the lowest cursor among all known peers) into a
//! zstd-compressed snapshot file and prunes those rows, the same
//! checkpoint-then-truncate shape as the teacher's `Checkpointer`.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thrum_core::{DaemonId, Event};

use crate::error::{StoreError, StoreResult};
use crate::store::Store;

pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: u32,
    pub daemon_id: DaemonId,
    pub compacted_through: u64,
    pub written_at: DateTime<Utc>,
}

fn snapshot_path(dir: &Path, daemon_id: &DaemonId) -> PathBuf {
    dir.join(format!("{}.snapshot.zst", daemon_id.as_str()))
}

fn meta_path(dir: &Path, daemon_id: &DaemonId) -> PathBuf {
    dir.join(format!("{}.snapshot.meta.json", daemon_id.as_str()))
}

/// Archives events for `daemon_id` with `sequence <= keep_after` and
/// deletes them from the live table. Returns `None` if there was nothing
/// to compact (keeps callers from writing empty snapshot files).
pub fn compact(store: &Store, dir: &Path, daemon_id: &DaemonId, keep_after: u64) -> StoreResult<Option<SnapshotMeta>> {
    fs::create_dir_all(dir)?;

    let archived: Vec<Event> = {
        let conn = store.lock();
        let mut stmt = conn.prepare(
            "SELECT daemon_id, sequence, payload, produced_at FROM events WHERE daemon_id = ?1 AND sequence <= ?2 ORDER BY sequence ASC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![daemon_id.as_str(), keep_after as i64],
            |row| {
                let payload_json: String = row.get(2)?;
                let produced_at: String = row.get(3)?;
                Ok((payload_json, produced_at, row.get::<_, i64>(1)?))
            },
        )?;
        let mut out = Vec::new();
        for row in rows {
            let (payload_json, produced_at, sequence) = row?;
            let payload = serde_json::from_str(&payload_json)?;
            out.push(Event {
                daemon_id: *daemon_id,
                sequence: sequence as u64,
                payload,
                produced_at: DateTime::parse_from_rfc3339(&produced_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_default(),
            });
        }
        out
    };

    if archived.is_empty() {
        return Ok(None);
    }

    let json = serde_json::to_vec(&archived)?;
    let compressed = zstd::encode_all(json.as_slice(), 0)?;
    fs::write(snapshot_path(dir, daemon_id), compressed)?;

    let meta = SnapshotMeta {
        version: CURRENT_SNAPSHOT_VERSION,
        daemon_id: *daemon_id,
        compacted_through: keep_after,
        written_at: Utc::now(),
    };
    let mut meta_file = fs::File::create(meta_path(dir, daemon_id))?;
    meta_file.write_all(&serde_json::to_vec_pretty(&meta)?)?;

    store.lock().execute(
        "DELETE FROM events WHERE daemon_id = ?1 AND sequence <= ?2",
        rusqlite::params![daemon_id.as_str(), keep_after as i64],
    )?;

    tracing::info!(daemon_id = %daemon_id, through = keep_after, "compacted event log");
    Ok(Some(meta))
}

pub fn load_meta(dir: &Path, daemon_id: &DaemonId) -> StoreResult<Option<SnapshotMeta>> {
    let path = meta_path(dir, daemon_id);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Reads back an archived batch, e.g. to answer a peer pull that asks for
/// a sequence already compacted out of the live `events` table.
pub fn load_archived_events(dir: &Path, daemon_id: &DaemonId) -> StoreResult<Vec<Event>> {
    let path = snapshot_path(dir, daemon_id);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let compressed = fs::read(&path)?;
    let json = zstd::decode_all(compressed.as_slice()).map_err(|e| StoreError::SnapshotCorrupt(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
