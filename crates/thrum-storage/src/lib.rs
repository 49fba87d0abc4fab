// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! thrum-storage: the single-writer SQLite store (C1), the append-only
//! event log (C2), and the idempotent projector (C3) that derives
//! materialized rows from events.
//!
//! Everything above the connection lives in [`repo`]; nothing outside
//! this crate touches a [`rusqlite::Connection`] directly.

pub mod error;
pub mod event_log;
pub mod projector;
pub mod repo;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use event_log::{append, append_foreign, entries_after, latest_sequence};
pub use projector::{apply, apply_and_advance};
pub use schema::{run_migrations, CURRENT_SCHEMA_VERSION};
pub use snapshot::{compact, load_archived_events, load_meta, SnapshotMeta, CURRENT_SNAPSHOT_VERSION};
pub use store::Store;
