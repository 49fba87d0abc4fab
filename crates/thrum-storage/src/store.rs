// SPDX-License-Identifier: MIT

//! The durable relational store (§4.1).
//!
//! One writer, any number of readers: every mutation takes the single
//! `parking_lot::Mutex<Connection>` the way the teacher's daemon takes its
//! `Arc<Mutex<MaterializedState>>` — there is exactly one place contention
//! can happen, and it is always explicit.

use std::path::Path;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;

use crate::error::StoreResult;
use crate::schema;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if absent) the SQLite database at `path` and brings
    /// it up to [`schema::CURRENT_SCHEMA_VERSION`].
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut conn = Connection::open(path)?;
        Self::configure(&mut conn)?;
        schema::run_migrations(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store for tests; never touches disk.
    pub fn open_in_memory() -> StoreResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        Self::configure(&mut conn)?;
        schema::run_migrations(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn configure(conn: &mut Connection) -> StoreResult<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }

    /// Locks the single connection for the duration of the closure. Every
    /// repository method goes through this — there is no direct connection
    /// access from outside the crate.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Runs `f` against one `rusqlite::Transaction` and commits iff `f`
    /// succeeds — the way a mutation that must write more than one table
    /// (or a table write plus its [`crate::event_log`] entry, §4.2/§4.5
    /// "all in one transaction") gets atomicity without each repo call
    /// opening and committing its own transaction separately.
    pub fn write<T>(&self, f: impl FnOnce(&rusqlite::Transaction<'_>) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
