// SPDX-License-Identifier: MIT

//! Forward-only schema migrations, tracked in a `schema_version` table.
//!
//! Every migration is one SQL batch applied inside a transaction. There is
//! no down-migration support — matching the teacher's WAL discipline,
//! state only ever moves forward.

use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[(u32, &str)] = &[(1, MIGRATION_0001)];

const MIGRATION_0001: &str = r#"
CREATE TABLE IF NOT EXISTS repo (
    repo_id TEXT PRIMARY KEY,
    daemon_id TEXT NOT NULL,
    installed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agents (
    agent_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    role TEXT NOT NULL,
    module TEXT NOT NULL,
    display TEXT,
    name TEXT,
    registered_at TEXT NOT NULL,
    last_seen_at TEXT NOT NULL,
    worktree_label TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS agents_name_unique ON agents(name) WHERE name IS NOT NULL;

CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL REFERENCES agents(agent_id),
    started_at TEXT NOT NULL,
    ended_at TEXT,
    end_reason TEXT,
    intent TEXT,
    task TEXT,
    scopes TEXT NOT NULL,
    refs TEXT NOT NULL,
    last_heartbeat_at TEXT NOT NULL,
    work_context TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS sessions_agent_idx ON sessions(agent_id);
CREATE INDEX IF NOT EXISTS sessions_active_idx ON sessions(agent_id, ended_at);

CREATE TABLE IF NOT EXISTS messages (
    message_id TEXT PRIMARY KEY,
    author_agent_id TEXT NOT NULL,
    authored_by TEXT,
    disclosed INTEGER NOT NULL,
    body_format TEXT NOT NULL,
    body_content TEXT NOT NULL,
    structured TEXT,
    priority TEXT NOT NULL,
    mentions TEXT NOT NULL,
    scopes TEXT NOT NULL,
    refs TEXT NOT NULL,
    reply_to TEXT,
    thread_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT,
    deleted_at TEXT,
    updated_by_daemon_id TEXT
);
CREATE INDEX IF NOT EXISTS messages_thread_idx ON messages(thread_id);
CREATE INDEX IF NOT EXISTS messages_created_idx ON messages(created_at);

CREATE TABLE IF NOT EXISTS message_audience (
    message_id TEXT NOT NULL REFERENCES messages(message_id),
    agent_id TEXT NOT NULL,
    PRIMARY KEY (message_id, agent_id)
);
CREATE INDEX IF NOT EXISTS message_audience_agent_idx ON message_audience(agent_id);

CREATE TABLE IF NOT EXISTS read_receipts (
    message_id TEXT NOT NULL,
    reader_agent_id TEXT NOT NULL,
    read_at TEXT NOT NULL,
    PRIMARY KEY (message_id, reader_agent_id)
);

CREATE TABLE IF NOT EXISTS groups (
    group_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id TEXT NOT NULL REFERENCES groups(group_id),
    member_type TEXT NOT NULL,
    member_value TEXT NOT NULL,
    PRIMARY KEY (group_id, member_type, member_value)
);

-- Redirects a group_id that lost a same-name creation race to the
-- canonical group_id that won (§4.3 group-name conflict rule).
CREATE TABLE IF NOT EXISTS group_aliases (
    alias_group_id TEXT PRIMARY KEY,
    canonical_group_id TEXT NOT NULL REFERENCES groups(group_id)
);

CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id TEXT PRIMARY KEY,
    client_session_id TEXT NOT NULL,
    mode TEXT NOT NULL,
    scope_type TEXT,
    scope_value TEXT,
    mention_role TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS subscriptions_client_idx ON subscriptions(client_session_id);

CREATE TABLE IF NOT EXISTS peers (
    daemon_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    pair_token TEXT,
    paired_at TEXT NOT NULL,
    last_sync_at TEXT,
    last_known_seq INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS pairing_codes (
    code TEXT PRIMARY KEY,
    issued_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    daemon_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    payload TEXT NOT NULL,
    produced_at TEXT NOT NULL,
    PRIMARY KEY (daemon_id, sequence)
);

CREATE TABLE IF NOT EXISTS applied_cursor (
    source_daemon_id TEXT PRIMARY KEY,
    sequence INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_context (
    agent_id TEXT PRIMARY KEY,
    content TEXT,
    preamble TEXT,
    updated_at TEXT
);
"#;

/// Applies every migration above the connection's current `schema_version`,
/// in order, inside one transaction per migration.
pub fn run_migrations(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);",
    )?;

    let current: u32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    for &(version, sql) in MIGRATIONS {
        if version <= current {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql).map_err(|e| StoreError::MigrationFailed(version, e.to_string()))?;
        tx.execute("DELETE FROM schema_version", [])?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        tx.commit()?;
        tracing::info!(version, "applied storage migration");
    }

    Ok(())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
