use super::*;
use rusqlite::Connection;

#[test]
fn fresh_database_lands_on_current_version() {
    let mut conn = Connection::open_in_memory().unwrap();
    run_migrations(&mut conn).unwrap();
    let version: u32 =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
}

#[test]
fn running_migrations_twice_is_a_no_op() {
    let mut conn = Connection::open_in_memory().unwrap();
    run_migrations(&mut conn).unwrap();
    run_migrations(&mut conn).unwrap();
    let count: u32 =
        conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0)).unwrap();
    assert_eq!(count, 1, "schema_version must never accumulate rows");
}

#[test]
fn core_tables_exist_after_migration() {
    let mut conn = Connection::open_in_memory().unwrap();
    run_migrations(&mut conn).unwrap();
    for table in ["agents", "sessions", "messages", "groups", "events", "peers"] {
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert!(exists, "expected table {table} to exist");
    }
}
