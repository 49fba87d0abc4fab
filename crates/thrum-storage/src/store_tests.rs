use super::*;

#[test]
fn open_in_memory_applies_migrations() {
    let store = Store::open_in_memory().unwrap();
    let conn = store.lock();
    let version: u32 =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).unwrap();
    assert_eq!(version, schema::CURRENT_SCHEMA_VERSION);
}

#[test]
fn open_on_disk_round_trips_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thrum.sqlite3");
    {
        let store = Store::open(&path).unwrap();
        store
            .lock()
            .execute(
                "INSERT INTO repo (repo_id, daemon_id, installed_at) VALUES (?1, ?2, ?3)",
                rusqlite::params!["rep-1", "dmn-1", "2026-01-01T00:00:00Z"],
            )
            .unwrap();
    }
    let store = Store::open(&path).unwrap();
    let daemon_id: String = store
        .lock()
        .query_row("SELECT daemon_id FROM repo WHERE repo_id = ?1", ["rep-1"], |row| row.get(0))
        .unwrap();
    assert_eq!(daemon_id, "dmn-1");
}
