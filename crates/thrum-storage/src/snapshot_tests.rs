use super::*;
use thrum_core::EventPayload;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn compacting_an_empty_range_returns_none() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();
    let daemon_id = DaemonId::new();

    let result = compact(&store, dir.path(), &daemon_id, 100).unwrap();
    assert!(result.is_none());
    assert!(load_meta(dir.path(), &daemon_id).unwrap().is_none());
}

#[test]
fn compact_archives_and_prunes_then_meta_is_readable() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();
    let daemon_id = DaemonId::new();

    for _ in 0..3 {
        crate::event_log::append(&store, &daemon_id, &EventPayload::GroupDeleted { group_id: thrum_core::GroupId::new() }, Utc::now()).unwrap();
    }

    let meta = compact(&store, dir.path(), &daemon_id, 2).unwrap().unwrap();
    assert_eq!(meta.compacted_through, 2);
    assert_eq!(meta.version, CURRENT_SNAPSHOT_VERSION);

    // Sequence 1 and 2 are pruned from the live table, 3 remains.
    let remaining = crate::event_log::entries_after(&store, &daemon_id, 0).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].sequence, 3);

    let reloaded = load_meta(dir.path(), &daemon_id).unwrap().unwrap();
    assert_eq!(reloaded.compacted_through, 2);
}

#[test]
fn archived_events_round_trip_through_the_snapshot_file() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();
    let daemon_id = DaemonId::new();

    crate::event_log::append(&store, &daemon_id, &EventPayload::GroupDeleted { group_id: thrum_core::GroupId::new() }, Utc::now()).unwrap();
    compact(&store, dir.path(), &daemon_id, 1).unwrap();

    let archived = load_archived_events(dir.path(), &daemon_id).unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].sequence, 1);
}

#[test]
fn missing_snapshot_file_yields_empty_archive_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let daemon_id = DaemonId::new();
    assert!(load_archived_events(dir.path(), &daemon_id).unwrap().is_empty());
}
