use super::*;
use chrono::Utc;
use thrum_core::GroupId;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn sample_payload() -> EventPayload {
    EventPayload::GroupCreated { group_id: GroupId::new(), name: "qa".into(), created_at: Utc::now() }
}

#[test]
fn append_assigns_sequential_sequence_numbers() {
    let store = store();
    let daemon_id = DaemonId::new();

    let e1 = append(&store, &daemon_id, &sample_payload(), Utc::now()).unwrap();
    let e2 = append(&store, &daemon_id, &sample_payload(), Utc::now()).unwrap();

    assert_eq!(e1.sequence, 1);
    assert_eq!(e2.sequence, 2);
}

#[test]
fn sequences_are_independent_per_daemon() {
    let store = store();
    let a = DaemonId::new();
    let b = DaemonId::new();

    append(&store, &a, &sample_payload(), Utc::now()).unwrap();
    let first_b = append(&store, &b, &sample_payload(), Utc::now()).unwrap();

    assert_eq!(first_b.sequence, 1);
}

#[test]
fn entries_after_returns_only_newer_events_in_order() {
    let store = store();
    let daemon_id = DaemonId::new();
    for _ in 0..3 {
        append(&store, &daemon_id, &sample_payload(), Utc::now()).unwrap();
    }

    let entries = entries_after(&store, &daemon_id, 1).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].sequence, 2);
    assert_eq!(entries[1].sequence, 3);
}

#[test]
fn append_foreign_preserves_the_given_sequence_and_ignores_duplicates() {
    let store = store();
    let daemon_id = DaemonId::new();
    let event = Event { daemon_id, sequence: 7, payload: sample_payload(), produced_at: Utc::now() };

    append_foreign(&store, &event).unwrap();
    append_foreign(&store, &event).unwrap(); // duplicate, ignored

    let entries = entries_after(&store, &daemon_id, 0).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].sequence, 7);
}

#[test]
fn latest_sequence_reflects_the_highest_appended() {
    let store = store();
    let daemon_id = DaemonId::new();
    assert_eq!(latest_sequence(&store, &daemon_id).unwrap(), 0);
    append(&store, &daemon_id, &sample_payload(), Utc::now()).unwrap();
    append(&store, &daemon_id, &sample_payload(), Utc::now()).unwrap();
    assert_eq!(latest_sequence(&store, &daemon_id).unwrap(), 2);
}
