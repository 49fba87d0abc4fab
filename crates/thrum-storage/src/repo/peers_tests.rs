use super::*;
use chrono::Utc;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn sample_peer() -> Peer {
    Peer {
        daemon_id: DaemonId::new(),
        name: "laptop-b".into(),
        address: "100.64.1.2:7777".into(),
        pair_token: "tok-abc".into(),
        paired_at: Utc::now(),
        last_sync_at: None,
        last_known_seq: 0,
    }
}

#[test]
fn upsert_then_find_round_trips() {
    let store = store();
    let peer = sample_peer();
    upsert(&store, &peer).unwrap();

    let found = find_by_id(&store, &peer.daemon_id).unwrap().unwrap();
    assert_eq!(found.name, "laptop-b");
    assert_eq!(found.last_known_seq, 0);
}

#[test]
fn update_sync_progress_advances_seq() {
    let store = store();
    let peer = sample_peer();
    upsert(&store, &peer).unwrap();

    update_sync_progress(&store, &peer.daemon_id, Utc::now(), 42).unwrap();

    let found = find_by_id(&store, &peer.daemon_id).unwrap().unwrap();
    assert_eq!(found.last_known_seq, 42);
    assert!(found.last_sync_at.is_some());
}

#[test]
fn remove_deletes_the_peer() {
    let store = store();
    let peer = sample_peer();
    upsert(&store, &peer).unwrap();
    remove(&store, &peer.daemon_id).unwrap();
    assert!(find_by_id(&store, &peer.daemon_id).unwrap().is_none());
}

#[test]
fn issuing_a_new_pairing_code_replaces_the_old_one() {
    let store = store();
    issue_pairing_code(&store, &PairingCode::generate(Utc::now())).unwrap();
    let second = PairingCode::generate(Utc::now());
    issue_pairing_code(&store, &second).unwrap();

    let current = current_pairing_code(&store).unwrap().unwrap();
    assert_eq!(current.code, second.code);
}

#[test]
fn clear_pairing_code_removes_it() {
    let store = store();
    issue_pairing_code(&store, &PairingCode::generate(Utc::now())).unwrap();
    clear_pairing_code(&store).unwrap();
    assert!(current_pairing_code(&store).unwrap().is_none());
}
