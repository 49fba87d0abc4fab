use thrum_wire::ThrumError;

use super::*;

#[test]
fn not_initialized_maps_to_the_hinted_wire_error() {
    let err = DaemonError::NotInitialized;
    let wire: ThrumError = (&err).into();
    assert!(matches!(wire, ThrumError::NotInitialized));
}

#[test]
fn invalid_carries_its_message_through() {
    let err = DaemonError::Invalid("bad params".into());
    let wire: ThrumError = (&err).into();
    match wire {
        ThrumError::Invalid(msg) => assert_eq!(msg, "bad params"),
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn message_not_found_maps_to_not_found() {
    let err = DaemonError::Message(MessageError::NotFound("msg-1".into()));
    let wire: ThrumError = (&err).into();
    match wire {
        ThrumError::NotFound(msg) => assert_eq!(msg, "msg-1"),
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn message_not_authorized_maps_to_not_authorized() {
    let err = DaemonError::Message(MessageError::NotAuthorized("not the author".into()));
    let wire: ThrumError = (&err).into();
    assert!(matches!(wire, ThrumError::NotAuthorized(_)));
}

#[test]
fn session_no_active_session_maps_through() {
    let err = DaemonError::Session(SessionError::NoActiveSession);
    let wire: ThrumError = (&err).into();
    assert!(matches!(wire, ThrumError::NoActiveSession));
}

#[test]
fn session_conflict_maps_to_conflict() {
    let err = DaemonError::Session(SessionError::Conflict("already ended".into()));
    let wire: ThrumError = (&err).into();
    match wire {
        ThrumError::Conflict(msg) => assert_eq!(msg, "already ended"),
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn peer_pairing_expired_maps_through() {
    let err = DaemonError::Peer(PeerError::PairingExpired);
    let wire: ThrumError = (&err).into();
    assert!(matches!(wire, ThrumError::PairingExpired));
}

#[test]
fn peer_pairing_invalid_maps_through() {
    let err = DaemonError::Peer(PeerError::PairingInvalid);
    let wire: ThrumError = (&err).into();
    assert!(matches!(wire, ThrumError::PairingInvalid));
}

#[test]
fn peer_timeout_maps_through() {
    let err = DaemonError::Peer(PeerError::Timeout);
    let wire: ThrumError = (&err).into();
    assert!(matches!(wire, ThrumError::Timeout));
}

#[test]
fn peer_sync_unavailable_carries_its_message() {
    let err = DaemonError::Peer(PeerError::SyncUnavailable("no route to peer".into()));
    let wire: ThrumError = (&err).into();
    match wire {
        ThrumError::SyncUnavailable(msg) => assert_eq!(msg, "no route to peer"),
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn lifecycle_not_initialized_variants_map_to_not_initialized() {
    let not_initialized: ThrumError = (&DaemonError::Lifecycle(LifecycleError::NotInitialized)).into();
    assert!(matches!(not_initialized, ThrumError::NotInitialized));

    let no_thrum_dir: ThrumError = (&DaemonError::Lifecycle(LifecycleError::NoThrumDir)).into();
    assert!(matches!(no_thrum_dir, ThrumError::NotInitialized));
}

#[test]
fn other_lifecycle_errors_map_to_internal() {
    let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
    let err = DaemonError::Lifecycle(LifecycleError::LockFailed(io_err));
    let wire: ThrumError = (&err).into();
    assert!(matches!(wire, ThrumError::Internal(_)));
}

#[test]
fn store_errors_map_to_internal() {
    let err = DaemonError::Store(thrum_storage::StoreError::NotFound("row".into()));
    let wire: ThrumError = (&err).into();
    assert!(matches!(wire, ThrumError::Internal(_)));
}

#[test]
fn owned_conversion_matches_reference_conversion() {
    let err = DaemonError::Session(SessionError::NoActiveSession);
    let wire: ThrumError = err.into();
    assert!(matches!(wire, ThrumError::NoActiveSession));
}
