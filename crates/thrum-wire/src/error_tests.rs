use super::*;

#[test]
fn codes_are_stable_and_distinct() {
    let variants = [
        ThrumError::NotInitialized,
        ThrumError::NotFound("x".into()),
        ThrumError::Conflict("x".into()),
        ThrumError::NotAuthorized("x".into()),
        ThrumError::Invalid("x".into()),
        ThrumError::NoActiveSession,
        ThrumError::PairingExpired,
        ThrumError::PairingInvalid,
        ThrumError::SyncUnavailable("x".into()),
        ThrumError::Internal("x".into()),
        ThrumError::Timeout,
    ];

    let codes: Vec<i64> = variants.iter().map(|e| e.code()).collect();
    let mut sorted = codes.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), codes.len(), "wire codes must be distinct");

    assert_eq!(ThrumError::NotInitialized.code(), -32001);
    assert_eq!(ThrumError::Timeout.code(), -32011);
}

#[test]
fn wire_error_object_mirrors_code_and_display_message() {
    let err = ThrumError::NotFound("agt-abc".into());
    let obj = WireErrorObject::from(&err);
    assert_eq!(obj.code, -32002);
    assert_eq!(obj.message, err.to_string());
}

#[test]
fn registration_conflict_mentions_force_flag() {
    let err = ThrumError::registration_conflict("alice");
    assert_eq!(err.code(), -32003);
    assert!(err.to_string().contains("force"));
    assert!(err.to_string().contains("alice"));
}

#[test]
fn parse_error_response_carries_invalid_code_with_no_id() {
    let resp = parse_error_response(None, "malformed json".into());
    assert!(resp.id.is_none());
    let error = resp.error.expect("parse failures must carry an error object");
    assert_eq!(error.code, ThrumError::Invalid(String::new()).code());
    assert!(error.message.contains("malformed json"));
}
