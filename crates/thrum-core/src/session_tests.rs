// SPDX-License-Identifier: MIT

use super::*;
use crate::agent::AgentId;

#[test]
fn new_session_is_active() {
    let session = Session::new(AgentId::new(), Utc::now());
    assert!(session.is_active());
    assert!(session.ended_at.is_none());
}

#[test]
fn end_clears_active_state() {
    let mut session = Session::new(AgentId::new(), Utc::now());
    session.end(Utc::now(), EndReason::Superseded);
    assert!(!session.is_active());
    assert_eq!(session.end_reason, Some(EndReason::Superseded));
}
