use thrum_core::AgentId;

use super::*;
use crate::test_support::test_daemon;

#[test]
fn save_and_show_context_round_trips() {
    let daemon = test_daemon();
    let agent_id = AgentId::new();

    assert_eq!(daemon.show_context(&agent_id).expect("show_context"), None);

    daemon.save_context(&agent_id, "working on the sync loop").expect("save_context");
    assert_eq!(daemon.show_context(&agent_id).expect("show_context"), Some("working on the sync loop".to_string()));
}

#[test]
fn clear_context_removes_the_saved_content() {
    let daemon = test_daemon();
    let agent_id = AgentId::new();

    daemon.save_context(&agent_id, "scratch notes").expect("save_context");
    daemon.clear_context(&agent_id).expect("clear_context");
    assert_eq!(daemon.show_context(&agent_id).expect("show_context"), None);
}

#[test]
fn context_and_preamble_are_independent_slots() {
    let daemon = test_daemon();
    let agent_id = AgentId::new();

    daemon.save_context(&agent_id, "context body").expect("save_context");
    daemon.save_preamble(&agent_id, "preamble body").expect("save_preamble");

    assert_eq!(daemon.show_context(&agent_id).expect("show_context"), Some("context body".to_string()));
    assert_eq!(daemon.show_preamble(&agent_id).expect("show_preamble"), Some("preamble body".to_string()));
}

#[test]
fn list_context_summaries_reports_which_slots_are_populated() {
    let daemon = test_daemon();
    let agent_id = AgentId::new();
    daemon.save_context(&agent_id, "context body").expect("save_context");

    let summaries = daemon.list_context_summaries().expect("list_context_summaries");
    let summary = summaries.iter().find(|s| s.agent_id == agent_id).expect("summary present");
    assert!(summary.has_context);
    assert!(!summary.has_preamble);
}

#[test]
fn saving_context_appends_a_context_updated_event() {
    let daemon = test_daemon();
    let agent_id = AgentId::new();
    daemon.save_context(&agent_id, "hello").expect("save_context");

    let events = thrum_storage::event_log::entries_after(&daemon.store, &daemon.daemon_id, 0).expect("events");
    assert_eq!(events.len(), 1);
}
