use super::*;
use chrono::Utc;
use thrum_core::AgentId;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn save_then_show_context_round_trips() {
    let store = store();
    let agent_id = AgentId::new();
    save_context(&store, &agent_id, "remember this", Utc::now()).unwrap();
    assert_eq!(show_context(&store, &agent_id).unwrap().as_deref(), Some("remember this"));
}

#[test]
fn clear_context_leaves_preamble_untouched() {
    let store = store();
    let agent_id = AgentId::new();
    save_context(&store, &agent_id, "ctx", Utc::now()).unwrap();
    save_preamble(&store, &agent_id, "pre", Utc::now()).unwrap();

    clear_context(&store, &agent_id).unwrap();

    assert!(show_context(&store, &agent_id).unwrap().is_none());
    assert_eq!(show_preamble(&store, &agent_id).unwrap().as_deref(), Some("pre"));
}

#[test]
fn list_summaries_reports_presence_flags() {
    let store = store();
    let agent_id = AgentId::new();
    save_context(&store, &agent_id, "ctx", Utc::now()).unwrap();

    let summaries = list_summaries(&store).unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].has_context);
    assert!(!summaries[0].has_preamble);
}
