use super::*;
use thrum_core::test_support::{session_for, AgentBuilder};

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn seed_agent(store: &Store) -> AgentId {
    let agent = AgentBuilder::new().named("sess-owner").build();
    super::super::agents::upsert(store, &agent).unwrap();
    agent.agent_id
}

#[test]
fn insert_then_find_by_id_round_trips() {
    let store = store();
    let agent_id = seed_agent(&store);
    let session = session_for(agent_id);
    insert(&store, &session).unwrap();

    let found = find_by_id(&store, &session.session_id).unwrap().unwrap();
    assert_eq!(found.session_id, session.session_id);
    assert!(found.is_active());
}

#[test]
fn find_active_for_agent_returns_none_after_end() {
    let store = store();
    let agent_id = seed_agent(&store);
    let session = session_for(agent_id);
    insert(&store, &session).unwrap();

    assert!(find_active_for_agent(&store, &agent_id).unwrap().is_some());

    end(&store, &session.session_id, chrono::Utc::now(), EndReason::Normal).unwrap();
    assert!(find_active_for_agent(&store, &agent_id).unwrap().is_none());

    let reloaded = find_by_id(&store, &session.session_id).unwrap().unwrap();
    assert_eq!(reloaded.end_reason, Some(EndReason::Normal));
}

#[test]
fn heartbeat_updates_scopes_and_work_context() {
    let store = store();
    let agent_id = seed_agent(&store);
    let session = session_for(agent_id);
    insert(&store, &session).unwrap();

    let mut scopes = std::collections::BTreeSet::new();
    scopes.insert(Scope::new("repo", "thrum"));
    let mut wc = WorkContext::default();
    wc.branch = Some("feature/x".to_string());

    heartbeat(&store, &session.session_id, chrono::Utc::now(), &scopes, &Default::default(), &wc).unwrap();

    let reloaded = find_by_id(&store, &session.session_id).unwrap().unwrap();
    assert_eq!(reloaded.scopes.len(), 1);
    assert_eq!(reloaded.work_context.branch.as_deref(), Some("feature/x"));
}

#[test]
fn set_intent_and_task_persist() {
    let store = store();
    let agent_id = seed_agent(&store);
    let session = session_for(agent_id);
    insert(&store, &session).unwrap();

    set_intent(&store, &session.session_id, "refactor auth").unwrap();
    set_task(&store, &session.session_id, "TASK-42").unwrap();

    let reloaded = find_by_id(&store, &session.session_id).unwrap().unwrap();
    assert_eq!(reloaded.intent.as_deref(), Some("refactor auth"));
    assert_eq!(reloaded.task.as_deref(), Some("TASK-42"));
}
