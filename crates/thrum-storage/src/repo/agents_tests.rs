use super::*;
use chrono::Utc;
use thrum_core::test_support::AgentBuilder;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn upsert_then_find_by_id_round_trips() {
    let store = store();
    let agent = AgentBuilder::new().named("alice").role("impl").build();
    upsert(&store, &agent).unwrap();

    let found = find_by_id(&store, &agent.agent_id).unwrap().unwrap();
    assert_eq!(found.agent_id, agent.agent_id);
    assert_eq!(found.name.as_deref(), Some("alice"));
}

#[test]
fn upsert_same_agent_id_is_idempotent_and_updates_last_seen() {
    let store = store();
    let mut agent = AgentBuilder::new().named("bob").build();
    upsert(&store, &agent).unwrap();

    agent.last_seen_at = agent.last_seen_at + chrono::Duration::minutes(5);
    upsert(&store, &agent).unwrap();

    assert_eq!(list_all(&store).unwrap().len(), 1);
    let found = find_by_id(&store, &agent.agent_id).unwrap().unwrap();
    assert_eq!(found.last_seen_at, agent.last_seen_at);
}

#[test]
fn find_by_name_locates_a_registered_agent() {
    let store = store();
    let agent = AgentBuilder::new().named("carol").build();
    upsert(&store, &agent).unwrap();

    assert!(find_by_name(&store, "carol").unwrap().is_some());
    assert!(find_by_name(&store, "nobody").unwrap().is_none());
}

#[test]
fn list_by_role_filters_correctly() {
    let store = store();
    upsert(&store, &AgentBuilder::new().named("a1").role("reviewer").build()).unwrap();
    upsert(&store, &AgentBuilder::new().named("a2").role("impl").build()).unwrap();

    let reviewers = list_by_role(&store, "reviewer").unwrap();
    assert_eq!(reviewers.len(), 1);
    assert_eq!(reviewers[0].name.as_deref(), Some("a1"));
}

#[test]
fn list_stale_excludes_agents_with_active_sessions() {
    let store = store();
    let agent = AgentBuilder::new().named("stale-one").build();
    upsert(&store, &agent).unwrap();
    touch_last_seen(&store, &agent.agent_id, Utc::now() - chrono::Duration::days(30)).unwrap();

    let stale = list_stale(&store, Utc::now() - chrono::Duration::days(7)).unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].agent_id, agent.agent_id);
}

#[test]
fn delete_removes_the_agent() {
    let store = store();
    let agent = AgentBuilder::new().named("doomed").build();
    upsert(&store, &agent).unwrap();
    delete(&store, &agent.agent_id).unwrap();
    assert!(find_by_id(&store, &agent.agent_id).unwrap().is_none());
}
