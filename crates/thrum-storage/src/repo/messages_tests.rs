use super::*;
use thrum_core::test_support::{message_builder, AgentBuilder};

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn seed_agent(store: &Store, name: &str) -> AgentId {
    let agent = AgentBuilder::new().named(name).build();
    super::super::agents::upsert(store, &agent).unwrap();
    agent.agent_id
}

#[test]
fn insert_then_find_round_trips_including_audience() {
    let store = store();
    let author = seed_agent(&store, "author");
    let reader = seed_agent(&store, "reader");
    let mut msg = message_builder(author.clone(), "hello team");
    msg.audience = vec![author.clone(), reader.clone()];
    insert(&store, &msg).unwrap();

    let found = find_by_id(&store, &msg.message_id).unwrap().unwrap();
    assert_eq!(found.body.content, "hello team");
    assert_eq!(found.audience.len(), 2);
    assert!(found.audience.contains(&reader));
}

#[test]
fn edit_content_sets_updated_at() {
    let store = store();
    let author = seed_agent(&store, "editor");
    let msg = message_builder(author, "v1");
    insert(&store, &msg).unwrap();

    let daemon = thrum_core::DaemonId::new();
    let applied = edit_content(&store, &msg.message_id, "v2", chrono::Utc::now(), &daemon).unwrap();
    assert!(applied);

    let found = find_by_id(&store, &msg.message_id).unwrap().unwrap();
    assert_eq!(found.body.content, "v2");
    assert!(found.updated_at.is_some());
    assert_eq!(found.updated_by_daemon_id, Some(daemon));
}

#[test]
fn edit_content_drops_the_losing_concurrent_edit() {
    // Two daemons race to edit the same message; the earlier-timestamped
    // edit must not clobber the later one regardless of apply order (§4.3).
    let store = store();
    let author = seed_agent(&store, "editor");
    let msg = message_builder(author, "v1");
    insert(&store, &msg).unwrap();

    let earlier = chrono::Utc::now();
    let later = earlier + chrono::Duration::seconds(5);
    let winner_daemon = thrum_core::DaemonId::new();
    let loser_daemon = thrum_core::DaemonId::new();

    assert!(edit_content(&store, &msg.message_id, "from-winner", later, &winner_daemon).unwrap());
    assert!(!edit_content(&store, &msg.message_id, "from-loser", earlier, &loser_daemon).unwrap());

    let found = find_by_id(&store, &msg.message_id).unwrap().unwrap();
    assert_eq!(found.body.content, "from-winner");
    assert_eq!(found.updated_by_daemon_id, Some(winner_daemon));
}

#[test]
fn soft_delete_tombstones_content() {
    let store = store();
    let author = seed_agent(&store, "deleter");
    let msg = message_builder(author, "secret");
    insert(&store, &msg).unwrap();

    soft_delete(&store, &msg.message_id, chrono::Utc::now()).unwrap();

    let found = find_by_id(&store, &msg.message_id).unwrap().unwrap();
    assert!(found.is_deleted());
    assert_eq!(found.visible_content(), thrum_core::DELETED_PLACEHOLDER);
}

#[test]
fn mark_read_is_idempotent() {
    let store = store();
    let author = seed_agent(&store, "sender");
    let reader = seed_agent(&store, "reader2");
    let msg = message_builder(author, "read me");
    insert(&store, &msg).unwrap();

    assert!(mark_read(&store, &msg.message_id, &reader, chrono::Utc::now()).unwrap());
    assert!(!mark_read(&store, &msg.message_id, &reader, chrono::Utc::now()).unwrap());
    assert!(is_read(&store, &msg.message_id, &reader).unwrap());
}

#[test]
fn list_filters_deleted_messages_by_default() {
    let store = store();
    let author = seed_agent(&store, "lister");
    let visible = message_builder(author.clone(), "visible");
    let deleted = message_builder(author, "gone");
    insert(&store, &visible).unwrap();
    insert(&store, &deleted).unwrap();
    soft_delete(&store, &deleted.message_id, chrono::Utc::now()).unwrap();

    let page = list(&store, &MessageFilter::default(), 1, 50, SortOrder::Desc).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.messages[0].message_id, visible.message_id);
}

#[test]
fn list_paginates_and_clamps_page_size() {
    let store = store();
    let author = seed_agent(&store, "paginator");
    for i in 0..5 {
        let msg = message_builder(author.clone(), &format!("msg-{i}"));
        insert(&store, &msg).unwrap();
    }

    let page = list(&store, &MessageFilter::default(), 1, 2, SortOrder::Desc).unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.messages.len(), 2);

    let clamped = list(&store, &MessageFilter::default(), 1, 10_000, SortOrder::Desc).unwrap();
    assert_eq!(clamped.messages.len(), 5);
}

#[test]
fn list_unread_for_agent_excludes_read_messages() {
    let store = store();
    let author = seed_agent(&store, "unread-sender");
    let reader = seed_agent(&store, "unread-reader");
    let first = message_builder(author.clone(), "first");
    let second = message_builder(author, "second");
    insert(&store, &first).unwrap();
    insert(&store, &second).unwrap();
    mark_read(&store, &first.message_id, &reader, chrono::Utc::now()).unwrap();

    let filter = MessageFilter { unread_for_agent: Some(reader), ..Default::default() };
    let page = list(&store, &filter, 1, 50, SortOrder::Desc).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.messages[0].message_id, second.message_id);
}
