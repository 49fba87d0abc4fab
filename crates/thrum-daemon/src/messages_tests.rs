use thrum_core::{Agent, AgentKind, AgentId, Priority};
use thrum_storage::repo::messages::MessageFilter;
use thrum_storage::Store;

use super::*;
use crate::test_support::test_daemon;

fn agent(store: &Store, name: &str, now: chrono::DateTime<chrono::Utc>) -> Agent {
    let agent = Agent {
        agent_id: AgentId::new(),
        kind: AgentKind::Agent,
        role: "reviewer".to_string(),
        module: "crates/thrum-daemon".to_string(),
        display: name.to_string(),
        name: name.to_string(),
        registered_at: now,
        last_seen_at: now,
        worktree_label: None,
    };
    thrum_storage::repo::agents::upsert(store, &agent).expect("upsert agent");
    agent
}

fn basic_request(author: AgentId, content: &str) -> SendRequest<'_> {
    SendRequest {
        author,
        content,
        format: None,
        mentions: Vec::new(),
        to: Vec::new(),
        scopes: Vec::new(),
        refs: Vec::new(),
        reply_to: None,
        structured: None,
        priority: Priority::Normal,
        broadcast: false,
        acting_as: None,
        disclosed: false,
    }
}

#[test]
fn send_message_rejects_empty_content() {
    let daemon = test_daemon();
    let author = agent(&daemon.store, "scout", daemon.clock.utc_now());
    let err = daemon.send_message(basic_request(author.agent_id, "   ")).unwrap_err();
    assert!(matches!(err, DaemonError::Message(MessageError::Invalid(_))));
}

#[test]
fn send_message_resolves_recipients_and_records_an_event() {
    let daemon = test_daemon();
    let now = daemon.clock.utc_now();
    let author = agent(&daemon.store, "scout", now);
    let recipient = agent(&daemon.store, "writer", now);

    let mut req = basic_request(author.agent_id, "status update");
    req.to = vec!["writer".to_string()];
    let outcome = daemon.send_message(req).expect("send_message");

    assert_eq!(outcome.resolved_to, vec![recipient.agent_id]);
    assert_eq!(outcome.message.audience, vec![recipient.agent_id]);
    assert_eq!(outcome.message.thread_id, Some(outcome.message.message_id.clone()));

    let events = thrum_storage::event_log::entries_after(&daemon.store, &daemon.daemon_id, 0).expect("events");
    assert_eq!(events.len(), 1);
}

#[test]
fn broadcast_expands_to_every_agent_except_the_author() {
    let daemon = test_daemon();
    let now = daemon.clock.utc_now();
    let author = agent(&daemon.store, "scout", now);
    let other_a = agent(&daemon.store, "writer", now);
    let other_b = agent(&daemon.store, "reviewer", now);

    let mut req = basic_request(author.agent_id, "hello everyone");
    req.broadcast = true;
    let outcome = daemon.send_message(req).expect("send_message");

    let mut expected = vec![other_a.agent_id, other_b.agent_id];
    expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    let mut got = outcome.resolved_to.clone();
    got.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(got, expected);
    assert!(outcome.message.scopes.iter().any(|s| s.is_group(thrum_core::EVERYONE_GROUP_NAME)));
}

#[test]
fn reply_inherits_the_parents_thread_root() {
    let daemon = test_daemon();
    let now = daemon.clock.utc_now();
    let author = agent(&daemon.store, "scout", now);
    let root = daemon.send_message(basic_request(author.agent_id, "root message")).expect("send root");

    let mut reply_req = basic_request(author.agent_id, "a reply");
    reply_req.reply_to = Some(root.message.message_id.clone());
    let reply = daemon.send_message(reply_req).expect("send reply");

    assert_eq!(reply.message.thread_id, root.message.thread_id);
}

#[test]
fn edit_message_is_author_only_and_rejects_deleted_messages() {
    let daemon = test_daemon();
    let now = daemon.clock.utc_now();
    let author = agent(&daemon.store, "scout", now);
    let intruder = agent(&daemon.store, "writer", now);
    let sent = daemon.send_message(basic_request(author.agent_id, "original")).expect("send_message");

    let err = daemon.edit_message(&sent.message.message_id, &intruder.agent_id, "hijacked").unwrap_err();
    assert!(matches!(err, DaemonError::Message(MessageError::NotAuthorized(_))));

    daemon.edit_message(&sent.message.message_id, &author.agent_id, "edited").expect("edit_message");
    let edited = daemon.get_message(&sent.message.message_id).expect("get_message").expect("message exists");
    assert_eq!(edited.body.content, "edited");

    daemon.delete_message(&sent.message.message_id, &author.agent_id).expect("delete_message");
    let err = daemon.edit_message(&sent.message.message_id, &author.agent_id, "too late").unwrap_err();
    assert!(matches!(err, DaemonError::Message(MessageError::Invalid(_))));
}

#[test]
fn delete_message_is_author_only_and_tombstones_rather_than_removes() {
    let daemon = test_daemon();
    let now = daemon.clock.utc_now();
    let author = agent(&daemon.store, "scout", now);
    let intruder = agent(&daemon.store, "writer", now);
    let sent = daemon.send_message(basic_request(author.agent_id, "original")).expect("send_message");

    let err = daemon.delete_message(&sent.message.message_id, &intruder.agent_id).unwrap_err();
    assert!(matches!(err, DaemonError::Message(MessageError::NotAuthorized(_))));

    daemon.delete_message(&sent.message.message_id, &author.agent_id).expect("delete_message");
    let deleted = daemon.get_message(&sent.message.message_id).expect("get_message").expect("message still present");
    assert!(deleted.is_deleted());
    assert_eq!(deleted.visible_content(), thrum_core::DELETED_PLACEHOLDER);
}

#[test]
fn mark_read_is_idempotent_and_counts_only_newly_read_messages() {
    let daemon = test_daemon();
    let now = daemon.clock.utc_now();
    let author = agent(&daemon.store, "scout", now);
    let reader = agent(&daemon.store, "writer", now);
    let sent = daemon.send_message(basic_request(author.agent_id, "read me")).expect("send_message");

    let marked = daemon.mark_read(&[sent.message.message_id.clone()], &reader.agent_id).expect("mark_read");
    assert_eq!(marked, 1);

    let marked_again = daemon.mark_read(&[sent.message.message_id.clone()], &reader.agent_id).expect("mark_read again");
    assert_eq!(marked_again, 0);
}

#[test]
fn list_messages_filters_by_recipient() {
    let daemon = test_daemon();
    let now = daemon.clock.utc_now();
    let author = agent(&daemon.store, "scout", now);
    let recipient = agent(&daemon.store, "writer", now);
    let bystander = agent(&daemon.store, "reviewer", now);

    let mut req = basic_request(author.agent_id, "only for writer");
    req.to = vec!["writer".to_string()];
    daemon.send_message(req).expect("send_message");

    let mut filter = MessageFilter::default();
    filter.for_agent = Some(recipient.agent_id);
    let page = daemon.list_messages(&filter, 1, 50, SortOrder::Desc).expect("list_messages");
    assert_eq!(page.messages.len(), 1);

    let mut filter = MessageFilter::default();
    filter.for_agent = Some(bystander.agent_id);
    let page = daemon.list_messages(&filter, 1, 50, SortOrder::Desc).expect("list_messages");
    assert!(page.messages.is_empty());
}
