use thrum_core::{Agent, AgentKind, Group, GroupId, MemberType};
use thrum_storage::Store;

use super::*;

fn agent(store: &Store, name: &str, role: &str, now: chrono::DateTime<chrono::Utc>) -> Agent {
    let agent = Agent {
        agent_id: AgentId::new(),
        kind: AgentKind::Agent,
        role: role.to_string(),
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

fn group(store: &Store, name: &str, now: chrono::DateTime<chrono::Utc>) -> Group {
    let group = Group { group_id: GroupId::new(), name: name.to_string(), description: None, created_at: now };
    thrum_storage::repo::groups::insert(store, &group).expect("insert group");
    group
}

#[test]
fn resolve_by_name_excludes_author_unless_explicitly_named() {
    let store = Store::open_in_memory().expect("store");
    let now = chrono::Utc::now();
    let author = agent(&store, "scout", "reviewer", now);
    let other = agent(&store, "writer", "author", now);

    let audience = AddressResolver::resolve(&store, &author.agent_id, &[], &["writer".to_string()])
        .expect("resolve");
    assert_eq!(audience.agent_ids, vec![other.agent_id]);
    assert!(audience.warnings.is_empty());
    assert!(!audience.is_everyone);
}

#[test]
fn resolve_includes_author_when_explicitly_named() {
    let store = Store::open_in_memory().expect("store");
    let now = chrono::Utc::now();
    let author = agent(&store, "scout", "reviewer", now);

    let audience =
        AddressResolver::resolve(&store, &author.agent_id, &[], &["scout".to_string()]).expect("resolve");
    assert_eq!(audience.agent_ids, vec![author.agent_id]);
}

#[test]
fn resolve_by_role_matches_every_agent_with_that_role() {
    let store = Store::open_in_memory().expect("store");
    let now = chrono::Utc::now();
    let author = agent(&store, "scout", "reviewer", now);
    let a = agent(&store, "alice", "reviewer", now);
    let b = agent(&store, "bob", "reviewer", now);

    let mut audience =
        AddressResolver::resolve(&store, &author.agent_id, &["reviewer".to_string()], &[]).expect("resolve");
    audience.agent_ids.sort_by(|x, y| x.as_str().cmp(y.as_str()));
    let mut expected = vec![a.agent_id, b.agent_id];
    expected.sort_by(|x, y| x.as_str().cmp(y.as_str()));
    assert_eq!(audience.agent_ids, expected);
}

#[test]
fn resolve_unknown_token_produces_a_warning_without_failing() {
    let store = Store::open_in_memory().expect("store");
    let now = chrono::Utc::now();
    let author = agent(&store, "scout", "reviewer", now);

    let audience =
        AddressResolver::resolve(&store, &author.agent_id, &[], &["nobody".to_string()]).expect("resolve");
    assert!(audience.agent_ids.is_empty());
    assert_eq!(audience.warnings, vec!["unresolved: nobody".to_string()]);
}

#[test]
fn resolve_everyone_group_expands_to_every_member_and_sets_is_everyone() {
    let store = Store::open_in_memory().expect("store");
    let now = chrono::Utc::now();
    thrum_storage::repo::groups::ensure_everyone(&store, now).expect("ensure everyone");
    let author = agent(&store, "scout", "reviewer", now);
    let other = agent(&store, "writer", "author", now);

    let everyone = thrum_storage::repo::groups::find_by_name(&store, thrum_core::EVERYONE_GROUP_NAME)
        .expect("query")
        .expect("everyone exists");
    thrum_storage::repo::groups::add_member(&store, &everyone.group_id, MemberType::Agent, author.agent_id.as_str())
        .expect("add author");
    thrum_storage::repo::groups::add_member(&store, &everyone.group_id, MemberType::Agent, other.agent_id.as_str())
        .expect("add other");

    let audience = AddressResolver::resolve(&store, &author.agent_id, &[], &["@everyone".to_string()])
        .expect("resolve");
    assert!(audience.is_everyone);
    assert_eq!(audience.agent_ids, vec![other.agent_id]);
}

#[test]
fn resolve_nested_group_cycle_terminates_instead_of_looping() {
    let store = Store::open_in_memory().expect("store");
    let now = chrono::Utc::now();
    let author = agent(&store, "scout", "reviewer", now);
    let member = agent(&store, "writer", "author", now);

    let a = group(&store, "team-a", now);
    let b = group(&store, "team-b", now);
    thrum_storage::repo::groups::add_member(&store, &a.group_id, MemberType::Group, "team-b").expect("a->b");
    thrum_storage::repo::groups::add_member(&store, &b.group_id, MemberType::Group, "team-a").expect("b->a");
    thrum_storage::repo::groups::add_member(&store, &b.group_id, MemberType::Agent, member.agent_id.as_str())
        .expect("add member");

    let audience =
        AddressResolver::resolve(&store, &author.agent_id, &[], &["team-a".to_string()]).expect("resolve");
    assert_eq!(audience.agent_ids, vec![member.agent_id]);
}

#[test]
fn everyone_scope_is_the_scope_attached_to_broadcasts() {
    let scope = AddressResolver::everyone_scope();
    assert!(scope.is_group(thrum_core::EVERYONE_GROUP_NAME));
}
