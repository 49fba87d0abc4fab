use thrum_core::{AgentKind, EndReason};
use thrum_wire::methods::RegisterStatus;

use super::*;
use crate::test_support::test_daemon;

fn register_req(name: &str, role: &str) -> RegisterRequest {
    RegisterRequest {
        name: Some(name.to_string()),
        role: role.to_string(),
        module: "crates/thrum-daemon".to_string(),
        kind: AgentKind::Agent,
        display: None,
        worktree_label: None,
        re_register: false,
        force: false,
    }
}

#[test]
fn register_agent_is_idempotent_for_the_same_identity() {
    let daemon = test_daemon();
    let (id1, status1) = daemon.register_agent(register_req("scout", "reviewer")).expect("register");
    assert_eq!(status1, RegisterStatus::Registered);

    let (id2, status2) = daemon.register_agent(register_req("scout", "reviewer")).expect("re-register");
    assert_eq!(id1, id2);
    assert_eq!(status2, RegisterStatus::Updated);
}

#[test]
fn register_agent_with_a_colliding_name_is_a_conflict_without_force() {
    let daemon = test_daemon();
    daemon.register_agent(register_req("scout", "reviewer")).expect("register");

    let mut req = register_req("scout", "author");
    req.force = false;
    let (_, status) = daemon.register_agent(req).expect("register");
    assert_eq!(status, RegisterStatus::Conflict);
}

#[test]
fn register_agent_with_force_overrides_a_name_collision() {
    let daemon = test_daemon();
    daemon.register_agent(register_req("scout", "reviewer")).expect("register");

    let mut req = register_req("scout", "author");
    req.force = true;
    let (_, status) = daemon.register_agent(req).expect("register");
    assert!(matches!(status, RegisterStatus::Registered | RegisterStatus::Updated));
}

#[test]
fn whoami_and_team_list_reflect_presence() {
    let daemon = test_daemon();
    let (agent_id, _) = daemon.register_agent(register_req("scout", "reviewer")).expect("register");

    let found = daemon.whoami(&agent_id).expect("whoami").expect("agent exists");
    assert_eq!(found.agent_id, agent_id);

    let team = daemon.team_list().expect("team_list");
    let (_, active) = team.iter().find(|(a, _)| a.agent_id == agent_id).expect("agent in team list");
    assert!(active);
}

#[test]
fn cleanup_agents_reports_candidates_and_only_deletes_when_forced() {
    let daemon = test_daemon();
    let (agent_id, _) = daemon.register_agent(register_req("scout", "reviewer")).expect("register");
    daemon.clock.set_utc(daemon.clock.utc_now() + chrono::Duration::days(60));

    let (candidates, deleted) = daemon.cleanup_agents(false, 30).expect("cleanup_agents dry run");
    assert_eq!(candidates, vec![agent_id]);
    assert!(deleted.is_empty());
    assert!(daemon.whoami(&agent_id).expect("whoami").is_some());

    let (candidates, deleted) = daemon.cleanup_agents(true, 30).expect("cleanup_agents forced");
    assert_eq!(candidates, vec![agent_id]);
    assert_eq!(deleted, vec![agent_id]);
    assert!(daemon.whoami(&agent_id).expect("whoami").is_none());
}

#[test]
fn start_session_supersedes_a_prior_active_session() {
    let daemon = test_daemon();
    let (agent_id, _) = daemon.register_agent(register_req("scout", "reviewer")).expect("register");

    let (first_session, superseded) =
        daemon.start_session(agent_id, None, None, Vec::new(), Vec::new()).expect("start_session");
    assert!(superseded.is_none());

    let (second_session, superseded) =
        daemon.start_session(agent_id, None, None, Vec::new(), Vec::new()).expect("start_session again");
    assert_eq!(superseded, Some(first_session));

    let sessions = daemon.list_sessions(Some(&agent_id), false).expect("list_sessions");
    let prior = sessions.iter().find(|s| s.session_id == first_session).expect("prior session present");
    assert_eq!(prior.end_reason, Some(EndReason::Superseded));

    let active = daemon.list_sessions(Some(&agent_id), true).expect("list_sessions active");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].session_id, second_session);
}

#[test]
fn end_session_twice_is_a_conflict() {
    let daemon = test_daemon();
    let (agent_id, _) = daemon.register_agent(register_req("scout", "reviewer")).expect("register");
    let (session_id, _) = daemon.start_session(agent_id, None, None, Vec::new(), Vec::new()).expect("start_session");

    daemon.end_session(&session_id, EndReason::Normal).expect("end_session");
    let err = daemon.end_session(&session_id, EndReason::Normal).unwrap_err();
    assert!(matches!(err, DaemonError::Session(SessionError::Conflict(_))));
}

#[test]
fn set_intent_and_set_task_update_the_session() {
    let daemon = test_daemon();
    let (agent_id, _) = daemon.register_agent(register_req("scout", "reviewer")).expect("register");
    let (session_id, _) = daemon.start_session(agent_id, None, None, Vec::new(), Vec::new()).expect("start_session");

    daemon.set_intent(&session_id, "review PR #42").expect("set_intent");
    daemon.set_task(&session_id, "finish review").expect("set_task");

    let sessions = daemon.list_sessions(Some(&agent_id), false).expect("list_sessions");
    let session = sessions.into_iter().find(|s| s.session_id == session_id).expect("session present");
    assert_eq!(session.intent.as_deref(), Some("review PR #42"));
    assert_eq!(session.task.as_deref(), Some("finish review"));
}

#[tokio::test]
async fn heartbeat_on_an_ended_session_fails_with_no_active_session() {
    let daemon = test_daemon();
    let (agent_id, _) = daemon.register_agent(register_req("scout", "reviewer")).expect("register");
    let (session_id, _) = daemon.start_session(agent_id, None, None, Vec::new(), Vec::new()).expect("start_session");
    daemon.end_session(&session_id, EndReason::Normal).expect("end_session");

    let dir = tempfile::tempdir().expect("tempdir");
    let err = daemon
        .heartbeat(&session_id, Vec::new(), Vec::new(), Vec::new(), Vec::new(), dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, DaemonError::Session(SessionError::NoActiveSession)));
}

#[tokio::test]
async fn heartbeat_on_a_non_git_directory_returns_an_empty_best_effort_work_context() {
    let daemon = test_daemon();
    let (agent_id, _) = daemon.register_agent(register_req("scout", "reviewer")).expect("register");
    let (session_id, _) = daemon.start_session(agent_id, None, None, Vec::new(), Vec::new()).expect("start_session");

    let dir = tempfile::tempdir().expect("tempdir");
    let work_context = daemon
        .heartbeat(&session_id, Vec::new(), Vec::new(), Vec::new(), Vec::new(), dir.path())
        .await
        .expect("heartbeat");
    assert!(work_context.branch.is_none());
    assert!(work_context.uncommitted_files.is_empty());
}
