use std::process::Command;
use std::sync::Arc;

use thrum_core::{DaemonId, FakeClock, RepoId};
use thrum_storage::Store;

use super::*;
use crate::config::Config;
use crate::notify::bus::NotificationBus;

fn init_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let run = |args: &[&str]| {
        let status = Command::new("git").current_dir(dir.path()).args(args).status().expect("run git");
        assert!(status.success(), "git {args:?} failed");
    };
    run(&["init", "--initial-branch=main"]);
    run(&["config", "user.email", "test@example.com"]);
    run(&["config", "user.name", "Test"]);
    std::fs::write(dir.path().join("README.md"), "hello\n").expect("write readme");
    run(&["add", "-A"]);
    run(&["commit", "-m", "initial"]);
    dir
}

fn local_only_config(repo_root: &std::path::Path) -> Config {
    let thrum_dir = repo_root.join(".thrum");
    let var_dir = thrum_dir.join("var");
    Config {
        repo_root: repo_root.to_path_buf(),
        thrum_dir: thrum_dir.clone(),
        var_dir: var_dir.clone(),
        identities_dir: thrum_dir.join("identities"),
        context_dir: thrum_dir.join("context"),
        config_path: thrum_dir.join("config.json"),
        socket_path: var_dir.join("thrum.sock"),
        lock_path: var_dir.join("thrum.lock"),
        pid_path: var_dir.join("thrum.pid"),
        port_path: var_dir.join("thrum.port"),
        db_path: var_dir.join("thrum.db"),
        log_path: var_dir.join("thrum.log"),
        sync_worktree_path: repo_root.join(".git").join("thrum-sync").join("a-sync"),
        sync_interval: Duration::from_secs(3600),
        ws_port: 0,
        local_only: true,
        ui_dev: false,
    }
}

async fn wait_for<F: Fn() -> bool>(predicate: F) {
    for _ in 0..100 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn force_runs_one_cycle_and_creates_the_sync_worktree() {
    let repo_dir = init_repo();
    let config = Arc::new(local_only_config(repo_dir.path()));
    config.ensure_dirs().expect("ensure_dirs");

    let daemon = Arc::new(Daemon::new(
        Arc::new(Store::open_in_memory().expect("store")),
        DaemonId::new(),
        RepoId::new(),
        FakeClock::new(),
        config.clone(),
        Arc::new(NotificationBus::new()),
    ));

    let handle = GitSyncLoop::spawn(daemon.clone());
    assert!(handle.force().await);

    wait_for(|| config.sync_worktree_path.is_dir()).await;
    wait_for(|| handle.status().last_sync_at.is_some()).await;

    let status = handle.status();
    assert!(status.local_only);
    assert!(status.last_error.is_none());

    handle.shutdown();
}

#[tokio::test]
async fn a_cycle_exports_local_events_to_the_producing_daemons_file() {
    let repo_dir = init_repo();
    let config = Arc::new(local_only_config(repo_dir.path()));
    config.ensure_dirs().expect("ensure_dirs");

    let daemon = Arc::new(Daemon::new(
        Arc::new(Store::open_in_memory().expect("store")),
        DaemonId::new(),
        RepoId::new(),
        FakeClock::new(),
        config.clone(),
        Arc::new(NotificationBus::new()),
    ));

    let now = daemon.clock.utc_now();
    thrum_storage::event_log::append(
        &daemon.store,
        &daemon.daemon_id,
        &thrum_core::EventPayload::GroupCreated { group_id: thrum_core::GroupId::new(), name: "reviewers".to_string(), created_at: now },
        now,
    )
    .expect("append event");

    let handle = GitSyncLoop::spawn(daemon.clone());
    assert!(handle.force().await);

    let events_file = config.sync_worktree_path.join("events").join(format!("{}.jsonl", daemon.daemon_id));
    wait_for(|| events_file.exists()).await;

    let contents = std::fs::read_to_string(&events_file).expect("read events file");
    assert_eq!(contents.lines().count(), 1);

    handle.shutdown();
}
