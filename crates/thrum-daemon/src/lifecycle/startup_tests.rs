use thrum_core::{FakeClock, Session};
use thrum_storage::Store;

use super::*;
use crate::config::Config as DaemonConfig;

fn repo_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[tokio::test]
async fn startup_installs_identity_and_the_everyone_group() {
    let dir = repo_dir();
    let config = Arc::new(DaemonConfig::load(dir.path()).expect("config"));
    let running = startup(config, FakeClock::new()).await.expect("startup succeeds");

    assert!(thrum_storage::repo::groups::find_by_name(&running.daemon.store, thrum_core::EVERYONE_GROUP_NAME)
        .expect("query group")
        .is_some());
    assert!(running.daemon.config.port_path.exists());
}

#[tokio::test]
async fn a_second_startup_against_the_same_repo_fails_to_acquire_the_lock() {
    let dir = repo_dir();
    let config = Arc::new(DaemonConfig::load(dir.path()).expect("config"));
    let _first = startup(config.clone(), FakeClock::new()).await.expect("first startup succeeds");

    let second = startup(config, FakeClock::new()).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
}

#[tokio::test]
async fn sessions_left_active_by_a_prior_run_are_marked_crashed() {
    let dir = repo_dir();
    let config = Arc::new(DaemonConfig::load(dir.path()).expect("config"));
    config.ensure_dirs().expect("ensure dirs");

    let agent_id = thrum_core::AgentId::new();
    let leftover_session = Session::new(agent_id, chrono::Utc::now());
    let session_id = leftover_session.session_id;
    {
        let store = Store::open(&config.db_path).expect("open store for seeding");
        thrum_storage::repo::sessions::insert(&store, &leftover_session).expect("seed session");
    }

    let running = startup(config, FakeClock::new()).await.expect("startup succeeds");

    let recovered = thrum_storage::repo::sessions::find_by_id(&running.daemon.store, &session_id)
        .expect("query session")
        .expect("session still present");
    assert!(!recovered.is_active());
    assert_eq!(recovered.end_reason, Some(thrum_core::EndReason::Crash));
}
