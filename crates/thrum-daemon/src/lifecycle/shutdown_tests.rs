use std::sync::Arc;

use thrum_core::FakeClock;

use super::*;
use crate::config::Config as DaemonConfig;
use crate::lifecycle::startup::startup;

#[tokio::test]
async fn shutdown_removes_socket_port_and_lock_files_and_releases_the_lock() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Arc::new(DaemonConfig::load(dir.path()).expect("config"));
    let running = startup(config.clone(), FakeClock::new()).await.expect("startup succeeds");

    assert!(config.port_path.exists());
    assert!(config.lock_path.exists());

    shutdown(running);

    assert!(!config.socket_path.exists());
    assert!(!config.port_path.exists());
    assert!(!config.lock_path.exists());

    // The lock is released, so a fresh startup against the same repo
    // must succeed rather than hitting `LockFailed`.
    let restarted = startup(config, FakeClock::new()).await;
    assert!(restarted.is_ok());
}
