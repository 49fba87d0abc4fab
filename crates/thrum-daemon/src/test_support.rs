// SPDX-License-Identifier: MIT

//! Shared fixtures for this crate's unit tests.

use std::sync::Arc;

use thrum_core::{Clock, DaemonId, FakeClock, RepoId};
use thrum_storage::Store;

use crate::config::Config;
use crate::daemon::Daemon;
use crate::notify::bus::NotificationBus;

/// An in-memory [`Daemon`] wired to a [`FakeClock`]. `config` resolves
/// against a throwaway temp directory — fine for tests exercising domain
/// logic, which never touch the filesystem paths directly.
pub fn test_daemon() -> Daemon<FakeClock> {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load(dir.path()).expect("config resolves even with nothing on disk yet");
    Daemon::new(
        Arc::new(Store::open_in_memory().expect("in-memory store")),
        DaemonId::new(),
        RepoId::new(),
        FakeClock::new(),
        Arc::new(config),
        Arc::new(NotificationBus::new()),
    )
}

#[allow(dead_code)]
pub fn clock(daemon: &Daemon<FakeClock>) -> chrono::DateTime<chrono::Utc> {
    daemon.clock.utc_now()
}
