// SPDX-License-Identifier: MIT

//! The central [`Daemon`] value: every engine (`address`, `messages`,
//! `sessions`, `context`) is an `impl` block on this struct rather than a
//! free-standing handler reaching into global state, so every dependency
//! a method needs is visible in its signature.

use std::sync::Arc;

use thrum_core::{Clock, DaemonId, RepoId};
use thrum_storage::Store;

use crate::config::Config;
use crate::notify::bus::NotificationBus;

/// Shared daemon state, generic over [`Clock`] so tests can swap in a
/// `FakeClock` without touching call sites.
pub struct Daemon<C: Clock> {
    pub store: Arc<Store>,
    pub daemon_id: DaemonId,
    pub repo_id: RepoId,
    pub clock: C,
    pub config: Arc<Config>,
    pub notify: Arc<NotificationBus>,
}

impl<C: Clock> Daemon<C> {
    pub fn new(
        store: Arc<Store>,
        daemon_id: DaemonId,
        repo_id: RepoId,
        clock: C,
        config: Arc<Config>,
        notify: Arc<NotificationBus>,
    ) -> Self {
        Self { store, daemon_id, repo_id, clock, config, notify }
    }
}
