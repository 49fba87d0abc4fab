// SPDX-License-Identifier: MIT

//! C11 Lifecycle (§4.11): acquire the exclusive instance lock, bring up
//! storage and the two RPC listeners, recover from a prior crash, and
//! tear the same things back down in reverse order on shutdown.
//!
//! Grounded on the teacher's `lifecycle/{mod,startup}.rs`: lock acquired
//! with `OpenOptions` before truncation (so a second instance never wipes
//! the running daemon's PID), sockets bound last, cleanup run on any
//! startup failure except a lock conflict (those files belong to the
//! daemon that is already running).

pub mod shutdown;
pub mod startup;

pub use shutdown::shutdown;
pub use startup::startup;

use std::fs::File;
use std::sync::Arc;

use thrum_core::Clock;
use tokio_util::sync::CancellationToken;

use crate::daemon::Daemon;
use crate::sync::{GitSyncHandle, PeerSyncHandle};

/// Everything [`startup`] brought up, held until [`shutdown`] tears it
/// back down. `daemon` and `ws_port` are the only fields a caller needs
/// day to day; the rest exist purely to be released in order.
pub struct Running<C: Clock> {
    pub daemon: Arc<Daemon<C>>,
    pub ws_port: u16,
    pub(super) lock_file: File,
    pub(super) git_sync: Arc<GitSyncHandle>,
    pub(super) peer_sync: Arc<PeerSyncHandle>,
    pub(super) rpc_cancel: CancellationToken,
}
