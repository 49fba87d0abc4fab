// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! thrum-daemon: the per-repo daemon (`thrumd`) that owns the single
//! SQLite writer, the two replication loops (C9 GitSyncLoop, C10
//! PeerSync), the C7 NotificationBus, and the dual-transport C8 RPCServer.
//!
//! [`Daemon`] is the shared handle every module extends with an `impl`
//! block: `address`, `context`, `groups`, `messages`, `peers`, `sessions`,
//! `subscriptions`. `rpc` is the only thing that calls into them.

pub mod address;
pub mod config;
pub mod context;
pub mod daemon;
pub mod env;
pub mod error;
pub mod groups;
pub mod lifecycle;
pub mod messages;
pub mod notify;
pub mod peers;
pub mod rpc;
pub mod sessions;
pub mod subscriptions;
pub mod sync;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

pub use daemon::Daemon;
