// SPDX-License-Identifier: MIT

//! C9 GitSyncLoop and C10 PeerSync (§4.9, §4.10): the two independent
//! replication paths. Neither blocks the RPC path — each runs on its own
//! task and records failures onto a shared status struct instead of
//! propagating them.

pub mod git;
pub mod peer;

pub use git::{GitSyncHandle, GitSyncLoop, SyncStatus};
pub use peer::{PeerSyncHandle, PeerSyncLoop};
