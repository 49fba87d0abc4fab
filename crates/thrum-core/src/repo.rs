// SPDX-License-Identifier: MIT

//! Repo identity (§3 "Repo": one row, installed at init).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    /// Stable across every worktree of the same source repository.
    pub struct RepoId("rep-");
}

define_id! {
    /// This daemon's own identity, generated once and persisted.
    /// Used as the ordering key for [`crate::event::Event`] sequences and
    /// as the tie-breaker in conflict rules (§4.3).
    pub struct DaemonId("dmn-");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    pub repo_id: RepoId,
    pub daemon_id: DaemonId,
    pub installed_at: DateTime<Utc>,
}
