// SPDX-License-Identifier: MIT

//! The `repo` table: a single row holding this installation's identity
//! (§3 "Repo" — `repo_id` stable across worktrees, `daemon_id` generated
//! once per daemon and persisted across restarts).

use thrum_core::Repo;

use super::util::{from_rfc3339, to_rfc3339};
use crate::error::StoreResult;
use crate::store::Store;

/// Returns the installed `Repo` row, if `init` has already run.
pub fn load(store: &Store) -> StoreResult<Option<Repo>> {
    let conn = store.lock();
    let mut stmt = conn.prepare("SELECT repo_id, daemon_id, installed_at FROM repo LIMIT 1")?;
    let mut rows = stmt.query([])?;
    let Some(row) = rows.next()? else { return Ok(None) };
    let installed_at: String = row.get("installed_at")?;
    Ok(Some(Repo {
        repo_id: thrum_core::RepoId::from_string(row.get::<_, String>("repo_id")?),
        daemon_id: thrum_core::DaemonId::from_string(row.get::<_, String>("daemon_id")?),
        installed_at: from_rfc3339(&installed_at)?,
    }))
}

/// Installs the `repo` row. Called exactly once, at `init` (§6.2
/// "`.thrum/` is created and the `repo` row installed").
pub fn install(store: &Store, repo: &Repo) -> StoreResult<()> {
    store.lock().execute(
        "INSERT INTO repo (repo_id, daemon_id, installed_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![repo.repo_id.as_str(), repo.daemon_id.as_str(), to_rfc3339(repo.installed_at)],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
