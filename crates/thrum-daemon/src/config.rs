// SPDX-License-Identifier: MIT

//! `.thrum/` layout resolution and the resolved daemon configuration
//! (§6.2, §6.3).
//!
//! Precedence is env > `config.json` > built-in default, resolved once at
//! startup into an immutable [`Config`] — mirrors the teacher's split
//! between free functions for env lookups (`env.rs`) and a struct holding
//! the fully-resolved paths/values (`lifecycle::Config`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::LifecycleError;

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 5;

/// On-disk `config.json` (§6.2). Every field has a default so a partial
/// or missing file still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonFileConfig {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u64,
    #[serde(default)]
    pub ws_port: u16,
    #[serde(default)]
    pub local_only: bool,
}

fn default_sync_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self { sync_interval: DEFAULT_SYNC_INTERVAL_SECS, ws_port: 0, local_only: false }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeSection {
    #[serde(default)]
    pub primary: Option<String>,
}

/// Fully-resolved configuration: every path the daemon touches, plus the
/// env > file > default-resolved values (§6.2/§6.3).
#[derive(Debug, Clone)]
pub struct Config {
    /// The primary git checkout's root — where GitSyncLoop runs `fetch`/
    /// `push` from, independent of `.thrum/redirect` (§4.9, §6.2).
    pub repo_root: PathBuf,
    /// `<repo>/.thrum/` (already redirect-resolved, §6.2).
    pub thrum_dir: PathBuf,
    pub var_dir: PathBuf,
    pub identities_dir: PathBuf,
    pub context_dir: PathBuf,
    pub config_path: PathBuf,

    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub pid_path: PathBuf,
    pub port_path: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub sync_worktree_path: PathBuf,

    pub sync_interval: Duration,
    pub ws_port: u16,
    pub local_only: bool,
    pub ui_dev: bool,
}

impl Config {
    /// Resolves `.thrum/` starting from `repo_root`, following one level
    /// of `.thrum/redirect` (§6.2: "Worktrees may contain a `.thrum/
    /// redirect` text file ... the daemon MUST follow one level of
    /// redirect on startup").
    pub fn load(repo_root: &Path) -> Result<Self, LifecycleError> {
        let mut thrum_dir = repo_root.join(".thrum");
        let redirect_path = thrum_dir.join("redirect");
        if redirect_path.exists() {
            let target = std::fs::read_to_string(&redirect_path)?;
            let target = target.trim();
            if !target.is_empty() {
                thrum_dir = PathBuf::from(target);
            }
        }

        let config_path = thrum_dir.join("config.json");
        let file_config = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            DaemonFileConfig::default()
        };

        let sync_interval = env::sync_interval_override()
            .unwrap_or_else(|| Duration::from_secs(file_config.daemon.sync_interval));
        let ws_port = env::ws_port_override().unwrap_or(file_config.daemon.ws_port);
        let local_only = env::local_only_override().unwrap_or(file_config.daemon.local_only);

        let var_dir = thrum_dir.join("var");
        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            identities_dir: thrum_dir.join("identities"),
            context_dir: thrum_dir.join("context"),
            config_path,
            socket_path: env::socket_path_override().unwrap_or_else(|| var_dir.join("thrum.sock")),
            lock_path: var_dir.join("thrum.lock"),
            pid_path: var_dir.join("thrum.pid"),
            port_path: var_dir.join("thrum.port"),
            db_path: var_dir.join("thrum.db"),
            log_path: var_dir.join("thrum.log"),
            sync_worktree_path: repo_root.join(".git").join("thrum-sync").join("a-sync"),
            var_dir,
            thrum_dir,
            sync_interval,
            ws_port,
            local_only,
            ui_dev: env::ui_dev(),
        })
    }

    /// `true` once `init` has run (§7 `NotInitialized`).
    pub fn is_initialized(&self) -> bool {
        self.thrum_dir.is_dir()
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.var_dir)?;
        std::fs::create_dir_all(&self.identities_dir)?;
        std::fs::create_dir_all(&self.context_dir)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
