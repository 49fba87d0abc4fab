// SPDX-License-Identifier: MIT

//! Centralized environment variable access (§6.3).
//!
//! Mirrors the teacher's free-function-per-variable style
//! (`oj_daemon::env`) rather than collecting everything into one struct
//! up front — `Config::load` is the only place these are read together.

use std::path::PathBuf;
use std::time::Duration;

pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `THRUM_SOCKET` overrides the default `<thrum_dir>/var/thrum.sock`.
pub fn socket_path_override() -> Option<PathBuf> {
    std::env::var("THRUM_SOCKET").ok().map(PathBuf::from)
}

/// `THRUM_WS_PORT`: fixed WebSocket port, or `0`/unset for auto-select.
pub fn ws_port_override() -> Option<u16> {
    std::env::var("THRUM_WS_PORT").ok().and_then(|s| s.parse().ok())
}

/// `THRUM_SYNC_INTERVAL`: GitSyncLoop tick interval in seconds (default 5).
pub fn sync_interval_override() -> Option<Duration> {
    std::env::var("THRUM_SYNC_INTERVAL").ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_secs)
}

/// `THRUM_LOCAL`: force `local-only` mode regardless of config.json / remote.
pub fn local_only_override() -> Option<bool> {
    std::env::var("THRUM_LOCAL").ok().map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
}

pub fn name() -> Option<String> {
    std::env::var("THRUM_NAME").ok().filter(|s| !s.is_empty())
}

pub fn role() -> Option<String> {
    std::env::var("THRUM_ROLE").ok().filter(|s| !s.is_empty())
}

pub fn module() -> Option<String> {
    std::env::var("THRUM_MODULE").ok().filter(|s| !s.is_empty())
}

/// `THRUM_UI_DEV`: serve `/` from the filesystem instead of the embedded
/// asset bundle. Only the toggle is in scope here — the UI's own content
/// is a non-goal (§1).
pub fn ui_dev() -> bool {
    std::env::var("THRUM_UI_DEV").map(|s| s == "1" || s.eq_ignore_ascii_case("true")).unwrap_or(false)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
