// SPDX-License-Identifier: MIT

//! Entry point for the `thrumd` binary (§4.11 C11 Lifecycle).
//!
//! No CLI surface in scope (see DESIGN.md) — the only argument accepted
//! is an optional repo root, defaulting to the current directory. Logs
//! to stderr and to `<repo>/.thrum/var/thrum.log`; shuts down cleanly on
//! `SIGINT`/`SIGTERM`.

use std::path::PathBuf;
use std::sync::Arc;

use thrum_core::SystemClock;
use thrum_daemon::config::Config;
use thrum_daemon::lifecycle::{shutdown, startup};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let repo_root = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("thrumd: could not determine current directory: {e}");
                return std::process::ExitCode::FAILURE;
            }
        },
    };

    let config = match Config::load(&repo_root) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("thrumd: failed to resolve configuration: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.ensure_dirs() {
        eprintln!("thrumd: failed to create .thrum/ directories: {e}");
        return std::process::ExitCode::FAILURE;
    }

    let _log_guard = init_tracing(&config.log_path);
    warn_if_stale_pid(&config.pid_path);

    info!(repo_root = %config.repo_root.display(), "starting thrumd");
    let running = match startup(config.clone(), SystemClock).await {
        Ok(running) => running,
        Err(e) => {
            error!(error = %e, "thrumd failed to start");
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::write(&config.pid_path, std::process::id().to_string()) {
        warn!(error = %e, "failed to write pid file");
    }
    info!(ws_port = running.ws_port, "thrumd is running");

    wait_for_shutdown_signal().await;

    shutdown(running);
    let _ = std::fs::remove_file(&config.pid_path);
    info!("thrumd stopped");
    std::process::ExitCode::SUCCESS
}

/// File logging at `log_path` plus stderr, both filtered by `RUST_LOG`
/// (default `info`) — mirrors the teacher's daemon logging split between
/// an operator-facing file and whatever's attached to the process.
fn init_tracing(log_path: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let directory = log_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("thrum.log"));
    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).init();
    guard
}

/// A pid file surviving from a crash (no clean `shutdown()`) is just a
/// diagnostic hint — the fs2 lock in `startup` is what actually prevents
/// two instances, so a stale pid here is logged, never acted on.
fn warn_if_stale_pid(pid_path: &std::path::Path) {
    let Ok(contents) = std::fs::read_to_string(pid_path) else {
        return;
    };
    let Ok(pid) = contents.trim().parse::<i32>() else {
        return;
    };
    let target = nix::unistd::Pid::from_raw(pid);
    match nix::sys::signal::kill(target, None) {
        Ok(()) => info!(pid, "pid file points at a still-running process; relying on the instance lock"),
        Err(_) => info!(pid, "pid file left over from a prior crash"),
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, waiting on SIGINT only");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => info!("received SIGINT"),
            _ = terminate.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received ctrl-c");
    }
}
