// SPDX-License-Identifier: MIT

//! Unix domain socket half of C8 RPCServer (§4.8).
//!
//! Grounded on the teacher's `listener/mod.rs`: one `accept()` loop, one
//! spawned task per connection, a `CancellationToken` to stop accepting on
//! shutdown. Unlike the teacher (Unix + TCP raw byte streams sharing one
//! generic handler), this daemon's second transport is message-framed
//! WebSocket, so the two transports each get their own connection loop
//! while sharing the same [`Dispatcher`] and [`NotificationBus`].

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use thrum_core::Clock;
use thrum_wire::methods::{method_name, SubscribeParams};
use thrum_wire::{JsonRpcRequest, JsonRpcResponse};
use tokio::io::BufReader;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::daemon::Daemon;
use crate::error::LifecycleError;
use crate::rpc::dispatch::Dispatcher;

pub struct UnixServer;

impl UnixServer {
    /// Binds `socket_path`, removing a stale socket left by an unclean
    /// shutdown, and serves connections until `cancel` fires.
    pub async fn serve<C: Clock + Send + Sync + 'static>(
        socket_path: &Path,
        dispatcher: Arc<Dispatcher<C>>,
        daemon: Arc<Daemon<C>>,
        cancel: CancellationToken,
    ) -> Result<(), LifecycleError> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }
        let listener = UnixListener::bind(socket_path)
            .map_err(|e| LifecycleError::BindFailed(socket_path.to_path_buf(), e))?;
        info!(path = %socket_path.display(), "unix RPC listener bound");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let dispatcher = dispatcher.clone();
                            let daemon = daemon.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, dispatcher, daemon).await {
                                    debug!(error = %e, "unix connection ended");
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "failed to accept unix connection"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("unix RPC listener shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

async fn handle_connection<C: Clock + Send + Sync + 'static>(
    stream: UnixStream,
    dispatcher: Arc<Dispatcher<C>>,
    daemon: Arc<Daemon<C>>,
) -> std::io::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let writer = Arc::new(AsyncMutex::new(write_half));

    let caller_agent_id = Mutex::new(None);
    let client_session_id: Mutex<Option<String>> = Mutex::new(None);
    let push_task: Mutex<Option<tokio::task::JoinHandle<()>>> = Mutex::new(None);

    loop {
        let request: JsonRpcRequest = match thrum_wire::read_line(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "malformed request, closing unix connection");
                break;
            }
        };

        if let Some(hint) = super::caller_agent_id_hint(&request.params) {
            *caller_agent_id.lock() = Some(hint);
        }

        let method = request.method.clone();
        let params = request.params.clone();
        let response: JsonRpcResponse = dispatcher.dispatch(request).await;
        let ok = response.error.is_none();
        {
            let mut w = writer.lock().await;
            if thrum_wire::write_line(&mut *w, &response).await.is_err() {
                break;
            }
        }

        if ok && method == method_name::SUBSCRIBE {
            if let Ok(sub) = serde_json::from_value::<SubscribeParams>(params) {
                *client_session_id.lock() = Some(sub.client_session_id.clone());
                start_push_task_if_absent(&push_task, &daemon, &writer, sub.client_session_id, *caller_agent_id.lock());
            }
        }
    }

    if let Some(handle) = push_task.lock().take() {
        handle.abort();
    }
    if let Some(id) = client_session_id.lock().clone() {
        if let Err(e) = daemon.clear_client(&id) {
            warn!(error = %e, "failed to clear subscriptions on disconnect");
        }
    }
    Ok(())
}

/// Registers the live notification queue and starts pumping it to the
/// connection's writer, the first time this connection subscribes.
/// Idempotent — a second `subscribe` on the same connection is a no-op
/// here (the queue is already being drained).
fn start_push_task_if_absent<C: Clock + Send + Sync + 'static>(
    push_task: &Mutex<Option<tokio::task::JoinHandle<()>>>,
    daemon: &Arc<Daemon<C>>,
    writer: &Arc<AsyncMutex<OwnedWriteHalf>>,
    client_session_id: String,
    caller_agent_id: Option<thrum_core::AgentId>,
) {
    let mut guard = push_task.lock();
    if guard.is_some() {
        return;
    }
    daemon.notify.register(client_session_id.clone(), caller_agent_id);
    let daemon = daemon.clone();
    let writer = writer.clone();
    let handle = tokio::spawn(async move {
        loop {
            let Some(notification) = daemon.notify.recv(&client_session_id).await else { break };
            let mut w = writer.lock().await;
            if thrum_wire::write_line(&mut *w, &notification).await.is_err() {
                break;
            }
        }
    });
    *guard = Some(handle);
}

#[cfg(test)]
#[path = "unix_tests.rs"]
mod tests;
