// SPDX-License-Identifier: MIT

//! WebSocket half of C8 RPCServer (§4.8): `/ws` serves the same JSON-RPC
//! dispatch table as the Unix socket, plus server-initiated notifications;
//! every other path serves the embedded (or, in `THRUM_UI_DEV`, on-disk) UI
//! assets (§6.3).
//!
//! Unlike the Unix transport, WebSocket frames are message- not
//! byte-oriented, so this connection loop owns its sink directly instead
//! of sharing one behind a mutex: pushed notifications are funneled
//! through an internal channel into the same `select!` that reads client
//! requests, so there is exactly one writer per connection.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use thrum_core::{AgentId, Clock};
use thrum_wire::methods::{method_name, SubscribeParams};
use thrum_wire::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header, StatusCode};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::daemon::Daemon;
use crate::error::LifecycleError;
use crate::rpc::dispatch::Dispatcher;
use crate::ui;

type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, WsMessage>;

pub struct WsServer;

impl WsServer {
    /// Binds `127.0.0.1:<port>` (`port = 0` lets the OS pick one) and
    /// spawns the accept loop, returning the bound port immediately so the
    /// caller can persist it to `<thrum_dir>/var/thrum.port` (§6.2) without
    /// waiting on the loop itself.
    pub async fn serve<C: Clock + Send + Sync + 'static>(
        port: u16,
        dispatcher: Arc<Dispatcher<C>>,
        daemon: Arc<Daemon<C>>,
        config: Arc<Config>,
        cancel: CancellationToken,
    ) -> Result<u16, LifecycleError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| LifecycleError::BindFailed(PathBuf::from(format!("127.0.0.1:{port}")), e))?;
        let bound_port = listener.local_addr().map(|a| a.port()).unwrap_or(port);
        info!(port = bound_port, "websocket RPC listener bound");

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, addr)) => {
                                let dispatcher = dispatcher.clone();
                                let daemon = daemon.clone();
                                let config = config.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, addr, dispatcher, daemon, config).await {
                                        debug!(error = %e, "websocket connection ended");
                                    }
                                });
                            }
                            Err(e) => warn!(error = %e, "failed to accept tcp connection"),
                        }
                    }
                    _ = cancel.cancelled() => {
                        info!("websocket RPC listener shutting down");
                        break;
                    }
                }
            }
        });
        Ok(bound_port)
    }
}

async fn handle_connection<C: Clock + Send + Sync + 'static>(
    stream: TcpStream,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher<C>>,
    daemon: Arc<Daemon<C>>,
    config: Arc<Config>,
) -> std::io::Result<()> {
    let ui_dev = config.ui_dev;
    let callback = move |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() == "/ws" {
            return Ok(response);
        }
        let path = req.uri().path().trim_start_matches('/');
        let path = if path.is_empty() { "index.html" } else { path };
        match ui::lookup(path, ui_dev) {
            Some(bytes) => {
                let mut resp = ErrorResponse::new(Some(String::from_utf8_lossy(&bytes).into_owned()));
                *resp.status_mut() = StatusCode::OK;
                resp.headers_mut().insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
                Err(resp)
            }
            None => {
                let mut resp = ErrorResponse::new(Some("not found".to_string()));
                *resp.status_mut() = StatusCode::NOT_FOUND;
                Err(resp)
            }
        }
    };

    let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(stream) => stream,
        // Not an upgrade request — the callback already wrote a plain HTTP
        // response (the UI asset, or a 404) for this connection.
        Err(_) => return Ok(()),
    };
    debug!(%addr, "websocket connection upgraded");

    let (mut sink, mut stream) = ws_stream.split();
    let caller_agent_id: Mutex<Option<AgentId>> = Mutex::new(None);
    let client_session_id: Mutex<Option<String>> = Mutex::new(None);
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<JsonRpcNotification>();
    let mut push_task: Option<tokio::task::JoinHandle<()>> = None;

    loop {
        tokio::select! {
            msg = stream.next() => {
                let Some(msg) = msg else { break };
                let msg = match msg {
                    Ok(m) => m,
                    Err(e) => { debug!(error = %e, "websocket read error"); break; }
                };
                match msg {
                    WsMessage::Text(text) => {
                        let request: JsonRpcRequest = match serde_json::from_str(text.as_ref()) {
                            Ok(r) => r,
                            Err(e) => {
                                let err = thrum_wire::parse_error_response(None, e.to_string());
                                if send_response(&mut sink, &err).await.is_err() { break; }
                                continue;
                            }
                        };
                        if let Some(hint) = super::caller_agent_id_hint(&request.params) {
                            *caller_agent_id.lock() = Some(hint);
                        }
                        let method = request.method.clone();
                        let params = request.params.clone();
                        let response: JsonRpcResponse = dispatcher.dispatch(request).await;
                        let ok = response.error.is_none();
                        if send_response(&mut sink, &response).await.is_err() { break; }

                        if ok && method == method_name::SUBSCRIBE {
                            if let Ok(sub) = serde_json::from_value::<SubscribeParams>(params) {
                                *client_session_id.lock() = Some(sub.client_session_id.clone());
                                if push_task.is_none() {
                                    daemon.notify.register(sub.client_session_id.clone(), *caller_agent_id.lock());
                                    push_task = Some(spawn_push_pump(daemon.clone(), sub.client_session_id, push_tx.clone()));
                                }
                            }
                        }
                    }
                    WsMessage::Ping(payload) => {
                        let _ = sink.send(WsMessage::Pong(payload)).await;
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
            Some(notification) = push_rx.recv() => {
                if send_notification(&mut sink, &notification).await.is_err() { break; }
            }
        }
    }

    if let Some(handle) = push_task.take() {
        handle.abort();
    }
    if let Some(id) = client_session_id.lock().clone() {
        if let Err(e) = daemon.clear_client(&id) {
            warn!(error = %e, "failed to clear subscriptions on disconnect");
        }
    }
    Ok(())
}

/// Drains `daemon.notify.recv(client_session_id)` into `push_tx`, which
/// the owning connection task selects alongside inbound requests — the
/// WebSocket sink itself is never shared across tasks.
fn spawn_push_pump<C: Clock + Send + Sync + 'static>(
    daemon: Arc<Daemon<C>>,
    client_session_id: String,
    push_tx: mpsc::UnboundedSender<JsonRpcNotification>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(notification) = daemon.notify.recv(&client_session_id).await else { break };
            if push_tx.send(notification).is_err() {
                break;
            }
        }
    })
}

async fn send_response(sink: &mut WsSink, response: &JsonRpcResponse) -> std::io::Result<()> {
    let text = serde_json::to_string(response).map_err(std::io::Error::other)?;
    sink.send(WsMessage::Text(text.into())).await.map_err(std::io::Error::other)
}

async fn send_notification(sink: &mut WsSink, notification: &JsonRpcNotification) -> std::io::Result<()> {
    let text = serde_json::to_string(notification).map_err(std::io::Error::other)?;
    sink.send(WsMessage::Text(text.into())).await.map_err(std::io::Error::other)
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
