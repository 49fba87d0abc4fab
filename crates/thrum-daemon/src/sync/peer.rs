// SPDX-License-Identifier: MIT

//! C10 PeerSync (§4.10): direct replication between daemons that share an
//! overlay network but not a Git remote.
//!
//! The pairing handshake is split across two modules: [`crate::peers`]
//! holds the storage-facing half (`start_pairing`/`accept_pairing`/
//! `list_peers`), this module drives the network half — dialing out for
//! `peer.join`, answering `sync.pull`/`sync.notify` on the receiving side,
//! and the periodic safety-net pull.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thrum_core::{Clock, Peer};
use thrum_wire::methods::{
    method_name, PairRequestParams, PairRequestResult, SyncNotifyParams, SyncNotifyResult, SyncPullParams,
    SyncPullResult,
};
use thrum_wire::{JsonRpcRequest, JsonRpcResponse, JsonRpcVersion, RequestId};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::daemon::Daemon;
use crate::error::PeerError;

/// Safety-net pull cadence — independent of and typically shorter than the
/// GitSyncLoop interval, since it is only a backstop for a missed
/// `sync.notify` (§4.10 "peers also perform a periodic pull as a safety net").
const PEER_PULL_INTERVAL: Duration = Duration::from_secs(10);

/// One JSON-RPC request/response round trip over a fresh WebSocket
/// connection. PeerSync does not keep long-lived peer connections open —
/// each sync exchange is its own short-lived dial (§5 "one long-lived
/// connection per peer" describes the *client*-facing transport; daemon-
/// to-daemon sync dials are infrequent enough that reconnecting is simpler
/// and still well within the loop's own timeout budget).
async fn call<P: serde::Serialize, R: for<'de> serde::Deserialize<'de>>(
    address: &str,
    method: &str,
    params: P,
) -> Result<R, PeerError> {
    let url = normalize_address(address);
    let (mut ws, _) = tokio::time::timeout(Duration::from_secs(5), tokio_tungstenite::connect_async(&url))
        .await
        .map_err(|_| PeerError::Timeout)?
        .map_err(|e| PeerError::SyncUnavailable(e.to_string()))?;

    let request = JsonRpcRequest {
        jsonrpc: JsonRpcVersion,
        id: Some(RequestId::Number(1)),
        method: method.to_string(),
        params: serde_json::to_value(params).map_err(|e| PeerError::SyncUnavailable(e.to_string()))?,
    };
    let text = serde_json::to_string(&request).map_err(|e| PeerError::SyncUnavailable(e.to_string()))?;
    ws.send(WsMessage::Text(text.into())).await.map_err(|e| PeerError::SyncUnavailable(e.to_string()))?;

    let response = tokio::time::timeout(Duration::from_secs(10), ws.next())
        .await
        .map_err(|_| PeerError::Timeout)?
        .ok_or_else(|| PeerError::SyncUnavailable("connection closed before response".into()))?
        .map_err(|e| PeerError::SyncUnavailable(e.to_string()))?;

    let WsMessage::Text(text) = response else {
        return Err(PeerError::SyncUnavailable("non-text frame from peer".into()));
    };
    let response: JsonRpcResponse =
        serde_json::from_str(text.as_ref()).map_err(|e| PeerError::SyncUnavailable(e.to_string()))?;
    if let Some(err) = response.error {
        return Err(PeerError::SyncUnavailable(err.message));
    }
    let result = response.result.ok_or_else(|| PeerError::SyncUnavailable("empty response".into()))?;
    serde_json::from_value(result).map_err(|e| PeerError::SyncUnavailable(e.to_string()))
}

fn normalize_address(address: &str) -> String {
    if address.starts_with("ws://") || address.starts_with("wss://") {
        address.to_string()
    } else {
        format!("ws://{address}")
    }
}

/// `peer.join(address, code)` (§4.10): dials the pairing daemon, completes
/// the handshake with `pair.request`, and persists the returned `Peer` row
/// locally.
pub async fn join<C: Clock>(daemon: &Daemon<C>, address: &str, code: &str) -> Result<Peer, PeerError> {
    let params = PairRequestParams {
        code: code.to_string(),
        name: daemon.repo_id.to_string(),
        daemon_id: daemon.daemon_id,
        address: local_advertised_address(daemon),
    };
    let result: PairRequestResult = call(address, method_name::PAIR_REQUEST, params).await?;
    thrum_storage::repo::peers::upsert(&daemon.store, &result.peer)?;
    Ok(result.peer)
}

/// Best-effort guess at this daemon's own dialable address for the peer it
/// is joining to store back. A real deployment supplies this via
/// configuration; §4.10 doesn't mandate a discovery mechanism beyond the
/// pairing exchange itself, so the WebSocket port is the only piece this
/// daemon can state with confidence.
fn local_advertised_address<C: Clock>(daemon: &Daemon<C>) -> String {
    format!("127.0.0.1:{}", daemon.config.ws_port)
}

/// Answers `pair.request` on the accepting side (RPC dispatch calls this).
/// Issues a fresh `pair_token`, stores the joiner as a `Peer`, and returns
/// it so the joiner can store the same row back (§4.10).
pub fn accept_pair_request<C: Clock>(daemon: &Daemon<C>, params: PairRequestParams) -> Result<PairRequestResult, PeerError> {
    let now = daemon.clock.utc_now();
    let pair_token = nanoid::nanoid!(32);
    let peer = Peer {
        daemon_id: params.daemon_id,
        name: params.name,
        address: params.address,
        pair_token,
        paired_at: now,
        last_sync_at: None,
        last_known_seq: 0,
    };
    daemon.accept_pairing(&params.code, peer.clone()).map_err(|e| match e {
        crate::error::DaemonError::Peer(pe) => pe,
        other => PeerError::SyncUnavailable(other.to_string()),
    })?;
    Ok(PairRequestResult { peer })
}

/// Answers `sync.pull` on the receiving side: returns this daemon's own
/// events past `since_seq`, after checking `pair_token` against a known
/// peer (§4.10 "Authorization").
pub fn handle_sync_pull<C: Clock>(daemon: &Daemon<C>, params: SyncPullParams) -> Result<SyncPullResult, PeerError> {
    authorize(daemon, &params.pair_token)?;
    let events = thrum_storage::event_log::entries_after(&daemon.store, &daemon.daemon_id, params.since_seq)?;
    let latest_seq = thrum_storage::event_log::latest_sequence(&daemon.store, &daemon.daemon_id)?;
    Ok(SyncPullResult { events, latest_seq })
}

/// Answers `sync.notify` on the receiving side: authorizes the caller, then
/// immediately pulls from it (§4.10 "triggers the receiver to pull").
pub async fn handle_sync_notify<C: Clock>(daemon: &Daemon<C>, params: SyncNotifyParams) -> Result<SyncNotifyResult, PeerError> {
    let peer = authorize(daemon, &params.pair_token)?;
    if peer.daemon_id != params.daemon_id {
        return Err(PeerError::PairingInvalid);
    }
    let pulled = pull_from_peer(daemon, &peer).await?;
    Ok(SyncNotifyResult { pulled })
}

fn authorize<C: Clock>(daemon: &Daemon<C>, pair_token: &str) -> Result<Peer, PeerError> {
    thrum_storage::repo::peers::find_by_pair_token(&daemon.store, pair_token)?.ok_or(PeerError::PairingInvalid)
}

/// Pulls and applies everything past this daemon's recorded cursor for
/// `peer`, advancing both the Projector's `applied_cursor` and the peer's
/// own `last_sync_at`/`last_known_seq` bookkeeping.
async fn pull_from_peer<C: Clock>(daemon: &Daemon<C>, peer: &Peer) -> Result<u64, PeerError> {
    let since = thrum_storage::repo::cursor::get(&daemon.store, &peer.daemon_id)?;
    let params = SyncPullParams { pair_token: peer.pair_token.clone(), since_seq: since };
    let result: SyncPullResult = call(&peer.address, method_name::SYNC_PULL, params).await?;
    let count = result.events.len() as u64;
    if !result.events.is_empty() {
        thrum_storage::projector::apply_and_advance(&daemon.store, &peer.daemon_id, &result.events)?;
    }
    let now = daemon.clock.utc_now();
    thrum_storage::repo::peers::update_sync_progress(&daemon.store, &peer.daemon_id, now, result.latest_seq)?;
    Ok(count)
}

/// Broadcasts `sync.notify` to every paired peer for this daemon's current
/// position. Called by the RPC layer right after a mutating call appends
/// an event (§4.10 "on every local event write, the daemon broadcasts
/// `sync.notify` to all peers"). Failures are logged and otherwise ignored
/// — the periodic safety-net pull covers a dropped notify.
pub async fn notify_all_peers<C: Clock>(daemon: &Daemon<C>) {
    let peers = match thrum_storage::repo::peers::list_all(&daemon.store) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "failed to list peers for sync.notify broadcast");
            return;
        }
    };
    if peers.is_empty() {
        return;
    }
    let latest_seq = match thrum_storage::event_log::latest_sequence(&daemon.store, &daemon.daemon_id) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to read local sequence for sync.notify broadcast");
            return;
        }
    };
    for peer in peers {
        let params = SyncNotifyParams { pair_token: peer.pair_token.clone(), daemon_id: daemon.daemon_id, latest_seq };
        let address = peer.address.clone();
        if let Err(e) = call::<_, SyncNotifyResult>(&address, method_name::SYNC_NOTIFY, params).await {
            debug!(peer = %peer.daemon_id, error = %e, "sync.notify failed, relying on periodic pull");
        }
    }
}

pub struct PeerSyncHandle {
    cancel: CancellationToken,
}

impl PeerSyncHandle {
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

pub struct PeerSyncLoop;

impl PeerSyncLoop {
    /// Spawns the periodic safety-net pull (§4.10). The notify-on-write
    /// path (`notify_all_peers`) is driven by the RPC layer, not this loop.
    pub fn spawn<C: Clock + Send + Sync + 'static>(daemon: Arc<Daemon<C>>) -> PeerSyncHandle {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PEER_PULL_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = loop_cancel.cancelled() => break,
                }
                let peers = match thrum_storage::repo::peers::list_all(&daemon.store) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "failed to list peers for safety-net pull");
                        continue;
                    }
                };
                for peer in peers {
                    if let Err(e) = pull_from_peer(&daemon, &peer).await {
                        debug!(peer = %peer.daemon_id, error = %e, "periodic peer pull failed");
                    }
                }
            }
        });
        PeerSyncHandle { cancel }
    }
}

#[cfg(test)]
#[path = "peer_tests.rs"]
mod tests;
