// SPDX-License-Identifier: MIT

//! C8 RPCServer (§4.8): dual Unix-socket + WebSocket listeners sharing one
//! dispatch table and one newline-framed JSON-RPC 2.0 codec.

pub mod dispatch;
pub mod unix;
pub mod ws;

pub use dispatch::Dispatcher;
pub use unix::UnixServer;
pub use ws::WsServer;

use thrum_core::AgentId;

/// Best-effort read of "whoever this request is on behalf of", used only
/// to remember a connection's `caller_agent_id` for self-suppression on
/// `all`-mode subscriptions (§4.7, §4.8 "per-connection state holds
/// `caller_agent_id` if supplied with the request"). Most request shapes
/// name the field `agent_id`; `message.send` names it `author`.
pub(crate) fn caller_agent_id_hint(params: &serde_json::Value) -> Option<AgentId> {
    params
        .get("agent_id")
        .or_else(|| params.get("author"))
        .and_then(|v| v.as_str())
        .map(AgentId::from_string)
}
