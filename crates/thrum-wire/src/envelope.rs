// SPDX-License-Identifier: MIT

//! Line-framed JSON-RPC 2.0 envelope (§4.8, §6.2 "Wire format").
//!
//! Each frame is exactly one JSON value terminated by `\n`. Both
//! transports (§4.8: Unix domain socket, WebSocket) share this encoding;
//! the WebSocket transport additionally wraps each line as one text frame
//! instead of writing it to a byte stream, but the JSON payload itself is
//! identical either way.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{ThrumError, WireErrorObject};

/// A JSON-RPC request ID: either a number or a string, per the spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireErrorObject>,
}

impl JsonRpcResponse {
    pub fn ok(id: Option<RequestId>, result: Value) -> Self {
        Self { jsonrpc: JsonRpcVersion, id, result: Some(result), error: None }
    }

    pub fn err(id: Option<RequestId>, error: &ThrumError) -> Self {
        Self { jsonrpc: JsonRpcVersion, id, result: None, error: Some(error.into()) }
    }
}

/// Server-initiated notification (§6.1 `notification.message`). Has no
/// `id`, per JSON-RPC 2.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    pub params: Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self { jsonrpc: JsonRpcVersion, method: method.into(), params }
    }
}

/// Always serializes/deserializes as the literal string `"2.0"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s != "2.0" {
            return Err(serde::de::Error::custom(format!("unsupported jsonrpc version {s:?}")));
        }
        Ok(JsonRpcVersion)
    }
}

/// Encodes a value as one newline-terminated JSON line.
pub fn encode_line<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = serde_json::to_vec(value)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Writes one framed line to `writer` and flushes it so the peer sees it
/// immediately (notifications and responses must not wait behind the next
/// unrelated write).
pub async fn write_line<W, T>(writer: &mut W, value: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = encode_line(value).map_err(io::Error::other)?;
    writer.write_all(&bytes).await?;
    writer.flush().await
}

/// Reads one framed line and parses it as `T`. Returns `Ok(None)` on clean
/// EOF (peer closed the connection).
pub async fn read_line<R, T>(reader: &mut BufReader<R>) -> io::Result<Option<T>>
where
    R: tokio::io::AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    let value = serde_json::from_str(line.trim_end_matches(['\n', '\r']))
        .map_err(io::Error::other)?;
    Ok(Some(value))
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
