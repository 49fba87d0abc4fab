// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! thrum-wire: the line-framed JSON-RPC 2.0 envelope and method catalog
//! shared by both daemon transports (Unix domain socket, WebSocket).

pub mod envelope;
pub mod error;
pub mod methods;

pub use envelope::{
    encode_line, read_line, write_line, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcVersion, RequestId,
};
pub use error::{parse_error_response, ThrumError, WireErrorObject};
pub use methods::method_name;
