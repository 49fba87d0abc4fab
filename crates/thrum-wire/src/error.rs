// SPDX-License-Identifier: MIT

//! Error taxonomy and stable wire codes (§7).
//!
//! Component errors (`thrum_storage::StoreError`, the daemon's
//! `AddressError`/`MessageError`/`SessionError`/`PeerError`/
//! `LifecycleError`) are wrapped with the offending operation name and
//! returned verbatim up to the RPC boundary, where `ThrumError::from`
//! maps them onto this taxonomy and they are serialized as `{code,
//! message}` (§7 "Propagation policy").

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::RequestId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThrumError {
    #[error(".thrum/ missing — run init first")]
    NotInitialized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("no active session")]
    NoActiveSession,

    #[error("pairing code expired")]
    PairingExpired,

    #[error("pairing code invalid")]
    PairingInvalid,

    #[error("sync unavailable: {0}")]
    SyncUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("timeout")]
    Timeout,
}

impl ThrumError {
    /// Stable wire code (part of the wire contract, §7).
    pub const fn code(&self) -> i64 {
        match self {
            ThrumError::NotInitialized => -32001,
            ThrumError::NotFound(_) => -32002,
            ThrumError::Conflict(_) => -32003,
            ThrumError::NotAuthorized(_) => -32004,
            ThrumError::Invalid(_) => -32005,
            ThrumError::NoActiveSession => -32006,
            ThrumError::PairingExpired => -32007,
            ThrumError::PairingInvalid => -32008,
            ThrumError::SyncUnavailable(_) => -32009,
            ThrumError::Internal(_) => -32010,
            ThrumError::Timeout => -32011,
        }
    }

    /// A registration conflict should tell the user to use `force` or pick
    /// another name (§7 "User-visible failure behavior").
    pub fn registration_conflict(name: &str) -> Self {
        ThrumError::Conflict(format!(
            "agent name {name:?} is already registered; pass force=true to overwrite or choose another name"
        ))
    }

    /// An RPC on an uninitialized repo should point at `init` (§7).
    pub fn not_initialized_hint() -> Self {
        ThrumError::NotInitialized
    }
}

/// The `{code, message}` object serialized into a JSON-RPC `error` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireErrorObject {
    pub code: i64,
    pub message: String,
}

impl From<&ThrumError> for WireErrorObject {
    fn from(e: &ThrumError) -> Self {
        Self { code: e.code(), message: e.to_string() }
    }
}

/// Convenience for building an error response when a request could not
/// even be parsed far enough to recover its `id`.
pub fn parse_error_response(raw_id: Option<RequestId>, message: String) -> crate::envelope::JsonRpcResponse {
    crate::envelope::JsonRpcResponse::err(raw_id, &ThrumError::Invalid(message))
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
