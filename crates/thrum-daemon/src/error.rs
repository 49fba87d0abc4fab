// SPDX-License-Identifier: MIT

//! Component error taxonomy (§7) and the single conversion point into
//! [`thrum_wire::ThrumError`].
//!
//! Handler code never constructs a `ThrumError` directly — it returns one
//! of these, and the RPC boundary (`rpc::dispatch`) maps it at the last
//! possible moment, per §7's propagation policy.

use thiserror::Error;
use thrum_wire::ThrumError;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error(transparent)]
    Store(#[from] thrum_storage::StoreError),
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] thrum_storage::StoreError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no active session")]
    NoActiveSession,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] thrum_storage::StoreError),
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("pairing code expired")]
    PairingExpired,

    #[error("pairing code invalid")]
    PairingInvalid,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timeout")]
    Timeout,

    #[error("sync unavailable: {0}")]
    SyncUnavailable(String),

    #[error(transparent)]
    Store(#[from] thrum_storage::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine thrum directory")]
    NoThrumDir,

    #[error(".thrum/ missing — run init first")]
    NotInitialized,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error(transparent)]
    Store(#[from] thrum_storage::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level handler error every RPC method returns; every branch maps
/// onto exactly one [`ThrumError`] variant (§7).
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] thrum_storage::StoreError),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("not initialized")]
    NotInitialized,
}

pub type DaemonResult<T> = Result<T, DaemonError>;

impl From<&DaemonError> for ThrumError {
    fn from(err: &DaemonError) -> Self {
        match err {
            DaemonError::NotInitialized => ThrumError::not_initialized_hint(),
            DaemonError::Invalid(msg) => ThrumError::Invalid(msg.clone()),
            DaemonError::Store(e) => ThrumError::Internal(e.to_string()),
            DaemonError::Address(AddressError::Store(e)) => ThrumError::Internal(e.to_string()),
            DaemonError::Message(e) => match e {
                MessageError::NotFound(m) => ThrumError::NotFound(m.clone()),
                MessageError::NotAuthorized(m) => ThrumError::NotAuthorized(m.clone()),
                MessageError::Invalid(m) => ThrumError::Invalid(m.clone()),
                MessageError::Store(e) => ThrumError::Internal(e.to_string()),
                MessageError::Address(e) => ThrumError::Internal(e.to_string()),
            },
            DaemonError::Session(e) => match e {
                SessionError::NotFound(m) => ThrumError::NotFound(m.clone()),
                SessionError::NoActiveSession => ThrumError::NoActiveSession,
                SessionError::Conflict(m) => ThrumError::Conflict(m.clone()),
                SessionError::Store(e) => ThrumError::Internal(e.to_string()),
            },
            DaemonError::Peer(e) => match e {
                PeerError::PairingExpired => ThrumError::PairingExpired,
                PeerError::PairingInvalid => ThrumError::PairingInvalid,
                PeerError::NotFound(m) => ThrumError::NotFound(m.clone()),
                PeerError::Timeout => ThrumError::Timeout,
                PeerError::SyncUnavailable(m) => ThrumError::SyncUnavailable(m.clone()),
                PeerError::Store(e) => ThrumError::Internal(e.to_string()),
                PeerError::Io(e) => ThrumError::Internal(e.to_string()),
            },
            DaemonError::Lifecycle(e) => match e {
                LifecycleError::NotInitialized | LifecycleError::NoThrumDir => {
                    ThrumError::NotInitialized
                }
                other => ThrumError::Internal(other.to_string()),
            },
        }
    }
}

impl From<DaemonError> for ThrumError {
    fn from(err: DaemonError) -> Self {
        ThrumError::from(&err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
