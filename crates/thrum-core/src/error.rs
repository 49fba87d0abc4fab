// SPDX-License-Identifier: MIT

//! Shared error base type.
//!
//! Component crates (`thrum-storage`, `thrum-daemon`) define their own
//! `thiserror` enums and convert into [`CoreError`] or, at the RPC
//! boundary, into `thrum_wire::ThrumError`. `CoreError` exists for the
//! handful of failures that can originate in domain logic itself
//! (validation of a [`crate::message::Priority`] or
//! [`crate::message::BodyFormat`], malformed IDs) rather than in a
//! surrounding component.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid value for {field}: {value:?}")]
    Invalid { field: &'static str, value: String },

    #[error("{0} is empty but must not be")]
    EmptyField(&'static str),
}
