// SPDX-License-Identifier: MIT

//! Structured tags attached to sessions, messages, and subscriptions.
//!
//! See GLOSSARY: "Scope: a structured tag `{type, value}` ... used for
//! filtering and group addressing."

use serde::{Deserialize, Serialize};

/// A `{type, value}` tag, e.g. `{type: "group", value: "reviewers"}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub scope_type: String,
    pub value: String,
}

impl Scope {
    pub fn new(scope_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self { scope_type: scope_type.into(), value: value.into() }
    }

    /// The scope the daemon attaches whenever a message's effective
    /// audience is every agent in the repo (§4.4).
    pub fn everyone() -> Self {
        Self::new("group", crate::group::EVERYONE_GROUP_NAME)
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.scope_type == "group" && self.value == name
    }
}

/// A `{type, value}` reference tag (e.g. a PR number, a file path).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ref {
    #[serde(rename = "type")]
    pub ref_type: String,
    pub value: String,
}

impl Ref {
    pub fn new(ref_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self { ref_type: ref_type.into(), value: value.into() }
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
