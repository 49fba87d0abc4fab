// SPDX-License-Identifier: MIT

//! Subscription: a real-time filter held by a connected client (§3, §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;
use crate::scope::Scope;

define_id! {
    pub struct SubscriptionId("sub-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMode {
    Scope,
    Mention,
    All,
}

/// Mutually exclusive filter: exactly one of `scope`/`mention_role` is set,
/// matching `mode` (§3, enforced by `Subscription::new_*` constructors so
/// an invalid combination cannot be constructed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_id: SubscriptionId,
    pub client_session_id: String,
    pub mode: SubscriptionMode,
    pub scope: Option<Scope>,
    pub mention_role: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new_all(client_session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            subscription_id: SubscriptionId::new(),
            client_session_id: client_session_id.into(),
            mode: SubscriptionMode::All,
            scope: None,
            mention_role: None,
            created_at: now,
        }
    }

    pub fn new_scope(
        client_session_id: impl Into<String>,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            subscription_id: SubscriptionId::new(),
            client_session_id: client_session_id.into(),
            mode: SubscriptionMode::Scope,
            scope: Some(scope),
            mention_role: None,
            created_at: now,
        }
    }

    pub fn new_mention(
        client_session_id: impl Into<String>,
        role: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            subscription_id: SubscriptionId::new(),
            client_session_id: client_session_id.into(),
            mode: SubscriptionMode::Mention,
            scope: None,
            mention_role: Some(role.into()),
            created_at: now,
        }
    }

    /// The tuple checked for duplicates before insert (§3, §9: "some
    /// embedded SQL engines treat NULL as distinct under UNIQUE" — the
    /// daemon checks explicitly rather than relying on a DB constraint).
    pub fn dedup_key(&self) -> (String, SubscriptionMode, Option<&Scope>, Option<&str>) {
        (
            self.client_session_id.clone(),
            self.mode,
            self.scope.as_ref(),
            self.mention_role.as_deref(),
        )
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
