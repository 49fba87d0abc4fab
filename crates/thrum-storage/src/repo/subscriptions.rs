// SPDX-License-Identifier: MIT

//! Subscription repository (§3, §4.7 NotificationBus matching).

use rusqlite::{params, OptionalExtension, Row};
use thrum_core::{Scope, Subscription, SubscriptionId, SubscriptionMode};

use super::util::{from_rfc3339, to_rfc3339};
use crate::error::StoreResult;
use crate::store::Store;

fn mode_str(m: SubscriptionMode) -> &'static str {
    match m {
        SubscriptionMode::Scope => "scope",
        SubscriptionMode::Mention => "mention",
        SubscriptionMode::All => "all",
    }
}

fn parse_mode(s: &str) -> SubscriptionMode {
    match s {
        "scope" => SubscriptionMode::Scope,
        "mention" => SubscriptionMode::Mention,
        _ => SubscriptionMode::All,
    }
}

fn row_to_subscription(row: &Row) -> rusqlite::Result<Subscription> {
    let mode: String = row.get("mode")?;
    let scope_type: Option<String> = row.get("scope_type")?;
    let scope_value: Option<String> = row.get("scope_value")?;
    let created_at: String = row.get("created_at")?;
    Ok(Subscription {
        subscription_id: SubscriptionId::from_string(row.get::<_, String>("subscription_id")?),
        client_session_id: row.get("client_session_id")?,
        mode: parse_mode(&mode),
        scope: match (scope_type, scope_value) {
            (Some(t), Some(v)) => Some(Scope::new(t, v)),
            _ => None,
        },
        mention_role: row.get("mention_role")?,
        created_at: from_rfc3339(&created_at).unwrap_or_default(),
    })
}

/// Inserts `sub` unless an equivalent subscription (by
/// [`Subscription::dedup_key`]) already exists for the same client
/// session; returns the existing subscription in that case instead of a
/// duplicate (§3).
pub fn insert_deduped(store: &Store, sub: &Subscription) -> StoreResult<Subscription> {
    let existing = list_for_client(store, &sub.client_session_id)?;
    if let Some(found) = existing.into_iter().find(|s| s.dedup_key() == sub.dedup_key()) {
        return Ok(found);
    }
    store.lock().execute(
        "INSERT INTO subscriptions (subscription_id, client_session_id, mode, scope_type, scope_value, mention_role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            sub.subscription_id.as_str(),
            sub.client_session_id,
            mode_str(sub.mode),
            sub.scope.as_ref().map(|s| s.scope_type.clone()),
            sub.scope.as_ref().map(|s| s.value.clone()),
            sub.mention_role,
            to_rfc3339(sub.created_at),
        ],
    )?;
    Ok(sub.clone())
}

pub fn remove(store: &Store, subscription_id: &SubscriptionId) -> StoreResult<()> {
    store.lock().execute("DELETE FROM subscriptions WHERE subscription_id = ?1", [subscription_id.as_str()])?;
    Ok(())
}

/// Called when a client session disconnects (§4.7 lifecycle).
pub fn remove_for_client(store: &Store, client_session_id: &str) -> StoreResult<()> {
    store.lock().execute("DELETE FROM subscriptions WHERE client_session_id = ?1", [client_session_id])?;
    Ok(())
}

pub fn list_for_client(store: &Store, client_session_id: &str) -> StoreResult<Vec<Subscription>> {
    let conn = store.lock();
    let mut stmt = conn.prepare("SELECT * FROM subscriptions WHERE client_session_id = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map([client_session_id], row_to_subscription)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_all(store: &Store) -> StoreResult<Vec<Subscription>> {
    let conn = store.lock();
    let mut stmt = conn.prepare("SELECT * FROM subscriptions ORDER BY created_at ASC")?;
    let rows = stmt.query_map([], row_to_subscription)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn find_by_id(store: &Store, subscription_id: &SubscriptionId) -> StoreResult<Option<Subscription>> {
    let conn = store.lock();
    Ok(conn
        .query_row("SELECT * FROM subscriptions WHERE subscription_id = ?1", [subscription_id.as_str()], row_to_subscription)
        .optional()?)
}

#[cfg(test)]
#[path = "subscriptions_tests.rs"]
mod tests;
