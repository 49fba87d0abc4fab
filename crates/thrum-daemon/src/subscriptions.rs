// SPDX-License-Identifier: MIT

//! `subscribe`/`unsubscribe`/`subscriptions.list` (§3, §4.7): the
//! durable half of NotificationBus matching. The live delivery queue
//! lives in [`crate::notify::bus::NotificationBus`]; this module only
//! manages the subscription rows it matches against.

use thrum_core::{Clock, Scope, Subscription, SubscriptionId, SubscriptionMode};

use crate::daemon::Daemon;
use crate::error::{AddressError, DaemonError};

impl<C: Clock> Daemon<C> {
    pub fn subscribe(
        &self,
        client_session_id: &str,
        mode: SubscriptionMode,
        scope: Option<Scope>,
        mention_role: Option<String>,
    ) -> Result<Subscription, DaemonError> {
        let now = self.clock.utc_now();
        let sub = match mode {
            SubscriptionMode::All => Subscription::new_all(client_session_id, now),
            SubscriptionMode::Scope => {
                let scope = scope.ok_or_else(|| DaemonError::Invalid("scope subscription requires a scope".into()))?;
                Subscription::new_scope(client_session_id, scope, now)
            }
            SubscriptionMode::Mention => {
                let role = mention_role.ok_or_else(|| DaemonError::Invalid("mention subscription requires a mention_role".into()))?;
                Subscription::new_mention(client_session_id, role, now)
            }
        };
        Ok(thrum_storage::repo::subscriptions::insert_deduped(&self.store, &sub).map_err(AddressError::from)?)
    }

    pub fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), DaemonError> {
        thrum_storage::repo::subscriptions::remove(&self.store, subscription_id).map_err(AddressError::from)?;
        Ok(())
    }

    pub fn list_subscriptions(&self, client_session_id: Option<&str>) -> Result<Vec<Subscription>, DaemonError> {
        let subs = match client_session_id {
            Some(id) => thrum_storage::repo::subscriptions::list_for_client(&self.store, id),
            None => thrum_storage::repo::subscriptions::list_all(&self.store),
        }
        .map_err(AddressError::from)?;
        Ok(subs)
    }

    /// Disconnect hook (§4.7): clears every subscription row for a
    /// departed client and drops its live queue.
    pub fn clear_client(&self, client_session_id: &str) -> Result<(), DaemonError> {
        thrum_storage::repo::subscriptions::remove_for_client(&self.store, client_session_id).map_err(AddressError::from)?;
        self.notify.deregister(client_session_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "subscriptions_tests.rs"]
mod tests;
