// SPDX-License-Identifier: MIT

//! Group management (§3 "Group"/"GroupMember", §4.4): the mutation half
//! of addressing. Expansion itself lives in [`crate::address`]; this
//! module only creates/deletes groups and edits membership, each through
//! the event log like every other mutation.

use thrum_core::{Clock, Group, GroupId, GroupMember, MemberType};

use crate::daemon::Daemon;
use crate::error::{AddressError, DaemonError};

impl<C: Clock> Daemon<C> {
    pub fn create_group(&self, name: &str, description: Option<String>) -> Result<GroupId, DaemonError> {
        let now = self.clock.utc_now();
        let group = Group { group_id: GroupId::new(), name: name.to_string(), description, created_at: now };
        thrum_storage::repo::groups::insert(&self.store, &group).map_err(AddressError::from)?;
        thrum_storage::event_log::append(
            &self.store,
            &self.daemon_id,
            &thrum_core::EventPayload::GroupCreated { group_id: group.group_id, name: group.name.clone(), created_at: now },
            now,
        )
        .map_err(AddressError::from)?;
        Ok(group.group_id)
    }

    /// Refuses to delete `@everyone` (§3 invariant).
    pub fn delete_group(&self, group_ref: &str) -> Result<bool, DaemonError> {
        let group = thrum_storage::repo::groups::find_by_id_or_name(&self.store, group_ref).map_err(AddressError::from)?;
        let Some(group) = group else { return Ok(false) };
        let deleted = thrum_storage::repo::groups::delete(&self.store, &group.group_id).map_err(AddressError::from)?;
        if deleted {
            thrum_storage::event_log::append(
                &self.store,
                &self.daemon_id,
                &thrum_core::EventPayload::GroupDeleted { group_id: group.group_id },
                self.clock.utc_now(),
            )
            .map_err(AddressError::from)?;
        }
        Ok(deleted)
    }

    pub fn add_group_member(&self, group_ref: &str, member_type: MemberType, member_value: &str) -> Result<(), DaemonError> {
        let group = thrum_storage::repo::groups::find_by_id_or_name(&self.store, group_ref)
            .map_err(AddressError::from)?
            .ok_or_else(|| DaemonError::Invalid(format!("no such group: {group_ref}")))?;
        thrum_storage::repo::groups::add_member(&self.store, &group.group_id, member_type, member_value)
            .map_err(AddressError::from)?;
        thrum_storage::event_log::append(
            &self.store,
            &self.daemon_id,
            &thrum_core::EventPayload::GroupMemberAdded { group_id: group.group_id, member_type, member_value: member_value.to_string() },
            self.clock.utc_now(),
        )
        .map_err(AddressError::from)?;
        Ok(())
    }

    pub fn remove_group_member(&self, group_ref: &str, member_type: MemberType, member_value: &str) -> Result<(), DaemonError> {
        let group = thrum_storage::repo::groups::find_by_id_or_name(&self.store, group_ref)
            .map_err(AddressError::from)?
            .ok_or_else(|| DaemonError::Invalid(format!("no such group: {group_ref}")))?;
        thrum_storage::repo::groups::remove_member(&self.store, &group.group_id, member_type, member_value)
            .map_err(AddressError::from)?;
        thrum_storage::event_log::append(
            &self.store,
            &self.daemon_id,
            &thrum_core::EventPayload::GroupMemberRemoved { group_id: group.group_id, member_type, member_value: member_value.to_string() },
            self.clock.utc_now(),
        )
        .map_err(AddressError::from)?;
        Ok(())
    }

    pub fn list_groups(&self) -> Result<Vec<Group>, DaemonError> {
        Ok(thrum_storage::repo::groups::list_all(&self.store).map_err(AddressError::from)?)
    }

    pub fn group_info(&self, group_ref: &str) -> Result<Option<Group>, DaemonError> {
        Ok(thrum_storage::repo::groups::find_by_id_or_name(&self.store, group_ref).map_err(AddressError::from)?)
    }

    pub fn group_members(&self, group_ref: &str) -> Result<Vec<GroupMember>, DaemonError> {
        let Some(group) = thrum_storage::repo::groups::find_by_id_or_name(&self.store, group_ref).map_err(AddressError::from)? else {
            return Ok(Vec::new());
        };
        Ok(thrum_storage::repo::groups::members(&self.store, &group.group_id).map_err(AddressError::from)?)
    }
}

#[cfg(test)]
#[path = "groups_tests.rs"]
mod tests;
