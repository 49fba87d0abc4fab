// SPDX-License-Identifier: MIT

//! Group: named multi-recipient bundle (§3 "Group"/"GroupMember").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;

/// The built-in group that MUST exist and is auto-recreated if missing
/// (§3, §4.4, Lifecycle step "ensure `@everyone` exists").
pub const EVERYONE_GROUP_NAME: &str = "@everyone";

define_id! {
    pub struct GroupId("grp-");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn is_everyone(&self) -> bool {
        self.name == EVERYONE_GROUP_NAME
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Agent,
    Role,
    Group,
}

/// `(group_id, member_type, member_value)` is unique (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: GroupId,
    pub member_type: MemberType,
    pub member_value: String,
}
