// SPDX-License-Identifier: MIT

//! Conversions shared by every repository: timestamps round-trip through
//! RFC 3339 text columns, structured fields round-trip through JSON text
//! columns (SQLite has no native array/object type).

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{StoreError, StoreResult};

pub fn to_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

pub fn from_rfc3339(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::SnapshotCorrupt(format!("bad timestamp {s:?}: {e}")))
}

pub fn to_json<T: Serialize>(value: &T) -> StoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn from_json<T: DeserializeOwned>(s: &str) -> StoreResult<T> {
    Ok(serde_json::from_str(s)?)
}
