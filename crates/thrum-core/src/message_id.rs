// SPDX-License-Identifier: MIT

//! Sortable message identifiers (§3: "message_id (sortable ULID-style)").
//!
//! Unlike the random [`crate::id::IdBuf`]-backed IDs used elsewhere,
//! `MessageId` must sort lexicographically in the same order messages were
//! created, so that "within a single author agent, the `message_id` order
//! equals the commit order equals the `created_at` order" (§5) holds
//! without a secondary sort key. It is a 26-character Crockford Base32
//! ULID: a 48-bit millisecond timestamp (10 chars) followed by 80 bits of
//! randomness (16 chars), which does not fit the 23-byte budget the other
//! ID types share, so it is not built on [`crate::define_id`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(SmolStr);

impl MessageId {
    /// Generates a new ID for `at`, breaking ties between same-millisecond
    /// messages with randomness rather than a counter (no shared counter
    /// state needs to cross an `Arc<Mutex<_>>` boundary to mint one).
    pub fn generate(at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis().max(0) as u64;
        let mut out = String::with_capacity(26);
        encode_base32(millis, 10, &mut out);
        let rand_part = nanoid::nanoid!(16, CROCKFORD);
        out.push_str(&rand_part);
        Self(SmolStr::new(out))
    }

    pub fn from_string(s: impl Into<SmolStr>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for MessageId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

fn encode_base32(mut value: u64, width: usize, out: &mut String) {
    let mut buf = vec![b'0'; width];
    for slot in buf.iter_mut().rev() {
        *slot = CROCKFORD[(value & 0x1f) as usize];
        value >>= 5;
    }
    out.push_str(std::str::from_utf8(&buf).unwrap_or_default());
}

#[cfg(test)]
#[path = "message_id_tests.rs"]
mod tests;
