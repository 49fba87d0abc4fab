// SPDX-License-Identifier: MIT

//! Peer: a directly-paired remote daemon (§3 "Peer", §4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repo::DaemonId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub daemon_id: DaemonId,
    pub name: String,
    pub address: String,
    pub pair_token: String,
    pub paired_at: DateTime<Utc>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_known_seq: u64,
}

/// A short-lived pairing code (§4.10: "Codes expire after 5 minutes").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingCode {
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

pub const PAIRING_CODE_TTL: chrono::Duration = chrono::Duration::minutes(5);

impl PairingCode {
    pub fn generate(now: DateTime<Utc>) -> Self {
        // Six decimal digits, easy to read aloud/type during pairing.
        let code = format!("{:06}", nanoid_digits());
        Self { code, issued_at: now }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.issued_at) >= PAIRING_CODE_TTL
    }
}

fn nanoid_digits() -> u32 {
    let s = nanoid::nanoid!(6, b"0123456789");
    s.parse().unwrap_or(0)
}

#[cfg(test)]
#[path = "peer_tests.rs"]
mod tests;
