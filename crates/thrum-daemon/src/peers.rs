// SPDX-License-Identifier: MIT

//! Peer bookkeeping (§3 "Peer", §4.10): pairing-code issuance and the
//! `Peer` table mutations. The actual network dial-out that completes a
//! pairing handshake, and the periodic safety-net pull, live in
//! [`crate::sync::peer`] — this module is the storage-facing half only.

use thrum_core::{Clock, DaemonId, PairingCode, Peer};

use crate::daemon::Daemon;
use crate::error::{DaemonError, PeerError};

impl<C: Clock> Daemon<C> {
    /// Issues a fresh 6-digit pairing code, replacing any unexpired one
    /// (§4.10: "Codes expire after 5 minutes").
    pub fn start_pairing(&self) -> Result<PairingCode, DaemonError> {
        let now = self.clock.utc_now();
        let code = PairingCode::generate(now);
        thrum_storage::repo::peers::issue_pairing_code(&self.store, &code).map_err(PeerError::from)?;
        Ok(code)
    }

    /// Polls for a pairing code to be consumed (i.e. cleared by a
    /// completed join) or to expire. Callers loop this with their own
    /// timeout/cancellation; it does not block internally beyond one
    /// store read (§4.10 "peer.wait_pairing").
    pub fn pairing_status(&self) -> Result<PairingStatus, DaemonError> {
        let now = self.clock.utc_now();
        match thrum_storage::repo::peers::current_pairing_code(&self.store).map_err(PeerError::from)? {
            None => Ok(PairingStatus::Completed),
            Some(code) if code.is_expired(now) => Ok(PairingStatus::Expired),
            Some(_) => Ok(PairingStatus::Pending),
        }
    }

    /// Validates `code` against the currently issued one and, if valid,
    /// records `peer` and clears the code so it cannot be reused (§4.10).
    pub fn accept_pairing(&self, code: &str, peer: Peer) -> Result<(), DaemonError> {
        let now = self.clock.utc_now();
        let current = thrum_storage::repo::peers::current_pairing_code(&self.store)
            .map_err(PeerError::from)?
            .ok_or(PeerError::PairingInvalid)?;
        if current.is_expired(now) {
            return Err(PeerError::PairingExpired.into());
        }
        if current.code != code {
            return Err(PeerError::PairingInvalid.into());
        }
        thrum_storage::repo::peers::upsert(&self.store, &peer).map_err(PeerError::from)?;
        thrum_storage::repo::peers::clear_pairing_code(&self.store).map_err(PeerError::from)?;
        Ok(())
    }

    pub fn list_peers(&self) -> Result<Vec<Peer>, DaemonError> {
        Ok(thrum_storage::repo::peers::list_all(&self.store).map_err(PeerError::from)?)
    }

    pub fn remove_peer(&self, daemon_id: &DaemonId) -> Result<(), DaemonError> {
        thrum_storage::repo::peers::remove(&self.store, daemon_id).map_err(PeerError::from)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStatus {
    Pending,
    Completed,
    Expired,
}

#[cfg(test)]
#[path = "peers_tests.rs"]
mod tests;
