//! Device session management: the "stay logged in" window.

use tracing::{debug, info, warn};

use meld_crypto::current_timestamp;
use meld_storage::{session_key, LocalStore, RemoteStore};

use crate::errors::{AccountError, Result};
use crate::types::DeviceSession;

use super::ChipAccountService;

impl<R: RemoteStore, L: LocalStore> ChipAccountService<R, L> {
    /// Create (or replace) the session for a chip on this device.
    pub fn create_session(&self, chip_id: &str, pin_entered: bool) -> Result<DeviceSession> {
        let now = current_timestamp();
        let session = DeviceSession {
            chip_id: chip_id.to_string(),
            fingerprint: self.device_fingerprint(),
            last_authenticated: now,
            pin_entered,
            expires_at: now + self.config.session_ttl_seconds,
        };
        self.save_session(&session)?;
        info!(chip_id, pin_entered, "Device session created");
        Ok(session)
    }

    /// Look up the live session for a chip, auto-evicting anything
    /// expired, cross-wired, or fingerprint-mismatched beyond the grace
    /// window.
    ///
    /// A mismatched fingerprint inside the grace window is accepted and
    /// the stored fingerprint silently updated; minor environment drift
    /// should not force a re-authentication.
    pub fn get_session(&self, chip_id: &str) -> Result<Option<DeviceSession>> {
        let key = session_key(chip_id);
        let value = match self.local.get(&key)? {
            Some(value) => value,
            None => return Ok(None),
        };

        let mut session: DeviceSession = match serde_json::from_value(value) {
            Ok(session) => session,
            Err(err) => {
                warn!(chip_id, error = %err, "Corrupt session record, evicting");
                self.local.remove(&key)?;
                return Ok(None);
            }
        };

        // The chip UID is the key; a record claiming another chip must
        // never authorize this one.
        if session.chip_id != chip_id {
            warn!(
                chip_id,
                stored = %session.chip_id,
                "Session record bound to a different chip, evicting"
            );
            self.local.remove(&key)?;
            return Ok(None);
        }

        let now = current_timestamp();
        if now >= session.expires_at {
            debug!(chip_id, "Session expired, evicting");
            self.local.remove(&key)?;
            return Ok(None);
        }

        let current = self.device_fingerprint();
        if session.fingerprint != current {
            let age = now.saturating_sub(session.last_authenticated);
            if age <= self.config.fingerprint_grace_seconds {
                debug!(chip_id, "Fingerprint drift within grace window, updating");
                session.fingerprint = current;
                self.save_session(&session)?;
            } else {
                warn!(chip_id, "Fingerprint mismatch outside grace window, evicting session");
                self.local.remove(&key)?;
                return Ok(None);
            }
        }

        Ok(Some(session))
    }

    /// Re-arm the session's absolute TTL and stamp the authentication
    /// time. Returns `None` if no live session exists.
    pub fn refresh_session(&self, chip_id: &str) -> Result<Option<DeviceSession>> {
        match self.get_session(chip_id)? {
            Some(mut session) => {
                let now = current_timestamp();
                session.last_authenticated = now;
                session.expires_at = now + self.config.session_ttl_seconds;
                self.save_session(&session)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Drop the session for a chip, or for the current chip when `None`.
    pub fn logout(&self, chip_id: Option<&str>) -> Result<()> {
        let chip = match chip_id {
            Some(chip) => Some(chip.to_string()),
            None => self.current_chip()?,
        };
        if let Some(chip) = chip {
            self.local.remove(&session_key(&chip))?;
            info!(chip_id = %chip, "Logged out");
        }
        Ok(())
    }

    fn save_session(&self, session: &DeviceSession) -> Result<()> {
        let value =
            serde_json::to_value(session).map_err(|e| AccountError::Storage(e.to_string()))?;
        self.local.set(&session_key(&session.chip_id), value)?;
        Ok(())
    }
}
