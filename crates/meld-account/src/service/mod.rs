//! The chip account service: reconciliation, PIN gate, device sessions,
//! profile updates.
//!
//! One service instance owns the store handles, the configuration, and
//! the in-flight deduplication map. Operations are split across the
//! submodules; this module holds the shared store-boundary helpers,
//! including the single call sites where remote failures are downgraded
//! (reads) or intentionally discarded (writes).

mod legacy;
mod pin_gate;
mod profile;
mod reconcile;
mod session;

pub(crate) use legacy::migrate_legacy_record;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use meld_crypto::{derive_account_id, derive_chip_keypair, derive_chip_keypair_fallback};
use meld_crypto::{public_key_to_did, ChipKeyPair};
use meld_storage::{account_key, profile_key, LocalStore, RemoteStore, CURRENT_CHIP_KEY};

use crate::config::AccountConfig;
use crate::dedup::InflightMap;
use crate::errors::{AccountError, Result};
use crate::fingerprint::DeviceTraits;
use crate::types::{LocalProfile, ReconciliationOutcome, RemoteAccountRecord};

/// Derived identity material for one chip UID, recomputed per operation
/// and never read back from storage.
pub(crate) struct DerivedIdentity {
    pub keypair: ChipKeyPair,
    pub account_id: String,
    pub did: String,
}

/// Account/session reconciliation core for MELD pendants.
///
/// Generic over the two store interfaces so embedders can plug in their
/// real backends and tests can use the in-memory ones.
pub struct ChipAccountService<R: RemoteStore, L: LocalStore> {
    remote: Arc<R>,
    local: Arc<L>,
    config: AccountConfig,
    device: DeviceTraits,
    inflight: InflightMap<ReconciliationOutcome>,
}

impl<R: RemoteStore, L: LocalStore> ChipAccountService<R, L> {
    /// Create a service capturing this process's device traits.
    pub fn new(remote: Arc<R>, local: Arc<L>, config: AccountConfig) -> Self {
        Self::with_device_traits(remote, local, config, DeviceTraits::capture())
    }

    /// Create a service with explicit device traits (embedders behind a
    /// browser or native shell supply the real values).
    pub fn with_device_traits(
        remote: Arc<R>,
        local: Arc<L>,
        config: AccountConfig,
        device: DeviceTraits,
    ) -> Self {
        Self {
            remote,
            local,
            config,
            device,
            inflight: InflightMap::new(),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// The chip UID this device last authenticated, if any.
    pub fn current_chip(&self) -> Result<Option<String>> {
        match self.local.get(CURRENT_CHIP_KEY)? {
            Some(Value::String(chip_id)) => Ok(Some(chip_id)),
            Some(other) => {
                warn!(value = %other, "Corrupt current-chip marker, treating as unset");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub(crate) fn set_current_chip(&self, chip_id: &str) -> Result<()> {
        self.local
            .set(CURRENT_CHIP_KEY, Value::String(chip_id.to_string()))?;
        Ok(())
    }

    /// This device's current fingerprint
    pub(crate) fn device_fingerprint(&self) -> String {
        self.device.fingerprint()
    }

    /// Derive the full identity for a chip UID.
    ///
    /// The strong path is the only silent one. The fallback fires only
    /// when configuration explicitly allows it, and never quietly: the
    /// resulting key material is tagged and the switch is logged.
    pub(crate) fn derive_identity(&self, chip_id: &str) -> Result<DerivedIdentity> {
        let keypair = match derive_chip_keypair(chip_id) {
            Ok(keypair) => keypair,
            Err(err) if self.config.allow_fallback_derivation => {
                warn!(
                    chip_id,
                    error = %err,
                    "Strong key derivation failed; using degraded fallback path"
                );
                derive_chip_keypair_fallback(chip_id)
            }
            Err(err) => return Err(AccountError::from(err)),
        };

        let did = public_key_to_did(&keypair.public_key_bytes());
        Ok(DerivedIdentity {
            keypair,
            account_id: derive_account_id(chip_id),
            did,
        })
    }

    // ========================================================================
    // Store boundary
    // ========================================================================

    /// Fetch the shared record, downgrading unreachable/undecodable to
    /// "absent". This is the only place remote read failures are caught.
    pub(crate) async fn fetch_remote(&self, chip_id: &str) -> Option<RemoteAccountRecord> {
        let bytes = match self.remote.get(&account_key(chip_id)).await {
            Ok(bytes) => bytes?,
            Err(err) => {
                warn!(chip_id, error = %err, "Remote store unreachable, proceeding on local data");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(chip_id, error = %err, "Undecodable remote record, treating as absent");
                None
            }
        }
    }

    /// Write the shared record, best-effort.
    ///
    /// This is the single call site where a remote write failure is
    /// logged and intentionally discarded: a remote outage must never
    /// abort the local side of an authentication.
    pub(crate) async fn push_remote(&self, record: &RemoteAccountRecord) {
        let key = account_key(&record.chip_id);
        let bytes = match serde_json::to_vec(record) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(chip_id = %record.chip_id, error = %err, "Failed to serialize remote record");
                return;
            }
        };
        if let Err(err) = self.remote.set(&key, bytes).await {
            warn!(chip_id = %record.chip_id, error = %err, "Remote record write failed, continuing");
            return;
        }
        if let Some(ttl) = self.config.remote_record_ttl_seconds {
            if let Err(err) = self.remote.expire(&key, ttl).await {
                debug!(chip_id = %record.chip_id, error = %err, "Remote TTL arm failed");
            }
        }
    }

    /// Load the device-private profile, downgrading a corrupt value to
    /// "absent" (equivalent to a device that has never seen the chip).
    pub(crate) fn fetch_local_profile(&self, chip_id: &str) -> Option<LocalProfile> {
        let value = match self.local.get(&profile_key(chip_id)) {
            Ok(value) => value?,
            Err(err) => {
                warn!(chip_id, error = %err, "Local profile read failed, treating as absent");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!(chip_id, error = %err, "Corrupt local profile, treating as absent");
                None
            }
        }
    }

    /// Persist the device-private profile. Local writes are authoritative
    /// and their failures are real errors.
    pub(crate) fn save_local_profile(&self, profile: &LocalProfile) -> Result<()> {
        let value =
            serde_json::to_value(profile).map_err(|e| AccountError::Storage(e.to_string()))?;
        self.local.set(&profile_key(&profile.chip_id), value)?;
        Ok(())
    }
}
