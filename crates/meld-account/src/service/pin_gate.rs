//! The PIN gate: profile release requires either PIN re-entry or a live
//! device session.

use tracing::{info, warn};

use meld_crypto::encrypt_pin;
use meld_storage::{LocalStore, RemoteStore};

use crate::errors::{AccountError, Result};
use crate::types::{
    GateDecision, GateReason, ReconciliationOutcome, RemoteAccountRecord, SCHEMA_VERSION_CURRENT,
};

use super::{migrate_legacy_record, ChipAccountService};

impl<R: RemoteStore, L: LocalStore> ChipAccountService<R, L> {
    /// Install an encrypted PIN verifier for an existing account.
    ///
    /// PIN protection is opt-in and only possible after first login.
    /// Setting a PIN graduates a legacy record for good.
    pub async fn setup_pin(&self, chip_id: &str, pin: &str) -> Result<bool> {
        let remote = self.fetch_remote(chip_id).await;
        let mut profile = self.fetch_local_profile(chip_id);
        if remote.is_none() && profile.is_none() {
            return Err(AccountError::ProfileMissing(chip_id.to_string()));
        }

        let verifier = encrypt_pin(pin, self.config.pbkdf2_iterations)?;

        // The gate is the only writer of the verifier fields on the
        // shared record.
        let record = match remote {
            Some(mut record) => {
                record.has_pin = true;
                record.pin_verifier = Some(verifier.clone());
                record.legacy = false;
                record.schema_version = SCHEMA_VERSION_CURRENT;
                record
            }
            None => {
                // Remote absent or unreachable: sync the local profile's
                // public fields out together with the new verifier.
                let profile = profile.as_mut().expect("checked above");
                profile.has_pin = true;
                profile.pin_verifier = Some(verifier.clone());
                RemoteAccountRecord::from_profile(profile)
            }
        };
        self.push_remote(&record).await;

        if let Some(profile) = profile.as_mut() {
            profile.has_pin = true;
            profile.pin_verifier = Some(verifier);
            profile.pin_setup_prompted = true;
            profile.legacy = false;
            profile.schema_version = SCHEMA_VERSION_CURRENT;
            self.save_local_profile(profile)?;
        }

        info!(chip_id, "PIN verifier installed");
        Ok(true)
    }

    /// Verify a candidate PIN against the stored verifier.
    ///
    /// Uniformly `false` for a wrong PIN, an unknown chip, or an account
    /// without PIN protection; callers learn nothing about which.
    pub async fn verify_pin(&self, chip_id: &str, pin: &str) -> Result<bool> {
        let verifier = match self.fetch_remote(chip_id).await.and_then(|r| r.pin_verifier) {
            Some(verifier) => Some(verifier),
            // Remote absent or unreachable: the local mirror keeps PIN
            // verification working offline.
            None => self
                .fetch_local_profile(chip_id)
                .and_then(|p| p.pin_verifier),
        };

        match verifier {
            Some(verifier) => {
                Ok(meld_crypto::verify_pin(pin, &verifier, self.config.pbkdf2_iterations)?)
            }
            None => Ok(false),
        }
    }

    /// Decide whether a chip touch may release the profile directly or
    /// must collect a PIN first.
    pub async fn authenticate_with_pin_gate(&self, chip_id: &str) -> Result<GateDecision> {
        let remote = self.fetch_remote(chip_id).await;
        let local = self.fetch_local_profile(chip_id);

        // Brand-new chip: a PIN cannot exist yet.
        if remote.is_none() && local.is_none() {
            let outcome = self.reconcile(chip_id).await?;
            return Ok(GateDecision::Granted {
                outcome,
                reason: GateReason::NewAccount,
            });
        }

        // Pre-PIN-era records bypass the gate; only the shim recognizes
        // them.
        let legacy = match remote {
            Some(ref record) => {
                let mut migrated = record.clone();
                let legacy = migrate_legacy_record(&mut migrated);
                if migrated != *record {
                    self.push_remote(&migrated).await;
                }
                legacy
            }
            None => local.as_ref().is_some_and(|p| p.legacy),
        };
        if legacy {
            warn!(chip_id, "Legacy account, bypassing PIN gate");
            let outcome = self.reconcile(chip_id).await?;
            return Ok(GateDecision::Granted {
                outcome,
                reason: GateReason::LegacyAccount,
            });
        }

        let has_pin = remote.as_ref().map(|r| r.has_pin).unwrap_or(false)
            || local.as_ref().map(|p| p.has_pin).unwrap_or(false);
        if !has_pin {
            let outcome = self.reconcile(chip_id).await?;
            return Ok(GateDecision::Granted {
                outcome,
                reason: GateReason::NoPinProtection,
            });
        }

        match self.get_session(chip_id)? {
            Some(_) => {
                // Live session: skip PIN re-entry and silently re-arm it.
                self.refresh_session(chip_id)?;
                let outcome = self.reconcile(chip_id).await?;
                Ok(GateDecision::Granted {
                    outcome,
                    reason: GateReason::ValidSession,
                })
            }
            None => {
                let reason = if local.is_none() {
                    GateReason::NewDevice
                } else {
                    GateReason::SessionExpired
                };
                Ok(GateDecision::RequiresPin { reason })
            }
        }
    }

    /// Complete a gated authentication with the collected PIN.
    ///
    /// A wrong PIN is a typed failure: no session is created, no profile
    /// is returned, and nothing distinguishes which part of the input
    /// was wrong.
    pub async fn authenticate_after_pin(
        &self,
        chip_id: &str,
        pin: &str,
    ) -> Result<ReconciliationOutcome> {
        if !self.verify_pin(chip_id, pin).await? {
            return Err(AccountError::InvalidPin);
        }

        let outcome = self.reconcile(chip_id).await?;
        self.create_session(chip_id, true)?;
        Ok(outcome)
    }
}
