//! The reconciliation engine: one chip UID in, one unified profile out.

use tracing::{info, warn};

use meld_crypto::current_timestamp;
use meld_storage::{LocalStore, RemoteStore};

use crate::errors::Result;
use crate::types::{
    default_display_name, default_username, LocalProfile, MomentKind, Preferences,
    ReconciliationOutcome, RemoteAccountRecord, UsageStats, SCHEMA_VERSION_CURRENT,
};

use super::{ChipAccountService, DerivedIdentity};

impl<R: RemoteStore, L: LocalStore> ChipAccountService<R, L> {
    /// Reconcile a chip touch into a unified local profile.
    ///
    /// Concurrent calls for the same UID share one execution; sequential
    /// calls reprocess freshly. Remote store trouble degrades to
    /// local-only operation and never fails the call.
    pub async fn reconcile(&self, chip_id: &str) -> Result<ReconciliationOutcome> {
        self.inflight
            .run(
                chip_id,
                self.config.dedup_timeout,
                self.reconcile_uncached(chip_id),
            )
            .await
    }

    /// One uncached reconciliation pass: derive, classify the 2×2
    /// presence matrix, merge, persist (remote first and best-effort,
    /// local last and authoritative).
    async fn reconcile_uncached(&self, chip_id: &str) -> Result<ReconciliationOutcome> {
        let identity = self.derive_identity(chip_id)?;
        let now = current_timestamp();

        let remote = self.fetch_remote(chip_id).await;
        let local = self.fetch_local_profile(chip_id);

        let (profile, is_new_account, is_new_device) = match (local, remote) {
            // This device already recognizes the chip.
            (Some(profile), remote) => {
                let profile = self.merge_known_device(profile, remote, &identity, now).await;
                (profile, false, false)
            }
            // Known chip, unseen device: resurrect from the shared record.
            (None, Some(record)) => {
                let profile = self.adopt_on_new_device(record, &identity, now).await;
                (profile, false, true)
            }
            // Brand-new chip: genesis.
            (None, None) => {
                let profile = self.create_account(chip_id, &identity, now).await;
                (profile, true, true)
            }
        };

        // Local store is always the last write; a remote outage above has
        // already been absorbed.
        self.save_local_profile(&profile)?;
        self.set_current_chip(chip_id)?;

        info!(
            chip_id,
            account_id = %profile.account_id,
            is_new_account,
            is_new_device,
            "Reconciled"
        );

        Ok(ReconciliationOutcome {
            profile,
            is_new_account,
            is_new_device,
        })
    }

    async fn merge_known_device(
        &self,
        mut profile: LocalProfile,
        remote: Option<RemoteAccountRecord>,
        identity: &DerivedIdentity,
        now: u64,
    ) -> LocalProfile {
        self.repair_identity_fields(&mut profile, identity);

        profile.stats.touch_count += 1;
        profile.last_seen = now;
        profile.record_moment(
            MomentKind::Authentication,
            None,
            now,
            self.config.moment_capacity,
        );

        match remote {
            Some(mut record) => {
                // Lightweight touch only; profile fields on the shared
                // record belong to whichever device wrote them.
                record.touch(now);
                profile.verification_count = record.verification_count;
                // PIN protection set up on another device does flow in,
                // so offline verification keeps working here.
                if record.has_pin {
                    profile.has_pin = true;
                    profile.pin_verifier = record.pin_verifier.clone();
                }
                self.push_remote(&record).await;
            }
            None => {
                // First sync of a local-only account to the shared store.
                profile.verification_count += 1;
                let record = RemoteAccountRecord::from_profile(&profile);
                self.push_remote(&record).await;
            }
        }

        profile
    }

    async fn adopt_on_new_device(
        &self,
        mut record: RemoteAccountRecord,
        identity: &DerivedIdentity,
        now: u64,
    ) -> LocalProfile {
        record.touch(now);

        // Public fields come from the shared record; key material only
        // ever comes from re-derivation (the remote never has it).
        let mut profile = LocalProfile::from_remote(
            &record,
            hex::encode(identity.keypair.seed_bytes()),
            identity.keypair.strength(),
            now,
        );
        self.repair_identity_fields(&mut profile, identity);
        profile.verification_count = record.verification_count;
        profile.stats.touch_count = 1;
        profile.record_moment(
            MomentKind::Authentication,
            Some("New device".to_string()),
            now,
            self.config.moment_capacity,
        );

        self.push_remote(&record).await;
        profile
    }

    async fn create_account(
        &self,
        chip_id: &str,
        identity: &DerivedIdentity,
        now: u64,
    ) -> LocalProfile {
        let mut profile = LocalProfile {
            schema_version: SCHEMA_VERSION_CURRENT,
            account_id: identity.account_id.clone(),
            chip_id: chip_id.to_string(),
            public_key_hex: hex::encode(identity.keypair.public_key_bytes()),
            did: identity.did.clone(),
            private_key_hex: hex::encode(identity.keypair.seed_bytes()),
            derivation_strength: identity.keypair.strength(),
            created_at: now,
            last_seen: now,
            verification_count: 1,
            has_pin: false,
            pin_verifier: None,
            pin_setup_prompted: false,
            legacy: false,
            display_name: Some(default_display_name(chip_id)),
            username: Some(default_username(chip_id)),
            bio: None,
            device_name: None,
            setup_complete: false,
            preferences: Preferences::default(),
            stats: UsageStats {
                touch_count: 1,
                moment_count: 0,
                first_seen: now,
            },
            moments: Vec::new(),
        };
        profile.record_moment(
            MomentKind::Genesis,
            Some("Account created".to_string()),
            now,
            self.config.moment_capacity,
        );

        let record = RemoteAccountRecord::from_profile(&profile);
        self.push_remote(&record).await;

        info!(chip_id, account_id = %profile.account_id, "New account created");
        profile
    }

    /// Stored identity fields are convenience copies; derivation is the
    /// ground truth. Divergence means a tampered or cross-wired record.
    fn repair_identity_fields(&self, profile: &mut LocalProfile, identity: &DerivedIdentity) {
        let public_key_hex = hex::encode(identity.keypair.public_key_bytes());
        if profile.public_key_hex != public_key_hex
            || profile.did != identity.did
            || profile.account_id != identity.account_id
        {
            warn!(
                chip_id = %profile.chip_id,
                "Stored identity fields diverge from derivation, repairing"
            );
            profile.public_key_hex = public_key_hex;
            profile.did = identity.did.clone();
            profile.account_id = identity.account_id.clone();
            profile.private_key_hex = hex::encode(identity.keypair.seed_bytes());
            profile.derivation_strength = identity.keypair.strength();
        }
    }
}
