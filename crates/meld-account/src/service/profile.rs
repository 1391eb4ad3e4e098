//! Partial profile updates.

use meld_crypto::current_timestamp;
use meld_storage::{LocalStore, RemoteStore};

use crate::errors::{AccountError, Result};
use crate::types::{LocalProfile, MomentKind, ProfilePatch, RemoteAccountRecord};

use super::ChipAccountService;

impl<R: RemoteStore, L: LocalStore> ChipAccountService<R, L> {
    /// Apply a partial update to the local profile and mirror the
    /// shareable fields into the remote record.
    ///
    /// Both stores are whole-value maps, so the merge is field-level
    /// here and the write is always the full record.
    pub async fn update_profile_fields(
        &self,
        chip_id: &str,
        patch: ProfilePatch,
    ) -> Result<LocalProfile> {
        let mut profile = self
            .fetch_local_profile(chip_id)
            .ok_or_else(|| AccountError::ProfileMissing(chip_id.to_string()))?;

        let now = current_timestamp();
        apply_patch(&mut profile, patch);
        profile.last_seen = now;
        profile.record_moment(
            MomentKind::ProfileUpdate,
            None,
            now,
            self.config.moment_capacity,
        );

        // Read-merge-write: pull the current shared record, overlay the
        // shareable fields, push the whole value back.
        let record = match self.fetch_remote(chip_id).await {
            Some(mut record) => {
                record.display_name = profile.display_name.clone();
                record.username = profile.username.clone();
                record.bio = profile.bio.clone();
                record.device_name = profile.device_name.clone();
                record.setup_complete = profile.setup_complete;
                record.last_seen = now;
                record
            }
            None => RemoteAccountRecord::from_profile(&profile),
        };
        self.push_remote(&record).await;

        self.save_local_profile(&profile)?;
        Ok(profile)
    }
}

fn apply_patch(profile: &mut LocalProfile, patch: ProfilePatch) {
    if let Some(display_name) = patch.display_name {
        profile.display_name = Some(display_name);
    }
    if let Some(username) = patch.username {
        profile.username = Some(username);
    }
    if let Some(bio) = patch.bio {
        profile.bio = Some(bio);
    }
    if let Some(device_name) = patch.device_name {
        profile.device_name = Some(device_name);
    }
    if let Some(setup_complete) = patch.setup_complete {
        profile.setup_complete = setup_complete;
    }
    if let Some(pin_setup_prompted) = patch.pin_setup_prompted {
        profile.pin_setup_prompted = pin_setup_prompted;
    }
    if let Some(preferences) = patch.preferences {
        profile.preferences = preferences;
    }
}
