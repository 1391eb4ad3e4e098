//! Record types for the account core.
//!
//! Two records describe one identity: the shared, minimal
//! [`RemoteAccountRecord`] and the device-private, rich [`LocalProfile`].
//! The chip UID joins them, together with the per-device
//! [`DeviceSession`].

use meld_crypto::{DerivationStrength, PinVerifier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version stamped on newly written records.
///
/// Versions below this are pre-PIN-era; see the legacy migration shim.
pub const SCHEMA_VERSION_CURRENT: u32 = 2;

/// Cap on the local profile's moment ring buffer
pub const MOMENT_CAPACITY_DEFAULT: usize = 50;

// ============================================================================
// Moments
// ============================================================================

/// What produced a moment entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentKind {
    /// First recognition of the chip anywhere
    Genesis,
    /// A successful authentication touch
    Authentication,
    /// A profile field edit
    ProfileUpdate,
}

/// One entry in the local profile's bounded moment history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentEvent {
    /// Unique event id
    pub id: Uuid,
    /// Event kind
    pub kind: MomentKind,
    /// Unix timestamp (seconds)
    pub at: u64,
    /// Optional human-readable label
    pub label: Option<String>,
}

impl MomentEvent {
    /// Build a moment stamped with the given time
    pub fn new(kind: MomentKind, at: u64, label: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            at,
            label,
        }
    }
}

// ============================================================================
// Shared remote record
// ============================================================================

/// Minimal, cross-device-shareable account record.
///
/// Lives in the remote store under `account:{chip_id}`. Never contains
/// the private key. Only the PIN gate writes the PIN verifier fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteAccountRecord {
    /// Record schema version; 0/1 are pre-PIN-era
    pub schema_version: u32,
    /// Hashed account identifier (derived, stored for lookup convenience)
    pub account_id: String,
    /// The chip UID this record belongs to
    pub chip_id: String,
    /// Hex-encoded Ed25519 public key
    pub public_key_hex: String,
    /// `did:key` encoding of the public key
    pub did: String,
    /// Unix timestamp of record creation
    pub created_at: u64,
    /// Unix timestamp of the last successful authentication anywhere
    pub last_seen: u64,
    /// Count of successful authentications across all devices
    pub verification_count: u64,
    /// Whether a PIN is set on this account
    pub has_pin: bool,
    /// Encrypted PIN verifier (salt + sealed PIN)
    pub pin_verifier: Option<PinVerifier>,
    /// One-way pre-PIN-era compatibility flag; cleared on PIN setup
    pub legacy: bool,
    /// Display name
    pub display_name: Option<String>,
    /// Username handle
    pub username: Option<String>,
    /// Short bio
    pub bio: Option<String>,
    /// Name of the device that last touched the record
    pub device_name: Option<String>,
    /// Whether first-run setup finished
    pub setup_complete: bool,
}

impl RemoteAccountRecord {
    /// Build the shareable record from a local profile's public fields.
    pub fn from_profile(profile: &LocalProfile) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_CURRENT,
            account_id: profile.account_id.clone(),
            chip_id: profile.chip_id.clone(),
            public_key_hex: profile.public_key_hex.clone(),
            did: profile.did.clone(),
            created_at: profile.created_at,
            last_seen: profile.last_seen,
            verification_count: profile.verification_count,
            has_pin: profile.has_pin,
            pin_verifier: profile.pin_verifier.clone(),
            legacy: profile.legacy,
            display_name: profile.display_name.clone(),
            username: profile.username.clone(),
            bio: profile.bio.clone(),
            device_name: profile.device_name.clone(),
            setup_complete: profile.setup_complete,
        }
    }

    /// Lightweight authentication touch: bump the counters, leave every
    /// profile field alone.
    pub fn touch(&mut self, now: u64) {
        self.last_seen = now;
        self.verification_count += 1;
    }
}

// ============================================================================
// Device-private profile
// ============================================================================

/// Per-device user preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// UI theme ("system", "light", "dark")
    pub theme: String,
    /// Haptic feedback on pendant touch
    pub haptics: bool,
    /// Share new moments by default
    pub share_moments: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            haptics: true,
            share_moments: false,
        }
    }
}

/// Per-device usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    /// Successful authentications on this device
    pub touch_count: u64,
    /// Moments recorded on this device
    pub moment_count: u64,
    /// Unix timestamp of the first authentication on this device
    pub first_seen: u64,
}

/// Rich, device-private profile.
///
/// Lives in the local store under `profile:{chip_id}`. Everything in the
/// remote record plus the private key, preferences, stats, and the
/// bounded moment history. The private key never leaves this store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalProfile {
    /// Record schema version
    pub schema_version: u32,
    /// Hashed account identifier
    pub account_id: String,
    /// The chip UID
    pub chip_id: String,
    /// Hex-encoded Ed25519 public key
    pub public_key_hex: String,
    /// `did:key` encoding of the public key
    pub did: String,
    /// Hex-encoded private seed; device-private, never synced
    pub private_key_hex: String,
    /// Which derivation path produced the key material
    pub derivation_strength: DerivationStrength,
    /// Unix timestamp of account creation
    pub created_at: u64,
    /// Unix timestamp of the last authentication on this device
    pub last_seen: u64,
    /// Mirror of the shared verification counter
    pub verification_count: u64,
    /// Whether a PIN is set on this account
    pub has_pin: bool,
    /// Mirror of the encrypted PIN verifier, for offline verification
    pub pin_verifier: Option<PinVerifier>,
    /// Whether this device already prompted the user to set a PIN
    pub pin_setup_prompted: bool,
    /// One-way pre-PIN-era compatibility flag
    pub legacy: bool,
    /// Display name
    pub display_name: Option<String>,
    /// Username handle
    pub username: Option<String>,
    /// Short bio
    pub bio: Option<String>,
    /// This device's name
    pub device_name: Option<String>,
    /// Whether first-run setup finished
    pub setup_complete: bool,
    /// Per-device preferences
    pub preferences: Preferences,
    /// Per-device usage statistics
    pub stats: UsageStats,
    /// Bounded moment history, newest first
    pub moments: Vec<MomentEvent>,
}

impl LocalProfile {
    /// Seed a fresh profile on a new device from the shared record's
    /// public fields. Key material comes from re-derivation, never from
    /// the remote record.
    pub fn from_remote(
        record: &RemoteAccountRecord,
        private_key_hex: String,
        derivation_strength: DerivationStrength,
        now: u64,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_CURRENT,
            account_id: record.account_id.clone(),
            chip_id: record.chip_id.clone(),
            public_key_hex: record.public_key_hex.clone(),
            did: record.did.clone(),
            private_key_hex,
            derivation_strength,
            created_at: record.created_at,
            last_seen: now,
            verification_count: record.verification_count,
            has_pin: record.has_pin,
            pin_verifier: record.pin_verifier.clone(),
            pin_setup_prompted: false,
            legacy: record.legacy,
            display_name: record.display_name.clone(),
            username: record.username.clone(),
            bio: record.bio.clone(),
            device_name: None,
            setup_complete: record.setup_complete,
            preferences: Preferences::default(),
            stats: UsageStats {
                touch_count: 0,
                moment_count: 0,
                first_seen: now,
            },
            moments: Vec::new(),
        }
    }

    /// Prepend a moment, keeping the history capped at `capacity`.
    pub fn record_moment(&mut self, kind: MomentKind, label: Option<String>, now: u64, capacity: usize) {
        self.moments.insert(0, MomentEvent::new(kind, now, label));
        self.moments.truncate(capacity);
        self.stats.moment_count += 1;
    }
}

// ============================================================================
// Device sessions
// ============================================================================

/// Time-boxed, fingerprint-bound "stay logged in" grant for one chip on
/// one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSession {
    /// The chip UID this session authorizes
    pub chip_id: String,
    /// Device fingerprint captured at creation (or last grace update)
    pub fingerprint: String,
    /// Unix timestamp of the last authentication through this session
    pub last_authenticated: u64,
    /// Whether a PIN entry established this session
    pub pin_entered: bool,
    /// Absolute expiry timestamp; re-armed on refresh, not sliding
    pub expires_at: u64,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationOutcome {
    /// The unified, persisted local profile
    pub profile: LocalProfile,
    /// No prior record existed anywhere
    pub is_new_account: bool,
    /// A remote record existed but this device had no profile
    pub is_new_device: bool,
}

/// Why the PIN gate decided what it decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    /// Brand-new chip; a PIN can only exist after first login
    NewAccount,
    /// Pre-PIN-era record; compatibility bypass
    LegacyAccount,
    /// A live device session covered the request
    ValidSession,
    /// The account never opted into a PIN
    NoPinProtection,
    /// A session existed but expired or failed the fingerprint check
    SessionExpired,
    /// This device has never seen the chip
    NewDevice,
}

/// PIN gate decision: either the caller must collect a PIN, or the
/// profile is released with the reconciliation outcome. Structurally
/// branchable; no string matching required.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// A PIN is set and no valid session covers this device
    RequiresPin {
        /// Why the PIN is required
        reason: GateReason,
    },
    /// Profile released
    Granted {
        /// The reconciliation outcome
        outcome: ReconciliationOutcome,
        /// Why no PIN entry was needed
        reason: GateReason,
    },
}

impl GateDecision {
    /// Whether the caller must collect a PIN before retrying
    pub fn requires_pin(&self) -> bool {
        matches!(self, Self::RequiresPin { .. })
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
    /// New display name
    pub display_name: Option<String>,
    /// New username handle
    pub username: Option<String>,
    /// New bio
    pub bio: Option<String>,
    /// New device name
    pub device_name: Option<String>,
    /// Mark first-run setup finished
    pub setup_complete: Option<bool>,
    /// Mark the PIN prompt as shown on this device
    pub pin_setup_prompted: Option<bool>,
    /// Replace preferences wholesale
    pub preferences: Option<Preferences>,
}

// ============================================================================
// Defaults for brand-new chips
// ============================================================================

/// Last four alphanumeric characters of the chip UID, uppercased.
pub fn chip_tail(chip_id: &str) -> String {
    let cleaned: Vec<char> = chip_id.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let tail: String = cleaned
        .iter()
        .skip(cleaned.len().saturating_sub(4))
        .collect();
    if tail.is_empty() {
        "0000".to_string()
    } else {
        tail.to_uppercase()
    }
}

/// Default display name for a brand-new chip
pub fn default_display_name(chip_id: &str) -> String {
    format!("Pendant {}", chip_tail(chip_id))
}

/// Default username handle for a brand-new chip
pub fn default_username(chip_id: &str) -> String {
    format!("pendant-{}", chip_tail(chip_id).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_tail() {
        assert_eq!(chip_tail("04:AA:BB:CC"), "BBCC");
        assert_eq!(chip_tail("04:aa:bb:cc"), "BBCC");
        assert_eq!(chip_tail("AB"), "AB");
        assert_eq!(chip_tail(""), "0000");
    }

    #[test]
    fn test_default_names() {
        assert_eq!(default_display_name("04:AA:BB:CC"), "Pendant BBCC");
        assert_eq!(default_username("04:AA:BB:CC"), "pendant-bbcc");
    }

    #[test]
    fn test_record_moment_caps_and_orders() {
        let mut profile = LocalProfile::default();
        for i in 0..60 {
            profile.record_moment(MomentKind::Authentication, None, 1_000 + i, 50);
        }
        assert_eq!(profile.moments.len(), 50);
        // Newest first
        assert_eq!(profile.moments[0].at, 1_059);
        assert_eq!(profile.moments[49].at, 1_010);
        assert_eq!(profile.stats.moment_count, 60);
    }

    #[test]
    fn test_remote_record_never_sees_private_key() {
        let mut profile = LocalProfile::default();
        profile.private_key_hex = "deadbeef".to_string();
        let record = RemoteAccountRecord::from_profile(&profile);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("deadbeef"));
    }

    #[test]
    fn test_schema_version_defaults_to_zero_on_old_records() {
        // Pre-versioning records have no schema_version field at all.
        let record: RemoteAccountRecord =
            serde_json::from_str(r#"{"chip_id": "04:AA:BB:CC", "created_at": 1690000000}"#)
                .unwrap();
        assert_eq!(record.schema_version, 0);
        assert!(!record.has_pin);
    }

    #[test]
    fn test_touch_bumps_counters_only() {
        let mut record = RemoteAccountRecord {
            display_name: Some("Keep Me".into()),
            verification_count: 3,
            ..Default::default()
        };
        record.touch(2_000);
        assert_eq!(record.verification_count, 4);
        assert_eq!(record.last_seen, 2_000);
        assert_eq!(record.display_name.as_deref(), Some("Keep Me"));
    }
}
