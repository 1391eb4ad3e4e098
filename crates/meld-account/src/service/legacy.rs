//! Compatibility shim for pre-PIN-era account records.
//!
//! Early records carry no schema version and may hold a placeholder
//! verifier where later clients store real key material. Recognition is
//! isolated here as an explicit migration step; the reconciliation
//! branch logic never inspects dates or sentinel values itself.
//!
//! Legacy-ness is one-way: the flag survives until a PIN is successfully
//! set up, at which point the PIN gate clears it for good.

use crate::types::{RemoteAccountRecord, SCHEMA_VERSION_CURRENT};

/// Records created before this instant predate PIN support
/// (2024-01-01T00:00:00Z).
pub(crate) const LEGACY_PIN_CUTOFF: u64 = 1_704_067_200;

/// Placeholder verifier payload written by pre-PIN clients
pub(crate) const LEGACY_PLACEHOLDER_SEALED: &str = "00";

/// Apply the legacy shim to a record read from the remote store.
///
/// Returns whether the record is (now) flagged legacy. Unversioned
/// records are stamped with the current schema version either way, so
/// the shim runs at most once per record lifetime.
pub(crate) fn migrate_legacy_record(record: &mut RemoteAccountRecord) -> bool {
    if record.schema_version >= SCHEMA_VERSION_CURRENT {
        return record.legacy;
    }

    let placeholder_verifier = record
        .pin_verifier
        .as_ref()
        .is_some_and(|v| v.sealed_hex.is_empty() || v.sealed_hex == LEGACY_PLACEHOLDER_SEALED);
    let pre_pin_era = record.created_at != 0 && record.created_at < LEGACY_PIN_CUTOFF;

    if pre_pin_era || placeholder_verifier {
        record.legacy = true;
        record.has_pin = false;
        record.pin_verifier = None;
    }
    record.schema_version = SCHEMA_VERSION_CURRENT;
    record.legacy
}
