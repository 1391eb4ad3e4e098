//! Error taxonomy for the account core.
//!
//! Propagation policy:
//! - remote-store failures are downgraded to "record absent" inside the
//!   reconciliation engine and never surface from `reconcile`;
//! - corrupt local records are downgraded to "absent" on read;
//! - a wrong PIN is a typed error carrying no detail about which part of
//!   the input was wrong;
//! - crypto primitive failure is fatal to the operation;
//! - deduplication timeout is retryable, never a cached permanent failure.

use std::fmt;

use meld_crypto::CryptoError;
use meld_storage::StorageError;

/// Errors surfaced by the account core.
///
/// `Clone` because a failure must fan out to every caller sharing an
/// in-flight reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Remote store unreachable (only visible from operations where
    /// local-only degradation is impossible, e.g. PIN setup with no
    /// local profile to mirror into)
    RemoteUnreachable(String),
    /// Local record existed but could not be decoded
    LocalStoreCorrupt(String),
    /// PIN verification failed
    InvalidPin,
    /// A cryptographic primitive failed; no secure identity can be derived
    CryptoFailure(String),
    /// The in-flight reconciliation this caller was waiting on never
    /// completed within the safety window; retry
    DeduplicationTimeout,
    /// Operation requires an existing account and none was found
    ProfileMissing(String),
    /// Local store write failure (local writes are authoritative and
    /// cannot be degraded away)
    Storage(String),
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteUnreachable(msg) => write!(f, "Remote record store unreachable: {msg}"),
            Self::LocalStoreCorrupt(msg) => write!(f, "Local record unreadable: {msg}"),
            Self::InvalidPin => write!(f, "Invalid PIN"),
            Self::CryptoFailure(msg) => write!(f, "Cryptographic operation failed: {msg}"),
            Self::DeduplicationTimeout => {
                write!(f, "Authentication already in flight timed out; retry")
            }
            Self::ProfileMissing(chip_id) => write!(f, "No account exists for chip {chip_id}"),
            Self::Storage(msg) => write!(f, "Local storage error: {msg}"),
        }
    }
}

impl std::error::Error for AccountError {}

impl From<CryptoError> for AccountError {
    fn from(err: CryptoError) -> Self {
        Self::CryptoFailure(err.to_string())
    }
}

impl From<StorageError> for AccountError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unreachable(msg) => Self::RemoteUnreachable(msg),
            StorageError::Serialization(msg) => Self::LocalStoreCorrupt(msg),
            StorageError::Backend(msg) => Self::Storage(msg),
        }
    }
}

/// Result alias for account core operations
pub type Result<T> = std::result::Result<T, AccountError>;
