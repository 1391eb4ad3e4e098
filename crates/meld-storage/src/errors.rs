//! Storage error type shared by both store interfaces.

use std::fmt;

/// Errors surfaced by store implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The remote store could not be reached (network down, backend gone).
    ///
    /// The reconciliation core downgrades this to "record absent" at its
    /// boundary; it must never abort an authentication.
    Unreachable(String),
    /// A stored value could not be serialized or deserialized
    Serialization(String),
    /// Backend-specific failure that is not a reachability problem
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(msg) => write!(f, "Store unreachable: {msg}"),
            Self::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            Self::Backend(msg) => write!(f, "Storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
