//! Error types for cryptographic operations.

use std::fmt;

/// Errors raised by meld-crypto primitives.
///
/// A failing primitive is fatal to the operation that invoked it; there is
/// no silent downgrade. The explicitly inferior fallback derivation lives
/// behind its own entry point and is never reached through these errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// HKDF expansion failed (requested length out of range)
    HkdfError,
    /// Key derivation could not produce a usable keypair
    KeyDerivationFailed(String),
    /// AEAD encryption failed
    EncryptionFailed(String),
    /// Input failed structural validation (bad hex, wrong length, bad prefix)
    InvalidInput(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HkdfError => write!(f, "HKDF key derivation failed"),
            Self::KeyDerivationFailed(msg) => write!(f, "Key derivation failed: {msg}"),
            Self::EncryptionFailed(msg) => write!(f, "Encryption failed: {msg}"),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Result alias for meld-crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
