//! # meld-crypto
//!
//! Cryptographic primitives for the MELD pendant account core.
//!
//! A pendant chip's UID string is the sole input to identity: this crate
//! turns it into an Ed25519 keypair (HKDF-SHA256 under a versioned domain
//! string), a short hashed account identifier, and a `did:key` string.
//! It also provides the PIN verifier scheme (PBKDF2 key wrapping +
//! AES-256-GCM) used by the PIN gate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod derivation;
pub mod did;
pub mod errors;
pub mod pin;
pub mod utils;

pub use constants::*;
pub use derivation::{derive_account_id, derive_chip_keypair, derive_chip_keypair_fallback};
pub use derivation::{ChipKeyPair, DerivationStrength};
pub use did::{did_to_public_key, is_valid_did, public_key_to_did};
pub use errors::CryptoError;
pub use pin::{encrypt_pin, verify_pin, PinVerifier};
pub use utils::{current_timestamp, generate_random_bytes};
