//! Deterministic chip-bound identity derivation.
//!
//! The chip UID is the only input: the same UID must yield byte-identical
//! key material on every device, forever. That guarantee is what lets a
//! pendant touched against a brand-new phone resolve to the same account
//! it has everywhere else.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::*;

/// Which derivation path produced a keypair.
///
/// The fallback path exists only as a compatibility mode for environments
/// where the strong primitive is unavailable. It changes the security
/// properties of the identity and must never be substituted silently;
/// callers gate it behind explicit configuration and log it loudly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationStrength {
    /// HKDF-SHA256 under [`DOMAIN_CHIP_IDENTITY`]
    #[default]
    Strong,
    /// Single SHA-256 pass under [`DOMAIN_CHIP_IDENTITY_FALLBACK`]
    Fallback,
}

/// Ed25519 keypair deterministically derived from a chip UID.
///
/// Computed on demand and never persisted as a derivation artifact; only
/// its outputs (public key, account id, DID) are written to storage, plus
/// the seed into the device-private local profile.
#[derive(Clone)]
pub struct ChipKeyPair {
    signing_key: SigningKey,
    public_key: VerifyingKey,
    strength: DerivationStrength,
}

impl ChipKeyPair {
    fn from_seed(seed: [u8; SEED_SIZE], strength: DerivationStrength) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = signing_key.verifying_key();
        Self { signing_key, public_key, strength }
    }

    /// Get the public key bytes
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.to_bytes()
    }

    /// Get the private seed bytes (32 bytes).
    ///
    /// Only the local profile store may persist this value.
    pub fn seed_bytes(&self) -> [u8; SEED_SIZE] {
        self.signing_key.to_bytes()
    }

    /// Which derivation path produced this keypair
    pub fn strength(&self) -> DerivationStrength {
        self.strength
    }

    /// Sign a message with the derived identity key
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature against the derived public key
    pub fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_SIZE]) -> bool {
        self.public_key
            .verify(message, &Signature::from_bytes(signature))
            .is_ok()
    }
}

/// Clamp a 32-byte seed per the Ed25519 scalar rules (RFC 8032).
fn clamp_seed(seed: &mut [u8; SEED_SIZE]) {
    seed[0] &= 248;
    seed[31] &= 127;
    seed[31] |= 64;
}

/// Derive the identity keypair for a chip UID (strong path).
///
/// HKDF-SHA256 with the UID as input key material and
/// [`DOMAIN_CHIP_IDENTITY`] as the info string, clamped before seeding the
/// signer. Pure and deterministic: same UID, same keypair, on any device.
pub fn derive_chip_keypair(chip_id: &str) -> Result<ChipKeyPair> {
    let hkdf = Hkdf::<Sha256>::new(None, chip_id.as_bytes());
    let mut seed = [0u8; SEED_SIZE];
    hkdf.expand(DOMAIN_CHIP_IDENTITY.as_bytes(), &mut seed)
        .map_err(|_| CryptoError::HkdfError)?;

    clamp_seed(&mut seed);
    Ok(ChipKeyPair::from_seed(seed, DerivationStrength::Strong))
}

/// Derive the identity keypair via the degraded compatibility path.
///
/// A single SHA-256 pass instead of HKDF. Kept for parity with historical
/// identities created before the strong path existed; callers must gate
/// this behind explicit configuration and emit a structured warning.
pub fn derive_chip_keypair_fallback(chip_id: &str) -> ChipKeyPair {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_CHIP_IDENTITY_FALLBACK.as_bytes());
    hasher.update(chip_id.as_bytes());
    let mut seed: [u8; SEED_SIZE] = hasher.finalize().into();

    clamp_seed(&mut seed);
    ChipKeyPair::from_seed(seed, DerivationStrength::Fallback)
}

/// Derive the short hashed account identifier for a chip UID.
///
/// SHA-256 over [`DOMAIN_ACCOUNT_ID`] and the UID, truncated to
/// [`ACCOUNT_ID_LENGTH`] hex characters. One-to-one with the UID for all
/// practical purposes.
pub fn derive_account_id(chip_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_ACCOUNT_ID.as_bytes());
    hasher.update(chip_id.as_bytes());
    let digest = hasher.finalize();

    let mut id = hex::encode(digest);
    id.truncate(ACCOUNT_ID_LENGTH);
    id
}
