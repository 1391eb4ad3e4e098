//! PIN verifier scheme: PBKDF2 key wrapping + AES-256-GCM.
//!
//! The PIN itself is never stored. A wrapping key is derived by PBKDF2
//! from the fixed [`DOMAIN_PIN_KEK`] context string and a per-setup random
//! salt, and the PIN is sealed under AES-GCM with a per-encryption random
//! nonce. Verification decrypts and compares the plaintext PIN rather
//! than comparing ciphertexts, which lets a PIN be rotated without
//! touching the wrapping scheme.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::constants::*;
use crate::errors::*;
use crate::utils::generate_random_bytes;

/// Stored form of an encrypted PIN: hex salt plus hex `nonce ‖ ciphertext`.
///
/// Fresh salt and nonce per setup: two setups of the same PIN never
/// produce the same stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinVerifier {
    /// PBKDF2 salt, hex-encoded (16 bytes)
    pub salt_hex: String,
    /// AES-GCM nonce followed by ciphertext, hex-encoded
    pub sealed_hex: String,
}

fn derive_wrapping_key(salt: &[u8], iterations: u32) -> [u8; 32] {
    let iterations = iterations.max(PBKDF2_MIN_ITERATIONS);
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(DOMAIN_PIN_KEK.as_bytes(), salt, iterations, &mut key);
    key
}

/// Encrypt a PIN into its stored verifier form.
///
/// `iterations` below [`PBKDF2_MIN_ITERATIONS`] is clamped up, never down.
pub fn encrypt_pin(pin: &str, iterations: u32) -> Result<PinVerifier> {
    let salt: [u8; PIN_SALT_SIZE] = generate_random_bytes();
    let nonce: [u8; PIN_NONCE_SIZE] = generate_random_bytes();

    let mut key = derive_wrapping_key(&salt, iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), pin.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed("AES-GCM seal failed".into()));
    key.zeroize();
    let ciphertext = ciphertext?;

    let mut sealed = Vec::with_capacity(PIN_NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);

    Ok(PinVerifier {
        salt_hex: hex::encode(salt),
        sealed_hex: hex::encode(sealed),
    })
}

/// Verify a candidate PIN against a stored verifier.
///
/// A wrong PIN and a garbled/tampered verifier both return `Ok(false)`;
/// the caller's failure surface stays uniform. Structural errors (bad hex
/// in the stored record) are reported as [`CryptoError::InvalidInput`].
pub fn verify_pin(pin: &str, verifier: &PinVerifier, iterations: u32) -> Result<bool> {
    let salt = hex::decode(&verifier.salt_hex)
        .map_err(|e| CryptoError::InvalidInput(format!("Invalid salt hex: {e}")))?;
    let sealed = hex::decode(&verifier.sealed_hex)
        .map_err(|e| CryptoError::InvalidInput(format!("Invalid verifier hex: {e}")))?;

    if sealed.len() <= PIN_NONCE_SIZE {
        return Err(CryptoError::InvalidInput(
            "Sealed verifier shorter than nonce".into(),
        ));
    }
    let (nonce, ciphertext) = sealed.split_at(PIN_NONCE_SIZE);

    let mut key = derive_wrapping_key(&salt, iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let decrypted = cipher.decrypt(Nonce::from_slice(nonce), ciphertext);
    key.zeroize();

    match decrypted {
        Ok(mut plaintext) => {
            let matches = plaintext == pin.as_bytes();
            plaintext.zeroize();
            Ok(matches)
        }
        // Authentication failure: wrong key material or tampered ciphertext.
        Err(_) => Ok(false),
    }
}
