//! `did:key` encoding for derived identity public keys.
//!
//! The DID is presentation-layer only: it is always recomputed from the
//! public key and never treated as ground truth when read back from a
//! store. Format per the did:key method for Ed25519
//! (multicodec 0xed01, base58btc, multibase 'z').

use crate::errors::CryptoError;

const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];
const BASE58BTC_PREFIX: char = 'z';
const DID_KEY_PREFIX: &str = "did:key:";

/// Encode an Ed25519 public key as a `did:key` string.
pub fn public_key_to_did(public_key: &[u8; 32]) -> String {
    let mut bytes = Vec::with_capacity(2 + 32);
    bytes.extend_from_slice(&ED25519_MULTICODEC);
    bytes.extend_from_slice(public_key);

    format!(
        "{DID_KEY_PREFIX}{BASE58BTC_PREFIX}{}",
        bs58::encode(&bytes).into_string()
    )
}

/// Decode a `did:key` string back to an Ed25519 public key.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidInput`] when the method prefix, multibase
/// prefix, base58 payload, length, or multicodec tag is wrong.
pub fn did_to_public_key(did: &str) -> Result<[u8; 32], CryptoError> {
    let remainder = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| CryptoError::InvalidInput("DID must start with 'did:key:'".into()))?;

    let encoded = remainder.strip_prefix(BASE58BTC_PREFIX).ok_or_else(|| {
        CryptoError::InvalidInput("did:key must use base58btc encoding (z prefix)".into())
    })?;

    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CryptoError::InvalidInput(format!("Invalid base58 encoding: {e}")))?;

    if bytes.len() != 34 {
        return Err(CryptoError::InvalidInput(format!(
            "Invalid did:key length: expected 34 bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[..2] != ED25519_MULTICODEC {
        return Err(CryptoError::InvalidInput(
            "Invalid multicodec prefix: expected Ed25519 (0xed01)".into(),
        ));
    }

    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&bytes[2..]);
    Ok(public_key)
}

/// Check whether a string is a well-formed Ed25519 `did:key`.
pub fn is_valid_did(did: &str) -> bool {
    did_to_public_key(did).is_ok()
}
