//! Cryptographic constants and domain separation strings.
//!
//! All domain strings are normative. Changing one is a breaking identity
//! migration (every derived keypair, account id and DID changes), so each
//! carries an explicit version tag that MUST be bumped on any change.

/// Size of Ed25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of Ed25519 seeds / private scalars in bytes
pub const SEED_SIZE: usize = 32;

/// Size of Ed25519 signatures in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Size of the PBKDF2 salt for PIN verifier wrapping (128 bits)
pub const PIN_SALT_SIZE: usize = 16;

/// Size of AES-256-GCM nonces in bytes (96 bits)
pub const PIN_NONCE_SIZE: usize = 12;

/// Minimum PBKDF2 iteration count for the PIN wrapping key.
///
/// Callers may configure a higher count; anything lower is clamped up.
pub const PBKDF2_MIN_ITERATIONS: u32 = 100_000;

/// Length of the hashed account identifier in hex characters
pub const ACCOUNT_ID_LENGTH: usize = 16;

// =============================================================================
// Domain Separation Strings
//
// One domain per derivation purpose. The chip UID is the only secret input
// the system ever has, so cross-purpose reuse of derived material is
// prevented entirely by these strings.
// =============================================================================

/// Domain separation for chip UID → identity signing seed derivation (HKDF info)
pub const DOMAIN_CHIP_IDENTITY: &str = "meld:chip:identity:v1";

/// Domain separation for the degraded SHA-256-only compatibility derivation.
///
/// Identities derived under this domain are NOT equivalent to the strong
/// path and are tagged [`DerivationStrength::Fallback`](crate::DerivationStrength).
pub const DOMAIN_CHIP_IDENTITY_FALLBACK: &str = "meld:chip:identity:fallback:v1";

/// Domain separation for the hashed account identifier namespace
pub const DOMAIN_ACCOUNT_ID: &str = "meld:account:v1";

/// Domain separation (PBKDF2 context string) for the PIN wrapping key
pub const DOMAIN_PIN_KEK: &str = "meld:pin:kek:v1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_correct_sizes() {
        assert_eq!(PUBLIC_KEY_SIZE, 32);
        assert_eq!(SEED_SIZE, 32);
        assert_eq!(PIN_SALT_SIZE, 16);
        assert_eq!(PIN_NONCE_SIZE, 12);
        assert!(PBKDF2_MIN_ITERATIONS >= 100_000);
    }

    #[test]
    fn test_domain_strings_are_versioned() {
        let domains = [
            DOMAIN_CHIP_IDENTITY,
            DOMAIN_CHIP_IDENTITY_FALLBACK,
            DOMAIN_ACCOUNT_ID,
            DOMAIN_PIN_KEK,
        ];
        for d in domains {
            assert!(d.starts_with("meld:"), "{d} missing meld: prefix");
            assert!(d.ends_with(":v1"), "{d} missing :v1 version tag");
        }
    }
}
