//! Common utility functions for meld cryptographic operations.

use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
///
/// Single source of truth for timestamp generation across the account core.
///
/// # Panics
///
/// Panics if the system time is set before the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time is before Unix epoch")
        .as_secs()
}

/// Generate cryptographically secure random bytes.
///
/// # Example
///
/// ```
/// use meld_crypto::generate_random_bytes;
///
/// let salt: [u8; 16] = generate_random_bytes();
/// let nonce: [u8; 12] = generate_random_bytes();
/// ```
pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
