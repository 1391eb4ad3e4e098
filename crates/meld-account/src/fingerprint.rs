//! Device fingerprinting for session binding.
//!
//! The fingerprint hashes coarse, low-entropy traits only. Volatile
//! signals (battery, window size, orientation) are excluded so that a
//! rotated screen or a resized window does not log the user out. The
//! screen pair is normalized min/max for the same reason.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Coarse device traits feeding the fingerprint.
///
/// Injectable so tests and embedders (which may sit behind a browser or
/// a native shell) can supply real values; [`DeviceTraits::capture`]
/// fills in what the current process can observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTraits {
    /// Platform name ("linux", "macos", "android", ...)
    pub platform: String,
    /// UI language tag
    pub language: String,
    /// Screen dimensions; order does not matter
    pub screen: (u32, u32),
    /// Logical CPU count
    pub cpu_count: u32,
    /// Host name, when available
    pub hostname: String,
}

impl DeviceTraits {
    /// Capture traits observable from the current process.
    pub fn capture() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            language: std::env::var("LANG").unwrap_or_default(),
            screen: (0, 0),
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1),
            hostname: std::env::var("HOSTNAME").unwrap_or_default(),
        }
    }

    /// Stable fingerprint over the normalized traits, hex-encoded.
    pub fn fingerprint(&self) -> String {
        // Rotation-independent screen pair
        let (a, b) = self.screen;
        let (lo, hi) = (a.min(b), a.max(b));

        let mut hasher = Sha256::new();
        hasher.update(self.platform.as_bytes());
        hasher.update([0]);
        hasher.update(self.language.as_bytes());
        hasher.update([0]);
        hasher.update(format!("{lo}x{hi}").as_bytes());
        hasher.update([0]);
        hasher.update(self.cpu_count.to_le_bytes());
        hasher.update([0]);
        hasher.update(self.hostname.as_bytes());
        hex::encode(hasher.finalize())
    }
}
