//! Account core configuration.

use std::time::Duration;

use meld_crypto::PBKDF2_MIN_ITERATIONS;

use crate::types::MOMENT_CAPACITY_DEFAULT;

/// Tunables for the account core.
///
/// Every knob has a production default; `from_env` overlays environment
/// variables and falls back (with a warning) on anything unparseable
/// rather than failing startup.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Device session lifetime, absolute from creation/refresh (seconds)
    pub session_ttl_seconds: u64,
    /// Window after `last_authenticated` in which a fingerprint mismatch
    /// is tolerated and the stored fingerprint silently updated (seconds)
    pub fingerprint_grace_seconds: u64,
    /// Cap on the local profile's moment history
    pub moment_capacity: usize,
    /// Safety timeout for callers sharing an in-flight reconciliation
    pub dedup_timeout: Duration,
    /// PBKDF2 iteration count for the PIN wrapping key; values below the
    /// crypto floor are clamped up
    pub pbkdf2_iterations: u32,
    /// Permit the degraded SHA-256-only derivation path when the strong
    /// primitive fails. Off by default; enabling it is a deliberate,
    /// logged compatibility decision.
    pub allow_fallback_derivation: bool,
    /// Optional TTL armed on remote records after each write (seconds)
    pub remote_record_ttl_seconds: Option<u64>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 86_400,
            fingerprint_grace_seconds: 7_200,
            moment_capacity: MOMENT_CAPACITY_DEFAULT,
            dedup_timeout: Duration::from_secs(5),
            pbkdf2_iterations: PBKDF2_MIN_ITERATIONS,
            allow_fallback_derivation: false,
            remote_record_ttl_seconds: None,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "Unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

impl AccountConfig {
    /// Load configuration from environment variables, defaulting any that
    /// are unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            session_ttl_seconds: env_u64("MELD_SESSION_TTL_SECONDS", defaults.session_ttl_seconds),
            fingerprint_grace_seconds: env_u64(
                "MELD_FINGERPRINT_GRACE_SECONDS",
                defaults.fingerprint_grace_seconds,
            ),
            moment_capacity: env_u64("MELD_MOMENT_CAPACITY", defaults.moment_capacity as u64)
                as usize,
            dedup_timeout: Duration::from_millis(env_u64(
                "MELD_DEDUP_TIMEOUT_MS",
                defaults.dedup_timeout.as_millis() as u64,
            )),
            pbkdf2_iterations: env_u64(
                "MELD_PBKDF2_ITERATIONS",
                u64::from(defaults.pbkdf2_iterations),
            ) as u32,
            allow_fallback_derivation: env_bool(
                "MELD_ALLOW_FALLBACK_DERIVATION",
                defaults.allow_fallback_derivation,
            ),
            remote_record_ttl_seconds: std::env::var("MELD_REMOTE_RECORD_TTL_SECONDS")
                .ok()
                .and_then(|raw| raw.parse().ok()),
        }
    }
}
