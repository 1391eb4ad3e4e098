//! Record key layout.
//!
//! Both stores are flat string-keyed maps; the chip UID is the join key
//! for every record type.

/// Singleton local key holding the most recently authenticated chip UID.
///
/// Lets the single-user device path answer "who is this device" without a
/// chip present.
pub const CURRENT_CHIP_KEY: &str = "current_chip";

/// Remote store key for a chip's shared account record
pub fn account_key(chip_id: &str) -> String {
    format!("account:{chip_id}")
}

/// Local store key for a chip's device-private profile
pub fn profile_key(chip_id: &str) -> String {
    format!("profile:{chip_id}")
}

/// Local store key for a chip's device session
pub fn session_key(chip_id: &str) -> String {
    format!("session:{chip_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(account_key("04:AA:BB:CC"), "account:04:AA:BB:CC");
        assert_eq!(profile_key("04:AA:BB:CC"), "profile:04:AA:BB:CC");
        assert_eq!(session_key("04:AA:BB:CC"), "session:04:AA:BB:CC");
    }

    #[test]
    fn test_keys_do_not_collide() {
        let chip = "04:AA:BB:CC";
        let keys = [account_key(chip), profile_key(chip), session_key(chip)];
        assert!(keys.iter().all(|k| k != CURRENT_CHIP_KEY));
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
    }
}
