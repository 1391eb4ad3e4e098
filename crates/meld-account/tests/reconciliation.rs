//! End-to-end reconciliation scenarios against the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meld_account::{
    AccountConfig, AccountError, ChipAccountService, DeviceTraits, GateDecision, GateReason,
    MomentKind, ProfilePatch, RemoteAccountRecord,
};
use meld_storage::{account_key, LocalStore, MemoryLocalStore, MemoryRemoteStore, RemoteStore};

const CHIP: &str = "04:AA:BB:CC";

type Service = ChipAccountService<MemoryRemoteStore, MemoryLocalStore>;

fn traits(hostname: &str) -> DeviceTraits {
    DeviceTraits {
        platform: "linux".into(),
        language: "en-US".into(),
        screen: (1080, 2400),
        cpu_count: 8,
        hostname: hostname.into(),
    }
}

fn device(remote: Arc<MemoryRemoteStore>, hostname: &str) -> Service {
    ChipAccountService::with_device_traits(
        remote,
        Arc::new(MemoryLocalStore::new()),
        AccountConfig::default(),
        traits(hostname),
    )
}

// ============================================================================
// Reconciliation matrix
// ============================================================================

#[tokio::test]
async fn test_new_chip_end_to_end() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = device(Arc::clone(&remote), "device-a");

    let outcome = service.reconcile(CHIP).await.unwrap();
    assert!(outcome.is_new_account);
    assert!(outcome.is_new_device);

    let profile = &outcome.profile;
    assert!(profile.display_name.as_deref().unwrap().contains("BBCC"));
    assert_eq!(profile.username.as_deref(), Some("pendant-bbcc"));
    assert_eq!(profile.moments.len(), 1);
    assert_eq!(profile.moments[0].kind, MomentKind::Genesis);
    assert!(profile.did.starts_with("did:key:z6Mk"));

    // Exactly one shared record, and it never carries the private key.
    assert_eq!(remote.len(), 1);
    let bytes = remote.get(&account_key(CHIP)).await.unwrap().unwrap();
    let json = String::from_utf8(bytes).unwrap();
    assert!(!json.contains(&profile.private_key_hex));
}

#[tokio::test]
async fn test_second_device_resurrects_same_identity() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let first = device(Arc::clone(&remote), "device-a");
    let second = device(Arc::clone(&remote), "device-b");

    let a = first.reconcile(CHIP).await.unwrap();
    let b = second.reconcile(CHIP).await.unwrap();

    assert!(!b.is_new_account);
    assert!(b.is_new_device);
    // Determinism across devices: identical identity material.
    assert_eq!(a.profile.public_key_hex, b.profile.public_key_hex);
    assert_eq!(a.profile.did, b.profile.did);
    assert_eq!(a.profile.account_id, b.profile.account_id);
    assert_eq!(a.profile.private_key_hex, b.profile.private_key_hex);
    // Still one shared record.
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn test_known_device_merge_is_idempotent() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = device(Arc::clone(&remote), "device-a");

    let first = service.reconcile(CHIP).await.unwrap();
    let before = first.profile.moments.len();

    let second = service.reconcile(CHIP).await.unwrap();
    let third = service.reconcile(CHIP).await.unwrap();

    assert!(!second.is_new_account && !second.is_new_device);
    assert!(!third.is_new_account && !third.is_new_device);
    // Exactly one new moment per call, no duplicate remote record.
    assert_eq!(third.profile.moments.len(), before + 2);
    assert_eq!(remote.len(), 1);
    assert_eq!(third.profile.stats.touch_count, 3);
}

#[tokio::test]
async fn test_local_present_remote_absent_syncs_out() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = device(Arc::clone(&remote), "device-a");

    service.reconcile(CHIP).await.unwrap();
    remote.delete(&account_key(CHIP)).await.unwrap();

    let outcome = service.reconcile(CHIP).await.unwrap();
    assert!(!outcome.is_new_account);
    assert!(!outcome.is_new_device);
    // The local profile re-created the shared record.
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn test_ring_buffer_caps_at_fifty_newest_first() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = device(remote, "device-a");

    let mut last = None;
    for _ in 0..60 {
        last = Some(service.reconcile(CHIP).await.unwrap());
    }
    let profile = last.unwrap().profile;
    assert_eq!(profile.moments.len(), 50);
    for pair in profile.moments.windows(2) {
        assert!(pair[0].at >= pair[1].at, "moments must be newest first");
    }
    assert_eq!(profile.stats.moment_count, 60);
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn test_remote_outage_still_succeeds_locally() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.set_offline(true);
    let service = device(Arc::clone(&remote), "device-a");

    let outcome = service.reconcile(CHIP).await.unwrap();
    assert!(outcome.is_new_account);
    assert!(!outcome.profile.private_key_hex.is_empty());

    // Nothing reached the remote, and the next touch still works.
    remote.set_offline(false);
    assert_eq!(remote.len(), 0);
    let next = service.reconcile(CHIP).await.unwrap();
    assert!(!next.is_new_account);
    // The merge path synced the record out once the store came back.
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn test_corrupt_local_profile_degrades_to_new_device() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let local = Arc::new(MemoryLocalStore::new());
    let service = ChipAccountService::with_device_traits(
        Arc::clone(&remote),
        Arc::clone(&local),
        AccountConfig::default(),
        traits("device-a"),
    );

    service.reconcile(CHIP).await.unwrap();
    local
        .set(&format!("profile:{CHIP}"), serde_json::json!(["garbage"]))
        .unwrap();

    // Corrupt local record reads as absent; the remote record still
    // exists, so this is the new-device path, not a failure.
    let outcome = service.reconcile(CHIP).await.unwrap();
    assert!(!outcome.is_new_account);
    assert!(outcome.is_new_device);
}

// ============================================================================
// Deduplication
// ============================================================================

/// Remote store that is slow enough for concurrent touches to overlap.
struct SlowRemoteStore {
    inner: MemoryRemoteStore,
    delay: Duration,
}

#[async_trait]
impl RemoteStore for SlowRemoteStore {
    async fn get(&self, key: &str) -> meld_storage::errors::Result<Option<Vec<u8>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }
    async fn set(&self, key: &str, value: Vec<u8>) -> meld_storage::errors::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value).await
    }
    async fn expire(&self, key: &str, ttl_seconds: u64) -> meld_storage::errors::Result<()> {
        self.inner.expire(key, ttl_seconds).await
    }
    async fn delete(&self, key: &str) -> meld_storage::errors::Result<()> {
        self.inner.delete(key).await
    }
}

#[tokio::test]
async fn test_concurrent_touches_share_one_reconciliation() {
    let remote = Arc::new(SlowRemoteStore {
        inner: MemoryRemoteStore::new(),
        delay: Duration::from_millis(50),
    });
    let service = Arc::new(ChipAccountService::with_device_traits(
        Arc::clone(&remote),
        Arc::new(MemoryLocalStore::new()),
        AccountConfig::default(),
        traits("device-a"),
    ));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move { service.reconcile(CHIP).await }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    // One creation, not ten racing ones; every caller saw the same result.
    assert_eq!(remote.inner.len(), 1);
    for outcome in &outcomes {
        assert!(outcome.is_new_account);
        assert_eq!(outcome.profile, outcomes[0].profile);
    }
}

// ============================================================================
// PIN gate
// ============================================================================

#[tokio::test]
async fn test_pin_gate_full_flow() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = device(Arc::clone(&remote), "device-a");

    // First touch: brand-new chip bypasses the gate.
    let decision = service.authenticate_with_pin_gate(CHIP).await.unwrap();
    match decision {
        GateDecision::Granted { reason, outcome } => {
            assert_eq!(reason, GateReason::NewAccount);
            assert!(outcome.is_new_account);
        }
        other => panic!("expected grant, got {other:?}"),
    }

    // Without a PIN the gate stays open.
    let decision = service.authenticate_with_pin_gate(CHIP).await.unwrap();
    assert!(matches!(
        decision,
        GateDecision::Granted {
            reason: GateReason::NoPinProtection,
            ..
        }
    ));

    // Opt into PIN protection.
    assert!(service.setup_pin(CHIP, "1234").await.unwrap());
    assert!(service.verify_pin(CHIP, "1234").await.unwrap());
    assert!(!service.verify_pin(CHIP, "0000").await.unwrap());

    // No session yet: the gate closes.
    let decision = service.authenticate_with_pin_gate(CHIP).await.unwrap();
    assert!(matches!(
        decision,
        GateDecision::RequiresPin {
            reason: GateReason::SessionExpired
        }
    ));

    // Wrong PIN: typed failure, no session created.
    let err = service.authenticate_after_pin(CHIP, "0000").await.unwrap_err();
    assert_eq!(err, AccountError::InvalidPin);
    assert!(service.get_session(CHIP).unwrap().is_none());

    // Right PIN: profile released, session established.
    let outcome = service.authenticate_after_pin(CHIP, "1234").await.unwrap();
    assert!(!outcome.is_new_account);
    let session = service.get_session(CHIP).unwrap().unwrap();
    assert!(session.pin_entered);

    // Next touch rides the session.
    let decision = service.authenticate_with_pin_gate(CHIP).await.unwrap();
    assert!(matches!(
        decision,
        GateDecision::Granted {
            reason: GateReason::ValidSession,
            ..
        }
    ));

    // Logout closes the gate again.
    service.logout(Some(CHIP)).unwrap();
    let decision = service.authenticate_with_pin_gate(CHIP).await.unwrap();
    assert!(decision.requires_pin());
}

#[tokio::test]
async fn test_pin_gate_on_unseen_device_reports_new_device() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let first = device(Arc::clone(&remote), "device-a");

    first.reconcile(CHIP).await.unwrap();
    first.setup_pin(CHIP, "1234").await.unwrap();

    let second = device(Arc::clone(&remote), "device-b");
    let decision = second.authenticate_with_pin_gate(CHIP).await.unwrap();
    assert!(matches!(
        decision,
        GateDecision::RequiresPin {
            reason: GateReason::NewDevice
        }
    ));

    // PIN entry set up on device A unlocks device B.
    let outcome = second.authenticate_after_pin(CHIP, "1234").await.unwrap();
    assert!(outcome.is_new_device);
    assert!(second.get_session(CHIP).unwrap().is_some());
}

#[tokio::test]
async fn test_pin_verification_works_offline_via_local_mirror() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = device(Arc::clone(&remote), "device-a");

    service.reconcile(CHIP).await.unwrap();
    service.setup_pin(CHIP, "1234").await.unwrap();

    remote.set_offline(true);
    assert!(service.verify_pin(CHIP, "1234").await.unwrap());
    assert!(!service.verify_pin(CHIP, "0000").await.unwrap());
}

#[tokio::test]
async fn test_fresh_verifier_bytes_per_setup() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = device(Arc::clone(&remote), "device-a");
    service.reconcile(CHIP).await.unwrap();

    service.setup_pin(CHIP, "1234").await.unwrap();
    let first = service.reconcile(CHIP).await.unwrap().profile.pin_verifier.unwrap();

    service.setup_pin(CHIP, "1234").await.unwrap();
    let second = service.reconcile(CHIP).await.unwrap().profile.pin_verifier.unwrap();

    assert_ne!(first.salt_hex, second.salt_hex);
    assert_ne!(first.sealed_hex, second.sealed_hex);
}

// ============================================================================
// Legacy records
// ============================================================================

#[tokio::test]
async fn test_legacy_record_bypasses_gate_until_pin_setup() {
    let remote = Arc::new(MemoryRemoteStore::new());

    // A pre-versioning record from the pre-PIN era.
    let legacy = RemoteAccountRecord {
        chip_id: CHIP.to_string(),
        created_at: 1_600_000_000,
        last_seen: 1_600_000_000,
        ..Default::default()
    };
    remote
        .set(&account_key(CHIP), serde_json::to_vec(&legacy).unwrap())
        .await
        .unwrap();

    let service = device(Arc::clone(&remote), "device-a");
    let decision = service.authenticate_with_pin_gate(CHIP).await.unwrap();
    assert!(matches!(
        decision,
        GateDecision::Granted {
            reason: GateReason::LegacyAccount,
            ..
        }
    ));

    // Setting a PIN graduates the account for good.
    service.setup_pin(CHIP, "1234").await.unwrap();
    let decision = service.authenticate_with_pin_gate(CHIP).await.unwrap();
    assert!(decision.requires_pin());
}

// ============================================================================
// Profile updates
// ============================================================================

#[tokio::test]
async fn test_update_profile_fields_mirrors_to_remote() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = device(Arc::clone(&remote), "device-a");
    service.reconcile(CHIP).await.unwrap();

    let profile = service
        .update_profile_fields(
            CHIP,
            ProfilePatch {
                display_name: Some("Ada".into()),
                bio: Some("pendant person".into()),
                setup_complete: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(profile.display_name.as_deref(), Some("Ada"));
    assert_eq!(profile.moments[0].kind, MomentKind::ProfileUpdate);

    let bytes = remote.get(&account_key(CHIP)).await.unwrap().unwrap();
    let record: RemoteAccountRecord = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(record.display_name.as_deref(), Some("Ada"));
    assert_eq!(record.bio.as_deref(), Some("pendant person"));
    assert!(record.setup_complete);
}

#[tokio::test]
async fn test_update_without_profile_is_typed_error() {
    let service = device(Arc::new(MemoryRemoteStore::new()), "device-a");
    let err = service
        .update_profile_fields(CHIP, ProfilePatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::ProfileMissing(_)));
}
