//! The two store interfaces consumed by the reconciliation core.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;

/// Shared, possibly-absent remote key-value store.
///
/// Values are opaque bytes; the core serializes records to JSON before
/// writing. Implementations must map reachability problems to
/// [`StorageError::Unreachable`](crate::StorageError::Unreachable) so the
/// core can degrade to local-only operation instead of failing.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a value by key. `None` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, overwriting any previous one.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Arm a time-to-live on a key. Best-effort; implementations without
    /// native expiry may ignore it.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Device-scoped synchronous key-value store.
///
/// Holds JSON values directly (the browser-storage heritage of the
/// interface). Always reachable; a corrupt value is returned as-is and
/// it is the caller's job to treat undecodable records as absent.
pub trait LocalStore: Send + Sync {
    /// Fetch a value by key. `None` means the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value, overwriting any previous one.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete a key. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
