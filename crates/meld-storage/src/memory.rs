//! In-memory reference implementations of both store interfaces.
//!
//! `MemoryRemoteStore` can be switched offline to exercise the core's
//! degraded local-only path; `MemoryLocalStore` is a plain mutex-guarded
//! map.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{Result, StorageError};
use crate::traits::{LocalStore, RemoteStore};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<u64>,
}

/// In-memory [`RemoteStore`] with TTL support and an offline switch.
#[derive(Default)]
pub struct MemoryRemoteStore {
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
}

impl MemoryRemoteStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline, every call fails with
    /// [`StorageError::Unreachable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live (non-expired) keys
    pub fn len(&self) -> usize {
        let now = now();
        self.entries
            .lock()
            .expect("remote store mutex")
            .values()
            .filter(|e| e.expires_at.is_none_or(|t| now < t))
            .count()
    }

    /// Whether the store holds no live keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::Unreachable("store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check_online()?;
        let mut entries = self.entries.lock().expect("remote store mutex");
        match entries.get(key) {
            Some(entry) if entry.expires_at.is_some_and(|t| now() >= t) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.check_online()?;
        self.entries.lock().expect("remote store mutex").insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<()> {
        self.check_online()?;
        let mut entries = self.entries.lock().expect("remote store mutex");
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(now() + ttl_seconds);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_online()?;
        self.entries.lock().expect("remote store mutex").remove(key);
        Ok(())
    }
}

/// In-memory [`LocalStore`]
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryLocalStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .entries
            .lock()
            .expect("local store mutex")
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries
            .lock()
            .expect("local store mutex")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().expect("local store mutex").remove(key);
        Ok(())
    }
}
