//! In-flight request deduplication.
//!
//! At most one reconciliation runs per chip UID process-wide; concurrent
//! callers for the same UID share the leader's result instead of racing
//! to create duplicate records. The map is owned by the service (never a
//! process global) so tests can instantiate isolated instances.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;

use crate::errors::{AccountError, Result};

type SharedResult<T> = Option<Result<T>>;
type SharedMap<T> = Arc<Mutex<HashMap<String, watch::Receiver<SharedResult<T>>>>>;

/// Map from chip UID to the pending result of its in-flight call.
///
/// The first caller for a key becomes the leader and runs the future;
/// later callers await the leader's broadcast. The entry is evicted on
/// every completion path (including cancellation, via a drop guard), and
/// waiters carry a safety timeout that force-evicts a stuck key so one
/// wedged call can never poison future ones. Failures propagate to all
/// waiters and are never cached.
pub(crate) struct InflightMap<T> {
    inner: SharedMap<T>,
}

/// Evicts the leader's entry no matter how the leader's future ends.
struct EvictGuard<T> {
    map: SharedMap<T>,
    key: String,
}

impl<T> Drop for EvictGuard<T> {
    fn drop(&mut self) {
        if let Ok(mut map) = self.map.lock() {
            map.remove(&self.key);
        }
    }
}

enum Role<T> {
    Leader(watch::Sender<SharedResult<T>>),
    Waiter(watch::Receiver<SharedResult<T>>),
}

impl<T: Clone + Send + Sync + 'static> InflightMap<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of keys currently in flight
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("inflight mutex").len()
    }

    /// Run `fut` for `key`, or share the result of the call already in
    /// flight for it.
    pub async fn run<F>(&self, key: &str, timeout: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let role = {
            let mut map = self.inner.lock().expect("inflight mutex");
            match map.get(key) {
                Some(rx) => Role::Waiter(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    map.insert(key.to_string(), rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Leader(tx) => {
                let _guard = EvictGuard {
                    map: Arc::clone(&self.inner),
                    key: key.to_string(),
                };
                let result = fut.await;
                // Waiters may all be gone already; that is fine.
                let _ = tx.send(Some(result.clone()));
                result
            }
            Role::Waiter(mut rx) => {
                let waited = tokio::time::timeout(timeout, async {
                    loop {
                        if let Some(result) = rx.borrow_and_update().clone() {
                            break result;
                        }
                        if rx.changed().await.is_err() {
                            // Leader dropped without broadcasting (cancelled).
                            break Err(AccountError::DeduplicationTimeout);
                        }
                    }
                })
                .await;

                match waited {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(key, "In-flight wait exceeded safety window, evicting stale entry");
                        self.inner.lock().expect("inflight mutex").remove(key);
                        Err(AccountError::DeduplicationTimeout)
                    }
                }
            }
        }
    }
}
