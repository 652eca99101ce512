//! Idempotency cache for mutating boundary operations (booking, payments,
//! change-set apply).
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_idempotency::{IdempotencyCache, IdempotencyKey};
//!
//! let cache = IdempotencyCache::new();
//! let key = IdempotencyKey::compute("client-key", "POST", "/itineraries/1:apply", "user-1");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Notify;
use tokio::time::timeout;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_WAIT: Duration = Duration::from_secs(5);
const DEFAULT_CAPACITY: u64 = 100_000;

/// Composite key: SHA-256 over `(clientKey, method, path, principal)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdempotencyKey([u8; 32]);

impl IdempotencyKey {
    #[must_use]
    pub fn compute(client_key: &str, method: &str, path: &str, principal: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(client_key.as_bytes());
        hasher.update(b"\0");
        hasher.update(method.as_bytes());
        hasher.update(b"\0");
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(principal.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

/// A captured response, replayed verbatim on a cache hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    /// Another executor holds the in-flight marker for this key and did
    /// not complete within `T_wait`.
    #[error("idempotency race: executor for this key did not complete in time")]
    Race,
}

/// Either a replayed response or the outcome of a fresh execution.
#[derive(Debug, Clone)]
pub enum IdempotencyOutcome {
    Replayed(CachedResponse),
    Fresh(CachedResponse),
}

/// Single-flight, TTL-backed response cache keyed by
/// `(clientKey, method, path, principal)`.
pub struct IdempotencyCache {
    cache: Cache<IdempotencyKey, CachedResponse>,
    in_flight: DashMap<IdempotencyKey, Arc<Notify>>,
    wait: Duration,
}

impl IdempotencyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CAPACITY, DEFAULT_TTL, DEFAULT_WAIT)
    }

    #[must_use]
    pub fn with_config(capacity: u64, ttl: Duration, wait: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
            in_flight: DashMap::new(),
            wait,
        }
    }

    /// Execute `f` under idempotency protection for `key`. On a cache hit
    /// the prior response is returned verbatim without calling `f`. Under
    /// a concurrent identical key, only one caller executes `f`; the rest
    /// wait up to the configured window then fail with
    /// [`IdempotencyError::Race`]. `f`'s `Ok` results are cached only when
    /// `status` is in the 2xx range; errors and non-2xx responses are
    /// never cached.
    pub async fn execute<F, Fut>(
        &self,
        key: IdempotencyKey,
        f: F,
    ) -> Result<IdempotencyOutcome, IdempotencyError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = CachedResponse>,
    {
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(IdempotencyOutcome::Replayed(cached));
        }

        let notify = match self.in_flight.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                let notify = entry.get().clone();
                drop(entry);
                if timeout(self.wait, notify.notified()).await.is_err() {
                    return Err(IdempotencyError::Race);
                }
                return match self.cache.get(&key).await {
                    Some(cached) => Ok(IdempotencyOutcome::Replayed(cached)),
                    None => Err(IdempotencyError::Race),
                };
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let notify = Arc::new(Notify::new());
                entry.insert(notify.clone());
                notify
            }
        };

        let response = f().await;
        if (200..300).contains(&response.status) {
            self.cache.insert(key, response.clone()).await;
        }
        self.in_flight.remove(&key);
        notify.notify_waiters();
        Ok(IdempotencyOutcome::Fresh(response))
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn response(status: u16) -> CachedResponse {
        CachedResponse { status, headers: vec![], body: serde_json::json!({"ok": true}) }
    }

    #[tokio::test]
    async fn second_call_with_same_key_is_replayed_without_reexecuting() {
        let cache = IdempotencyCache::new();
        let key = IdempotencyKey::compute("k1", "POST", "/apply", "u1");
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = calls.clone();
        let first = cache
            .execute(key, || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                response(200)
            })
            .await
            .unwrap();
        assert!(matches!(first, IdempotencyOutcome::Fresh(_)));

        let c2 = calls.clone();
        let second = cache
            .execute(key, || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                response(200)
            })
            .await
            .unwrap();
        assert!(matches!(second, IdempotencyOutcome::Replayed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_responses_are_not_cached() {
        let cache = IdempotencyCache::new();
        let key = IdempotencyKey::compute("k2", "POST", "/book", "u1");

        cache.execute(key, || async { response(500) }).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        cache
            .execute(key, || async move {
                c.fetch_add(1, Ordering::SeqCst);
                response(500)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn key_is_deterministic() {
        let k1 = IdempotencyKey::compute("k", "POST", "/p", "u");
        let k2 = IdempotencyKey::compute("k", "POST", "/p", "u");
        assert_eq!(k1, k2);
        let k3 = IdempotencyKey::compute("k", "POST", "/other", "u");
        assert_ne!(k1, k3);
    }
}
