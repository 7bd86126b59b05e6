//! Cache storage backends.
//!
//! A backend stores opaque payloads under string keys with a TTL. The process-local
//! [`MemoryBackend`] lives here; the Redis backend lives in `redis_store`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::clock::{Clock, SystemClock};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache command failed: {0}")]
    Command(String),
}

impl BackendError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn command(err: impl std::fmt::Display) -> Self {
        Self::Command(err.to_string())
    }
}

/// Key-value storage behind the page cache.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the payload when present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError>;

    /// Stores `payload`, replacing any previous entry, expiring `ttl` from now.
    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> Result<(), BackendError>;

    /// Removes every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, BackendError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn kind(&self) -> &'static str;
}

struct Entry {
    payload: Bytes,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local backend. Expired entries are dropped when read.
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_if_expired(&self, key: &str, now: Instant) {
        let mut entries = rw_write(&self.entries, SOURCE, "evict_expired");
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        let now = self.clock.now();
        {
            let entries = rw_read(&self.entries, SOURCE, "get");
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.payload.clone())),
                Some(_) => {}
            }
        }

        self.evict_if_expired(key, now);
        Ok(None)
    }

    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> Result<(), BackendError> {
        let expires_at = self.clock.now() + ttl;
        rw_write(&self.entries, SOURCE, "set").insert(
            key.to_string(),
            Entry {
                payload,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, BackendError> {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_prefix");
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::cache::clock::ManualClock;

    fn backend_with_clock() -> (MemoryBackend, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (MemoryBackend::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn set_then_get_until_expiry() {
        let (backend, clock) = backend_with_clock();
        backend
            .set("k", Bytes::from_static(b"v"), Duration::from_secs(10))
            .await
            .expect("set");

        clock.advance(Duration::from_secs(9));
        assert_eq!(
            backend.get("k").await.expect("get"),
            Some(Bytes::from_static(b"v"))
        );

        clock.advance(Duration::from_secs(1));
        assert_eq!(backend.get("k").await.expect("get"), None);
        assert!(backend.is_empty(), "expired entry dropped on read");
    }

    #[tokio::test]
    async fn set_replaces_previous_entry_and_expiry() {
        let (backend, clock) = backend_with_clock();
        backend
            .set("k", Bytes::from_static(b"old"), Duration::from_secs(5))
            .await
            .expect("set");
        clock.advance(Duration::from_secs(4));
        backend
            .set("k", Bytes::from_static(b"new"), Duration::from_secs(5))
            .await
            .expect("set");
        clock.advance(Duration::from_secs(4));

        assert_eq!(
            backend.get("k").await.expect("get"),
            Some(Bytes::from_static(b"new"))
        );
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn delete_prefix_only_touches_matching_keys() {
        let backend = MemoryBackend::new();
        let ttl = Duration::from_secs(60);
        for key in ["app:posts", "app:posts:1:10", "app:posts:2:10", "other:posts"] {
            backend
                .set(key, Bytes::from_static(b"[]"), ttl)
                .await
                .expect("set");
        }

        let removed = backend.delete_prefix("app:").await.expect("delete");
        assert_eq!(removed, 3);
        assert!(backend.get("app:posts:1:10").await.expect("get").is_none());
        assert!(backend.get("other:posts").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn recovers_from_poisoned_lock() {
        let backend = MemoryBackend::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = backend
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        backend
            .set("k", Bytes::from_static(b"v"), Duration::from_secs(1))
            .await
            .expect("set");
        assert!(backend.get("k").await.expect("get").is_some());
    }
}
