//! Read-through cache for post listings.
//!
//! Reads consult the cache first and fall back to a loader on miss, storing what the loader
//! returns for a fixed TTL. Writes to posts call [`PageCache::invalidate_all`], which drops every
//! entry under the configured namespace regardless of which page the write affected.
//!
//! Caching is best-effort:
//! - backend read failures and undecodable payloads read as a miss;
//! - a failed store after a successful load is logged and the loaded data is still returned;
//! - loader failures propagate and nothing is cached.
//!
//! Concurrent misses on the same key may each run the loader; the last store wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::entities::PostRecord;

use super::codec::{CodecError, PostPageCodec};
use super::config::{CacheConfig, namespace_with_delimiter};
use super::keys::CacheKey;
use super::store::{BackendError, CacheBackend};

pub const METRIC_CACHE_HIT: &str = "scribe_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "scribe_cache_miss_total";
pub const METRIC_CACHE_POPULATE: &str = "scribe_cache_populate_total";
pub const METRIC_CACHE_DECODE_FAILURE: &str = "scribe_cache_decode_failure_total";
pub const METRIC_CACHE_INVALIDATE: &str = "scribe_cache_invalidate_total";
pub const METRIC_CACHE_BACKEND_ERROR: &str = "scribe_cache_backend_error_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub struct PageCache {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    ttl: Duration,
}

impl PageCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            namespace: namespace_with_delimiter(&config.namespace),
            ttl: config.ttl,
        }
    }

    /// Configured lifetime for populated pages.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// Probes the backend, used at start-up to surface misconfiguration early.
    pub async fn ping(&self) -> Result<(), CacheError> {
        Ok(self.backend.ping().await?)
    }

    fn storage_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Returns the cached listing when present and unexpired.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<PostRecord>> {
        let storage_key = self.storage_key(key);

        let payload = match self.backend.get(&storage_key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                return None;
            }
            Err(err) => {
                counter!(METRIC_CACHE_BACKEND_ERROR, "op" => "get").increment(1);
                counter!(METRIC_CACHE_MISS).increment(1);
                warn!(
                    key = %storage_key,
                    backend = self.backend.kind(),
                    error = %err,
                    "Cache read failed; treating as miss"
                );
                return None;
            }
        };

        match PostPageCodec::decode(&payload) {
            Ok(posts) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(key = %storage_key, items = posts.len(), "cache hit");
                Some(posts)
            }
            Err(err) => {
                counter!(METRIC_CACHE_DECODE_FAILURE).increment(1);
                counter!(METRIC_CACHE_MISS).increment(1);
                warn!(
                    key = %storage_key,
                    payload_bytes = payload.len(),
                    error = %err,
                    "Discarding undecodable cache entry"
                );
                None
            }
        }
    }

    /// Stores `posts` under `key`, replacing any previous entry. A zero TTL stores nothing.
    pub async fn put(
        &self,
        key: &CacheKey,
        posts: &[PostRecord],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }

        let payload = PostPageCodec::encode(posts)?;
        let storage_key = self.storage_key(key);
        self.backend
            .set(&storage_key, payload, ttl)
            .await
            .inspect_err(|_| {
                counter!(METRIC_CACHE_BACKEND_ERROR, "op" => "set").increment(1);
            })?;

        debug!(
            key = %storage_key,
            items = posts.len(),
            ttl_secs = ttl.as_secs(),
            "cache populated"
        );
        Ok(())
    }

    /// Drops every cached listing. Returns how many entries were removed.
    pub async fn invalidate_all(&self) -> Result<u64, CacheError> {
        let removed = self
            .backend
            .delete_prefix(&self.namespace)
            .await
            .inspect_err(|_| {
                counter!(METRIC_CACHE_BACKEND_ERROR, "op" => "invalidate").increment(1);
            })?;

        counter!(METRIC_CACHE_INVALIDATE).increment(1);
        debug!(namespace = %self.namespace, removed, "cache invalidated");
        Ok(removed)
    }

    /// Returns the cached listing for `key`, or runs `loader` and caches its result.
    pub async fn get_or_populate<F, Fut, E>(
        &self,
        key: CacheKey,
        ttl: Duration,
        loader: F,
    ) -> Result<Vec<PostRecord>, E>
    where
        F: FnOnce(CacheKey) -> Fut,
        Fut: Future<Output = Result<Vec<PostRecord>, E>>,
    {
        if let Some(posts) = self.get(&key).await {
            return Ok(posts);
        }

        let posts = loader(key).await?;
        counter!(METRIC_CACHE_POPULATE).increment(1);

        if let Err(err) = self.put(&key, &posts, ttl).await {
            warn!(
                key = %key,
                backend = self.backend.kind(),
                error = %err,
                "Failed to cache loaded page; serving fresh data"
            );
        }

        Ok(posts)
    }
}
