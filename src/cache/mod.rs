//! Scribe page cache
//!
//! A read-through cache for post listings:
//!
//! - [`PageCache`] memoizes listings keyed by [`CacheKey`] for a fixed TTL and drops every entry
//!   on [`PageCache::invalidate_all`].
//! - [`CacheBackend`] stores the serialized pages; [`MemoryBackend`] keeps them in process and
//!   [`RedisBackend`] shares them between instances.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"   # or "redis"
//! ttl_seconds = 600
//! namespace = "scribe:"
//! ```

mod clock;
mod codec;
mod config;
mod keys;
mod lock;
mod page_cache;
mod redis_store;
mod store;

use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{CodecError, PostPageCodec};
pub use config::{
    CacheBackendKind, CacheConfig, DEFAULT_CACHE_NAMESPACE, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_MAX_PAGE_SIZE, namespace_with_delimiter,
};
pub use keys::CacheKey;
pub use page_cache::{
    CacheError, METRIC_CACHE_BACKEND_ERROR, METRIC_CACHE_DECODE_FAILURE, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS, METRIC_CACHE_POPULATE, PageCache,
};
pub use redis_store::RedisBackend;
pub use store::{BackendError, CacheBackend, MemoryBackend};

/// Builds the page cache described by `config`, or `None` when caching is disabled.
pub fn build_page_cache(config: &CacheConfig) -> Result<Option<Arc<PageCache>>, BackendError> {
    if !config.enabled {
        return Ok(None);
    }

    let backend: Arc<dyn CacheBackend> = match config.backend {
        CacheBackendKind::Memory => Arc::new(MemoryBackend::new()),
        CacheBackendKind::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                BackendError::unavailable("redis backend selected without a connection url")
            })?;
            Arc::new(RedisBackend::connect(url)?)
        }
    };

    Ok(Some(Arc::new(PageCache::new(backend, config))))
}
