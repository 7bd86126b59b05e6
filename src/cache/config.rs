//! Cache configuration.
//!
//! Controls the page cache via the `[cache]` and `[redis]` sections of `scribe.toml`.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_CACHE_NAMESPACE: &str = "scribe:";
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

const NAMESPACE_DELIMITER: char = ':';

/// Trims `namespace` and ends it with `:` so one prefix never matches a longer sibling
/// (`scribe` would otherwise also cover `scriber:*`).
pub fn namespace_with_delimiter(namespace: &str) -> String {
    let trimmed = namespace.trim();
    if trimmed.ends_with(NAMESPACE_DELIMITER) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{NAMESPACE_DELIMITER}")
    }
}

/// Storage used for cached pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve listings straight from the store when false.
    pub enabled: bool,
    pub backend: CacheBackendKind,
    /// Lifetime of a populated page.
    pub ttl: Duration,
    /// Prepended to every stored key; invalidation drops everything under it.
    pub namespace: String,
    /// Upper bound applied to the `pageSize` query parameter.
    pub max_page_size: u32,
    /// Connection URL, required for [`CacheBackendKind::Redis`].
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            redis_url: None,
        }
    }
}

impl From<&crate::config::Settings> for CacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            enabled: settings.cache.enabled,
            backend: settings.cache.backend,
            ttl: settings.cache.ttl,
            namespace: settings.cache.namespace.clone(),
            max_page_size: settings.cache.max_page_size.get(),
            redis_url: Some(settings.redis.connection_url()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, CacheBackendKind::Memory);
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert_eq!(config.namespace, "scribe:");
        assert_eq!(config.max_page_size, 100);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn namespace_always_ends_with_delimiter() {
        assert_eq!(namespace_with_delimiter("scribe"), "scribe:");
        assert_eq!(namespace_with_delimiter(" scribe: "), "scribe:");
        assert_eq!(namespace_with_delimiter("tenant:a:"), "tenant:a:");
    }

    #[test]
    fn backend_kind_deserializes_snake_case() {
        let kind: CacheBackendKind =
            serde_json::from_str("\"redis\"").expect("known backend kind");
        assert_eq!(kind, CacheBackendKind::Redis);
        assert!(serde_json::from_str::<CacheBackendKind>("\"memcached\"").is_err());
    }
}
