//! Redis-backed cache storage.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::debug;

use super::store::{BackendError, CacheBackend};

const SCAN_BATCH: usize = 500;

/// Shared Redis backend. Expiry is delegated to Redis (`SET ... EX`).
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Builds a lazily connecting pool; the first command reports connection failures.
    pub fn connect(url: &str) -> Result<Self, BackendError> {
        let pool = PoolConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(BackendError::unavailable)?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<Connection, BackendError> {
        self.pool.get().await.map_err(BackendError::unavailable)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(BackendError::command)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> Result<(), BackendError> {
        // Redis rejects EX 0; sub-second TTLs round up to one second.
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, payload.as_ref(), seconds)
            .await
            .map_err(BackendError::command)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, BackendError> {
        let pattern = format!("{prefix}*");
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(BackendError::command)?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(&keys).await.map_err(BackendError::command)?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = %pattern, removed, "Deleted cached keys from redis");
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(BackendError::command)
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}
