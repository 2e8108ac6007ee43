use std::time::Duration;

use deadpool_redis::Pool;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::key::CacheKey;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Cache value serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Shared handle to the Redis pool, passed by value into every handler
/// that caches. All values are stored as JSON strings under typed keys.
#[derive(Clone)]
pub struct CacheConnect {
    pool: Pool,
}

impl CacheConnect {
    pub fn new(pool: Pool) -> Self { Self { pool } }

    pub async fn try_get<K>(
        &self, key: &K, args: K::Args<'_>,
    ) -> Result<Option<K::Value>, CacheError>
    where
        K: CacheKey,
    {
        let key = key.key_with_args(args);
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(key.as_ref())
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_with_expire<K>(
        &self, key: &K, args: K::Args<'_>, value: &K::Value, ttl: Duration,
    ) -> Result<(), CacheError>
    where
        K: CacheKey,
    {
        let key = key.key_with_args(args);
        let raw = serde_json::to_string(value)?;
        let mut conn = self.pool.get().await?;
        redis::cmd("SET")
            .arg(key.as_ref())
            .arg(raw)
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    /// Sweep every key under `prefix` with a cursored SCAN + DEL. Used by
    /// write-path invalidation, where the key family is known but the
    /// individual entries are not.
    #[instrument(skip(self))]
    pub async fn delete_by_prefix(
        &self, prefix: &str,
    ) -> Result<u64, CacheError> {
        let pattern = format!("{prefix}*");
        let mut conn = self.pool.get().await?;
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let removed: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await?;
                deleted += removed;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(prefix = %pattern, deleted, "cache prefix sweep");
        Ok(deleted)
    }
}
