//! Shared menu cache backed by Redis.
//!
//! Connection and command failures are logged and treated as a miss, so a
//! Redis outage degrades to rebuilding the menu on every request.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use tracing::{debug, warn};

use super::CacheStore;

/// Menu cache shared across processes through Redis.
#[derive(Clone)]
pub struct RedisCacheStore {
    redis: RedisClient,
}

impl RedisCacheStore {
    /// Create a store from a Redis client.
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    /// Open a store from a connection URL.
    pub fn open(url: &str) -> anyhow::Result<Self> {
        let client = RedisClient::open(url)
            .map_err(|e| anyhow::anyhow!("invalid Redis URL '{url}': {e}"))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to get Redis connection for menu cache");
                return None;
            }
        };

        match conn.get::<_, Option<String>>(key).await {
            Ok(val) => {
                if val.is_some() {
                    debug!(key = %key, "menu cache hit");
                }
                val
            }
            Err(e) => {
                warn!(error = %e, key = %key, "failed to read menu cache value from Redis");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let Ok(mut conn) = self.redis.get_multiplexed_async_connection().await else {
            warn!("failed to get Redis connection for menu cache set");
            return;
        };

        let result = if ttl_secs > 0 {
            conn.set_ex::<_, _, ()>(key, value, ttl_secs).await
        } else {
            conn.set::<_, _, ()>(key, value).await
        };

        if let Err(e) = result {
            warn!(error = %e, key = %key, "failed to set menu cache value in Redis");
            return;
        }

        debug!(key = %key, ttl = ttl_secs, "menu cache set");
    }

    async fn delete_many(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }

        let Ok(mut conn) = self.redis.get_multiplexed_async_connection().await else {
            warn!("failed to get Redis connection for menu cache delete");
            return;
        };

        if let Err(e) = conn.del::<_, ()>(keys).await {
            warn!(error = %e, "failed to delete menu cache keys from Redis");
            return;
        }

        debug!(keys = keys.len(), "menu cache keys deleted");
    }
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore").finish()
    }
}
