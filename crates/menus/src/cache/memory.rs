//! In-process menu cache backed by Moka.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

use super::CacheStore;

/// Cached value with its own lifetime.
#[derive(Clone)]
struct Entry {
    value: Arc<str>,
    ttl: Option<Duration>,
}

/// Per-entry expiry: each `set` carries its own TTL.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// Per-process fast cache.
///
/// Suitable on its own for single-process deployments and tests; shared
/// deployments use [`RedisCacheStore`](super::RedisCacheStore).
#[derive(Clone)]
pub struct MokaCacheStore {
    local: Cache<String, Entry>,
}

impl MokaCacheStore {
    /// Create a cache holding at most `max_capacity` trees.
    pub fn new(max_capacity: u64) -> Self {
        let local = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();

        Self { local }
    }

    /// Number of live entries (approximate until pending tasks run).
    pub async fn entry_count(&self) -> u64 {
        self.local.run_pending_tasks().await;
        self.local.entry_count()
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let entry = self.local.get(key).await?;
        debug!(key = %key, "menu cache hit");
        Some(entry.value.to_string())
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs));
        let entry = Entry {
            value: Arc::from(value),
            ttl,
        };
        self.local.insert(key.to_string(), entry).await;
        debug!(key = %key, ttl = ttl_secs, "menu cache set");
    }

    async fn delete_many(&self, keys: &[String]) {
        for key in keys {
            self.local.invalidate(key).await;
        }
        debug!(keys = keys.len(), "menu cache keys deleted");
    }
}

impl std::fmt::Debug for MokaCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheStore").finish()
    }
}
