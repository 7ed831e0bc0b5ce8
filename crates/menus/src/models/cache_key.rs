//! Persisted index of live menu cache keys.
//!
//! The fast cache may be shared by many processes and cannot be enumerated
//! cheaply, so every key written there is also recorded here together with
//! its language and site. Invalidation by site/language reads the matching
//! keys from this index, and a cached tree is only trusted while its record
//! still exists.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::services::SiteId;

/// Cache key record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CacheKeyRecord {
    /// Fast-cache key.
    pub key: String,

    /// Language the tree was built for.
    pub language: String,

    /// Site the tree was built for.
    pub site: SiteId,

    /// Unix timestamp when created.
    pub created: i64,
}

/// Store for [`CacheKeyRecord`]s.
///
/// `None` filters match any value.
#[async_trait]
pub trait CacheKeyStore: Send + Sync {
    /// Record a key.
    async fn create(&self, key: &str, language: &str, site: SiteId) -> Result<()>;

    /// Check if a record for exactly this key, language and site exists.
    async fn exists(&self, key: &str, language: &str, site: SiteId) -> Result<bool>;

    /// Distinct keys of matching records, sorted.
    async fn keys(&self, site: Option<SiteId>, language: Option<&str>) -> Result<Vec<String>>;

    /// Delete matching records, returning how many were removed.
    async fn delete(&self, site: Option<SiteId>, language: Option<&str>) -> Result<u64>;
}

fn matches(record: &CacheKeyRecord, site: Option<SiteId>, language: Option<&str>) -> bool {
    site.is_none_or(|s| record.site == s) && language.is_none_or(|l| record.language == l)
}

/// In-memory key index for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryCacheKeyStore {
    records: DashMap<(String, String, SiteId), CacheKeyRecord>,
}

impl MemoryCacheKeyStore {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CacheKeyStore for MemoryCacheKeyStore {
    async fn create(&self, key: &str, language: &str, site: SiteId) -> Result<()> {
        let record = CacheKeyRecord {
            key: key.to_string(),
            language: language.to_string(),
            site,
            created: chrono::Utc::now().timestamp(),
        };
        self.records
            .insert((key.to_string(), language.to_string(), site), record);
        Ok(())
    }

    async fn exists(&self, key: &str, language: &str, site: SiteId) -> Result<bool> {
        Ok(self
            .records
            .contains_key(&(key.to_string(), language.to_string(), site)))
    }

    async fn keys(&self, site: Option<SiteId>, language: Option<&str>) -> Result<Vec<String>> {
        let keys: BTreeSet<String> = self
            .records
            .iter()
            .filter(|r| matches(r.value(), site, language))
            .map(|r| r.value().key.clone())
            .collect();
        Ok(keys.into_iter().collect())
    }

    async fn delete(&self, site: Option<SiteId>, language: Option<&str>) -> Result<u64> {
        let before = self.records.len();
        self.records.retain(|_, r| !matches(r, site, language));
        Ok((before - self.records.len()) as u64)
    }
}

/// PostgreSQL-backed key index shared by every process.
#[derive(Debug, Clone)]
pub struct PgCacheKeyStore {
    pool: PgPool,
}

impl PgCacheKeyStore {
    /// Create a store on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `menu_cache_key` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS menu_cache_key (
                key TEXT NOT NULL,
                language VARCHAR(12) NOT NULL,
                site BIGINT NOT NULL,
                created BIGINT NOT NULL,
                PRIMARY KEY (key, language, site)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create menu_cache_key table")?;

        Ok(())
    }

    /// List matching records, oldest first.
    pub async fn list(
        &self,
        site: Option<SiteId>,
        language: Option<&str>,
    ) -> Result<Vec<CacheKeyRecord>> {
        let records = sqlx::query_as::<_, CacheKeyRecord>(
            r#"
            SELECT key, language, site, created
            FROM menu_cache_key
            WHERE ($1::BIGINT IS NULL OR site = $1)
              AND ($2::TEXT IS NULL OR language = $2)
            ORDER BY created ASC, key ASC
            "#,
        )
        .bind(site)
        .bind(language)
        .fetch_all(&self.pool)
        .await
        .context("failed to list menu cache keys")?;

        Ok(records)
    }
}

#[async_trait]
impl CacheKeyStore for PgCacheKeyStore {
    async fn create(&self, key: &str, language: &str, site: SiteId) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO menu_cache_key (key, language, site, created)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key, language, site) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(language)
        .bind(site)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to create menu cache key")?;

        Ok(())
    }

    async fn exists(&self, key: &str, language: &str, site: SiteId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM menu_cache_key
                WHERE key = $1 AND language = $2 AND site = $3
            )
            "#,
        )
        .bind(key)
        .bind(language)
        .bind(site)
        .fetch_one(&self.pool)
        .await
        .context("failed to look up menu cache key")?;

        Ok(exists)
    }

    async fn keys(&self, site: Option<SiteId>, language: Option<&str>) -> Result<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT key
            FROM menu_cache_key
            WHERE ($1::BIGINT IS NULL OR site = $1)
              AND ($2::TEXT IS NULL OR language = $2)
            ORDER BY key
            "#,
        )
        .bind(site)
        .bind(language)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch menu cache keys")?;

        Ok(keys)
    }

    async fn delete(&self, site: Option<SiteId>, language: Option<&str>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM menu_cache_key
            WHERE ($1::BIGINT IS NULL OR site = $1)
              AND ($2::TEXT IS NULL OR language = $2)
            "#,
        )
        .bind(site)
        .bind(language)
        .execute(&self.pool)
        .await
        .context("failed to delete menu cache keys")?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_is_idempotent() {
        let store = MemoryCacheKeyStore::new();
        store.create("k", "en", 1).await.unwrap();
        store.create("k", "en", 1).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.exists("k", "en", 1).await.unwrap());
        assert!(!store.exists("k", "fr", 1).await.unwrap());
        assert!(!store.exists("k", "en", 2).await.unwrap());
    }

    #[tokio::test]
    async fn keys_and_delete_respect_filters() {
        let store = MemoryCacheKeyStore::new();
        store.create("en-1", "en", 1).await.unwrap();
        store.create("fr-1", "fr", 1).await.unwrap();
        store.create("en-2", "en", 2).await.unwrap();

        assert_eq!(store.keys(Some(1), Some("en")).await.unwrap(), vec!["en-1"]);
        assert_eq!(store.keys(None, Some("en")).await.unwrap(), vec!["en-1", "en-2"]);
        assert_eq!(store.keys(Some(1), None).await.unwrap(), vec!["en-1", "fr-1"]);
        assert_eq!(store.keys(None, None).await.unwrap().len(), 3);

        assert_eq!(store.delete(Some(1), Some("en")).await.unwrap(), 1);
        assert!(store.exists("fr-1", "fr", 1).await.unwrap());
        assert!(store.exists("en-2", "en", 2).await.unwrap());

        assert_eq!(store.delete(None, None).await.unwrap(), 2);
        assert!(store.is_empty());
    }
}
