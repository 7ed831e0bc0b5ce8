//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Default prefix prepended to every menu cache key.
const DEFAULT_CACHE_PREFIX: &str = "cms_";

/// Default lifetime of a cached menu tree (1 hour).
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default capacity of the in-process fast cache.
const DEFAULT_L1_MAX_CAPACITY: u64 = 10_000;

/// Menu engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuConfig {
    /// Prefix for menu cache keys (default: "cms_").
    pub cache_prefix: String,

    /// Lifetime of cached menu trees in seconds (default: 3600, 0 = no expiry).
    pub cache_ttl_secs: u64,

    /// Maximum number of entries kept in the in-process cache (default: 10000).
    pub l1_max_capacity: u64,

    /// Redis connection URL. When None, only the in-process cache is used.
    pub redis_url: Option<String>,

    /// PostgreSQL connection URL. When None, the cache key index lives in memory.
    pub database_url: Option<String>,
}

impl MenuConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cache_prefix =
            env::var("MENU_CACHE_PREFIX").unwrap_or_else(|_| DEFAULT_CACHE_PREFIX.to_string());

        let cache_ttl_secs = env::var("MENU_CACHE_TTL")
            .unwrap_or_else(|_| DEFAULT_CACHE_TTL_SECS.to_string())
            .parse()
            .context("MENU_CACHE_TTL must be a valid u64")?;

        let l1_max_capacity = env::var("MENU_L1_MAX_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_L1_MAX_CAPACITY.to_string())
            .parse()
            .context("MENU_L1_MAX_CAPACITY must be a valid u64")?;

        let redis_url = env::var("REDIS_URL").ok().filter(|v| !v.is_empty());
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        Ok(Self {
            cache_prefix,
            cache_ttl_secs,
            l1_max_capacity,
            redis_url,
            database_url,
        })
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            l1_max_capacity: DEFAULT_L1_MAX_CAPACITY,
            redis_url: None,
            database_url: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = MenuConfig::default();
        assert_eq!(config.cache_prefix, "cms_");
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.l1_max_capacity, 10_000);
        assert!(config.redis_url.is_none());
        assert!(config.database_url.is_none());
    }
}
