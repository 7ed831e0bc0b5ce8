//! Collaborators the menu engine consumes.
//!
//! Site and language resolution come from the surrounding CMS; the cache
//! store and key index are shared infrastructure. [`MenuServices`] bundles
//! them so the pool and every renderer see the same instances.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::cache::{CacheStore, MokaCacheStore, RedisCacheStore};
use crate::config::MenuConfig;
use crate::models::{CacheKeyStore, MemoryCacheKeyStore, PgCacheKeyStore};
use crate::request::MenuRequest;

/// Site identifier.
pub type SiteId = i64;

/// Resolves the site a request belongs to.
pub trait SiteResolver: Send + Sync {
    /// The current site.
    fn current_site(&self, request: &MenuRequest) -> SiteId;
}

/// Resolves the active language.
pub trait LanguageResolver: Send + Sync {
    /// Language encoded in the request (usually the path prefix), if any.
    fn language_from_request(&self, request: &MenuRequest) -> Option<String>;

    /// Default language of a site.
    fn default_language_for_site(&self, site: SiteId) -> String;

    /// Whether URLs carry a language prefix.
    fn prefix_patterns_used(&self) -> bool;
}

/// A single-site installation.
#[derive(Debug, Clone, Copy)]
pub struct FixedSite(pub SiteId);

impl SiteResolver for FixedSite {
    fn current_site(&self, _request: &MenuRequest) -> SiteId {
        self.0
    }
}

/// Language resolution from a `/{language}/...` path prefix.
#[derive(Debug, Clone)]
pub struct PrefixLanguages {
    languages: Vec<String>,
    site_defaults: HashMap<SiteId, String>,
    fallback: String,
    prefix_patterns: bool,
}

impl PrefixLanguages {
    /// Create a resolver for the given languages; the first is the fallback
    /// default for sites without an explicit one.
    pub fn new(languages: Vec<String>) -> Self {
        let fallback = languages.first().cloned().unwrap_or_else(|| "en".to_string());
        Self {
            languages,
            site_defaults: HashMap::new(),
            fallback,
            prefix_patterns: true,
        }
    }

    /// Set the default language of a site.
    pub fn with_site_default(mut self, site: SiteId, language: impl Into<String>) -> Self {
        self.site_defaults.insert(site, language.into());
        self
    }

    /// Turn language-prefixed routing on or off.
    pub fn with_prefix_patterns(mut self, enabled: bool) -> Self {
        self.prefix_patterns = enabled;
        self
    }
}

impl LanguageResolver for PrefixLanguages {
    fn language_from_request(&self, request: &MenuRequest) -> Option<String> {
        let first = request.path.trim_start_matches('/').split('/').next()?;
        self.languages.iter().find(|l| l.as_str() == first).cloned()
    }

    fn default_language_for_site(&self, site: SiteId) -> String {
        self.site_defaults
            .get(&site)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn prefix_patterns_used(&self) -> bool {
        self.prefix_patterns
    }
}

/// Shared collaborators of the menu pool and its renderers.
#[derive(Clone)]
pub struct MenuServices {
    /// Engine configuration.
    pub config: MenuConfig,
    /// Site resolution.
    pub sites: Arc<dyn SiteResolver>,
    /// Language resolution.
    pub languages: Arc<dyn LanguageResolver>,
    /// Fast cache for assembled trees.
    pub cache: Arc<dyn CacheStore>,
    /// Persisted index of live cache keys.
    pub keys: Arc<dyn CacheKeyStore>,
}

impl MenuServices {
    /// Build services with in-process cache and key index.
    pub fn in_memory(
        config: MenuConfig,
        sites: Arc<dyn SiteResolver>,
        languages: Arc<dyn LanguageResolver>,
    ) -> Self {
        let cache = Arc::new(MokaCacheStore::new(config.l1_max_capacity));
        Self {
            config,
            sites,
            languages,
            cache,
            keys: Arc::new(MemoryCacheKeyStore::new()),
        }
    }

    /// Build services from configuration.
    ///
    /// Uses Redis for the fast cache when `redis_url` is set and PostgreSQL
    /// for the key index when `database_url` is set; in-process stores
    /// otherwise.
    pub async fn connect(
        config: MenuConfig,
        sites: Arc<dyn SiteResolver>,
        languages: Arc<dyn LanguageResolver>,
    ) -> Result<Self> {
        let mut services = Self::in_memory(config, sites, languages);

        if let Some(url) = services.config.redis_url.as_deref() {
            services.cache = Arc::new(RedisCacheStore::open(url)?);
            info!("menu cache using Redis");
        }

        if let Some(url) = services.config.database_url.as_deref() {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .context("failed to connect to PostgreSQL")?;
            let store = PgCacheKeyStore::new(pool);
            store.ensure_schema().await?;
            services.keys = Arc::new(store);
            info!("menu cache key index using PostgreSQL");
        }

        Ok(services)
    }
}

impl std::fmt::Debug for MenuServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuServices")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn languages() -> PrefixLanguages {
        PrefixLanguages::new(vec!["en".to_string(), "de".to_string()])
    }

    #[test]
    fn language_from_path_prefix() {
        let resolver = languages();
        assert_eq!(
            resolver.language_from_request(&MenuRequest::new("/de/about/")),
            Some("de".to_string())
        );
        assert_eq!(resolver.language_from_request(&MenuRequest::new("/about/")), None);
        assert_eq!(resolver.language_from_request(&MenuRequest::new("/")), None);
    }

    #[test]
    fn site_default_overrides_fallback() {
        let resolver = languages().with_site_default(2, "de");
        assert_eq!(resolver.default_language_for_site(1), "en");
        assert_eq!(resolver.default_language_for_site(2), "de");
    }
}
