//! Fast cache for assembled menu trees.
//!
//! The payload store is keyed by strings built with [`menu_cache_key`]. It is
//! only trusted together with the persisted key index in
//! [`models::cache_key`](crate::models::cache_key).

mod memory;
mod redis_store;

pub use memory::MokaCacheStore;
pub use redis_store::RedisCacheStore;

use async_trait::async_trait;

use crate::services::SiteId;

/// Key-value store holding serialized menu trees.
///
/// Implementations swallow their own I/O failures (logging them) so that a
/// broken cache only costs a rebuild.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value, if present and not expired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value for `ttl_secs` seconds (0 = no expiry).
    async fn set(&self, key: &str, value: &str, ttl_secs: u64);

    /// Delete a batch of keys.
    async fn delete_many(&self, keys: &[String]);
}

/// Build the cache key for a menu tree.
///
/// Anonymous visitors share one entry per language and site; authenticated
/// users get a private entry. Edit/preview rendering never shares an entry
/// with public rendering.
pub fn menu_cache_key(
    prefix: &str,
    language: &str,
    site: SiteId,
    user_id: Option<&str>,
    edit_or_preview: bool,
) -> String {
    let mut key = format!("{prefix}menu_nodes_{language}_{site}");

    if let Some(user) = user_id {
        key.push_str(&format!("_{user}_user"));
    }

    if edit_or_preview {
        key.push_str(":edit");
    } else {
        key.push_str(":public");
    }

    key
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_public_key() {
        assert_eq!(
            menu_cache_key("cms_", "en", 1, None, false),
            "cms_menu_nodes_en_1:public"
        );
    }

    #[test]
    fn authenticated_edit_key() {
        assert_eq!(
            menu_cache_key("cms_", "de", 2, Some("42"), true),
            "cms_menu_nodes_de_2_42_user:edit"
        );
    }

    #[test]
    fn dimensions_produce_distinct_keys() {
        let base = menu_cache_key("p_", "en", 1, None, false);
        assert_ne!(base, menu_cache_key("p_", "fr", 1, None, false));
        assert_ne!(base, menu_cache_key("p_", "en", 2, None, false));
        assert_ne!(base, menu_cache_key("p_", "en", 1, Some("7"), false));
        assert_ne!(base, menu_cache_key("p_", "en", 1, None, true));
        assert_eq!(base, menu_cache_key("p_", "en", 1, None, false));
    }
}
