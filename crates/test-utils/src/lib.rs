//! Menu engine test utilities.
//!
//! Helpers for integration testing: node fixtures, instrumented sources,
//! and an in-memory pool whose stores can be inspected.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cms_menus::cache::MokaCacheStore;
use cms_menus::models::MemoryCacheKeyStore;
use cms_menus::services::{FixedSite, PrefixLanguages};
use cms_menus::{
    MenuConfig, MenuPool, MenuRequest, MenuServices, NavigationNode, NodeSource, SiteId,
    SourceError, Toolbar, UserContext,
};

/// Create a root node whose url is derived from its id.
pub fn test_node(id: &str) -> NavigationNode {
    NavigationNode::new(id, id.to_uppercase(), format!("/{id}/"))
}

/// Create a child node whose url is derived from its id.
pub fn test_child(id: &str, parent: &str) -> NavigationNode {
    test_node(id).with_parent(parent)
}

/// Create an anonymous request.
pub fn anonymous_request(path: &str) -> MenuRequest {
    MenuRequest::new(path)
}

/// Create a request from an authenticated user.
pub fn user_request(path: &str, user_id: &str) -> MenuRequest {
    MenuRequest::new(path).with_user(UserContext::authenticated(user_id))
}

/// Toolbar for a staff member in edit mode.
pub fn staff_edit_toolbar() -> Toolbar {
    Toolbar {
        edit_mode_active: true,
        preview_mode_active: false,
        is_staff: true,
    }
}

/// A plain source that counts how often it was asked for nodes.
#[derive(Debug, Clone)]
pub struct CountingSource {
    nodes: Vec<NavigationNode>,
    calls: Arc<AtomicUsize>,
}

impl CountingSource {
    /// Create a source serving `nodes`.
    pub fn new(nodes: Vec<NavigationNode>) -> Self {
        Self {
            nodes,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter (survives registering the source).
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl NodeSource for CountingSource {
    fn label(&self) -> &str {
        "Counting"
    }

    async fn get_nodes(&self, _request: &MenuRequest) -> Result<Vec<NavigationNode>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nodes.clone())
    }
}

/// A source that always fails to resolve its target.
#[derive(Debug, Clone)]
pub struct FailingSource {
    target: String,
}

impl FailingSource {
    /// Create a source failing on `target`.
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
        }
    }
}

#[async_trait]
impl NodeSource for FailingSource {
    fn label(&self) -> &str {
        "Failing"
    }

    async fn get_nodes(&self, _request: &MenuRequest) -> Result<Vec<NavigationNode>, SourceError> {
        Err(SourceError::no_reverse_match(self.target.clone()))
    }
}

/// A pool on in-memory stores, with handles to inspect them.
pub struct TestEnv {
    pub pool: MenuPool,
    pub cache: Arc<MokaCacheStore>,
    pub keys: Arc<MemoryCacheKeyStore>,
}

/// Create a test environment for one site and the given languages.
///
/// The first language is the site default; language-prefixed routing is on.
pub fn test_env(site: SiteId, languages: &[&str]) -> TestEnv {
    let config = MenuConfig {
        cache_prefix: "test_".to_string(),
        ..MenuConfig::default()
    };
    let cache = Arc::new(MokaCacheStore::new(config.l1_max_capacity));
    let keys = Arc::new(MemoryCacheKeyStore::new());

    let services = MenuServices {
        config,
        sites: Arc::new(FixedSite(site)),
        languages: Arc::new(PrefixLanguages::new(
            languages.iter().map(|l| l.to_string()).collect(),
        )),
        cache: Arc::clone(&cache) as _,
        keys: Arc::clone(&keys) as _,
    };

    TestEnv {
        pool: MenuPool::new(services),
        cache,
        keys,
    }
}

/// Assertion helpers for rendered menus.
pub mod assert {
    use cms_menus::RenderedMenu;

    /// Ids of the rendered nodes, in order.
    pub fn ids(menu: &RenderedMenu) -> Vec<String> {
        menu.iter().map(|n| n.id.clone()).collect()
    }

    /// Assert that a rendered menu contains a node.
    pub fn has_node(menu: &RenderedMenu, namespace: &str, id: &str) {
        assert!(
            menu.find(namespace, id).is_some(),
            "Expected menu to contain '{namespace}/{id}', got: {:?}",
            ids(menu)
        );
    }

    /// Assert that a rendered menu does not contain a node.
    pub fn lacks_node(menu: &RenderedMenu, namespace: &str, id: &str) {
        assert!(
            menu.find(namespace, id).is_none(),
            "Expected menu to NOT contain '{namespace}/{id}', got: {:?}",
            ids(menu)
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builders() {
        let node = test_child("team", "about");
        assert_eq!(node.title, "TEAM");
        assert_eq!(node.url, "/team/");
        assert_eq!(node.parent_id.as_deref(), Some("about"));
    }

    #[test]
    fn user_request_is_authenticated() {
        assert!(user_request("/", "5").is_authenticated());
        assert!(!anonymous_request("/").is_authenticated());
    }

    #[tokio::test]
    async fn counting_source_counts() {
        let source = CountingSource::new(vec![test_node("a")]);
        let counter = source.counter();
        source.get_nodes(&anonymous_request("/")).await.unwrap();
        source.get_nodes(&anonymous_request("/")).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_source_fails() {
        let err = FailingSource::new("blog:index")
            .get_nodes(&anonymous_request("/"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NoReverseMatch { .. }));
    }
}
