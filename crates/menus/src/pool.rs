//! Process-wide menu pool.
//!
//! The pool holds the registered sources and modifiers and hands out a
//! [`MenuRenderer`] per request. Discovery (running the registered discovery
//! hooks and installing the default modifiers) happens at most once, in
//! [`MenuPool::initialize`].

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{MenuError, MenuResult};
use crate::modifier::{AuthVisibility, Modifier};
use crate::node::NodeId;
use crate::renderer::MenuRenderer;
use crate::request::MenuRequest;
use crate::services::{MenuServices, SiteId};
use crate::source::{BoundSource, MenuSource};
use crate::tree::MenuTree;

/// Callback run once during discovery to register sources and modifiers.
///
/// Hooks must not call [`MenuPool::initialize`] or
/// [`MenuPool::add_discovery_hook`] themselves.
pub type DiscoveryHook = Box<dyn Fn(&MenuPool) -> MenuResult<()> + Send + Sync>;

/// Registry of menu sources and modifiers.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct MenuPool {
    inner: Arc<MenuPoolInner>,
}

struct MenuPoolInner {
    services: MenuServices,
    sources: RwLock<IndexMap<String, MenuSource>>,
    modifiers: RwLock<Vec<Arc<dyn Modifier>>>,
    hooks: Mutex<Vec<DiscoveryHook>>,
    discovered: Mutex<bool>,
}

impl MenuPool {
    /// Create an empty pool.
    pub fn new(services: MenuServices) -> Self {
        Self {
            inner: Arc::new(MenuPoolInner {
                services,
                sources: RwLock::new(IndexMap::new()),
                modifiers: RwLock::new(Vec::new()),
                hooks: Mutex::new(Vec::new()),
                discovered: Mutex::new(false),
            }),
        }
    }

    /// Shared collaborators.
    pub fn services(&self) -> &MenuServices {
        &self.inner.services
    }

    /// Add a hook to run during discovery.
    pub fn add_discovery_hook(&self, hook: DiscoveryHook) {
        self.inner.hooks.lock().push(hook);
    }

    /// Run discovery once.
    ///
    /// Concurrent callers wait for the first one; later calls are no-ops. A
    /// failing hook leaves the pool undiscovered so the error resurfaces on
    /// the next call.
    pub fn initialize(&self) -> MenuResult<()> {
        let mut discovered = self.inner.discovered.lock();
        if *discovered {
            return Ok(());
        }

        {
            let hooks = self.inner.hooks.lock();
            for hook in hooks.iter() {
                hook(self)?;
            }
        }

        self.register_modifier(Arc::new(AuthVisibility));
        *discovered = true;

        info!(
            sources = self.inner.sources.read().len(),
            modifiers = self.inner.modifiers.read().len(),
            "menu pool initialized"
        );
        Ok(())
    }

    /// Whether discovery has run.
    pub fn is_initialized(&self) -> bool {
        *self.inner.discovered.lock()
    }

    /// Register a source under a unique name.
    ///
    /// The name becomes the namespace of the source's nodes. It must be
    /// non-empty and must not contain `:`, which separates attachment ids.
    pub fn register_source(&self, name: impl Into<String>, source: MenuSource) -> MenuResult<()> {
        let name = name.into();

        if name.is_empty() || name.contains(':') {
            return Err(MenuError::InvalidSource {
                reason: "name must be non-empty and must not contain ':'".to_string(),
                name,
            });
        }

        let mut sources = self.inner.sources.write();
        if sources.contains_key(&name) {
            return Err(MenuError::DuplicateRegistration { name });
        }

        debug!(name = %name, source = ?source, "registered menu source");
        sources.insert(name, source);
        Ok(())
    }

    /// Register a modifier. Registering the same name twice is a no-op.
    pub fn register_modifier(&self, modifier: Arc<dyn Modifier>) {
        let mut modifiers = self.inner.modifiers.write();
        if modifiers.iter().any(|m| m.name() == modifier.name()) {
            return;
        }
        debug!(name = %modifier.name(), "registered menu modifier");
        modifiers.push(modifier);
    }

    /// Registered modifiers in registration order.
    pub fn modifiers(&self) -> Vec<Arc<dyn Modifier>> {
        self.inner.modifiers.read().clone()
    }

    /// Names of registered sources in registration order.
    pub fn source_names(&self) -> Vec<String> {
        self.inner.sources.read().keys().cloned().collect()
    }

    /// Resolve registered sources into bound sources.
    ///
    /// Attachable sources expand into one bound source per live instance,
    /// namespaced `"{name}:{instance id}"`. Without instances they are
    /// listed once under their bare name unless `for_rendering` is set.
    pub async fn registered_sources(&self, for_rendering: bool) -> Vec<BoundSource> {
        let sources: Vec<(String, MenuSource)> = self
            .inner
            .sources
            .read()
            .iter()
            .map(|(name, source)| (name.clone(), source.clone()))
            .collect();

        let mut bound = Vec::with_capacity(sources.len());

        for (name, source) in sources {
            match &source {
                MenuSource::Plain(_) => bound.push(BoundSource::unbound(name, source)),
                MenuSource::Attachable(attachable) => {
                    let instances = attachable.instances().await;
                    if instances.is_empty() {
                        if !for_rendering {
                            bound.push(BoundSource::unbound(name, source.clone()));
                        }
                        continue;
                    }
                    let bind = BoundSource::attach_factory(&name, attachable);
                    bound.extend(instances.into_iter().map(bind));
                }
            }
        }

        bound
    }

    /// Initialize the pool and create a renderer for a request.
    pub async fn renderer(&self, request: MenuRequest) -> MenuResult<MenuRenderer> {
        self.initialize()?;
        Ok(MenuRenderer::new(self.clone(), request).await)
    }

    /// Invalidate cached trees for a site and/or language.
    ///
    /// `None` filters match everything; `all` ignores both filters. Returns
    /// the number of cache keys deleted. Store failures are logged and leave
    /// the cache untouched.
    pub async fn clear(&self, site: Option<SiteId>, language: Option<&str>, all: bool) -> usize {
        let services = &self.inner.services;
        let (site, language) = if all { (None, None) } else { (site, language) };

        let keys = match services.keys.keys(site, language).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "failed to list menu cache keys for invalidation");
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        services.cache.delete_many(&keys).await;
        if let Err(e) = services.keys.delete(site, language).await {
            warn!(error = %e, "failed to delete menu cache key records");
        }

        info!(
            site = ?site,
            language = ?language,
            keys = keys.len(),
            "menu cache cleared"
        );
        keys.len()
    }

    /// Sources whose attribute `name` equals `value`, as sorted
    /// `(source name, label)` pairs without duplicates.
    pub async fn menus_by_attribute(&self, name: &str, value: &Value) -> Vec<(String, String)> {
        let found: BTreeSet<(String, String)> = self
            .registered_sources(false)
            .await
            .into_iter()
            .filter(|bound| bound.source().attribute(name).as_ref() == Some(value))
            .map(|bound| (bound.name().to_string(), bound.source().label().to_string()))
            .collect();
        found.into_iter().collect()
    }

    /// Nodes whose attribute `name` equals `value`.
    pub fn nodes_by_attribute(
        &self,
        tree: &MenuTree,
        nodes: &[NodeId],
        name: &str,
        value: &Value,
    ) -> Vec<NodeId> {
        tree.nodes_by_attribute(nodes, name, value)
    }
}

impl std::fmt::Debug for MenuPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuPool")
            .field("sources", &self.source_names())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::MenuConfig;
    use crate::modifier::{LevelLimit, ModifyOptions};
    use crate::node::NavigationNode;
    use crate::services::{FixedSite, PrefixLanguages};
    use crate::source::{StaticAttachedSource, StaticSource};

    fn pool() -> MenuPool {
        let services = MenuServices::in_memory(
            MenuConfig::default(),
            Arc::new(FixedSite(1)),
            Arc::new(PrefixLanguages::new(vec!["en".to_string()])),
        );
        MenuPool::new(services)
    }

    fn pages() -> MenuSource {
        MenuSource::plain(StaticSource::new(
            "Pages",
            vec![NavigationNode::new("home", "Home", "/")],
        ))
    }

    fn blog(instances: &[&str]) -> MenuSource {
        MenuSource::attachable(StaticAttachedSource::new(
            "Blog",
            instances
                .iter()
                .map(|id| (id.to_string(), Vec::new()))
                .collect(),
        ))
    }

    #[test]
    fn duplicate_source_name_is_rejected() {
        let pool = pool();
        pool.register_source("Pages", pages()).unwrap();
        let err = pool.register_source("Pages", pages()).unwrap_err();
        assert!(matches!(err, MenuError::DuplicateRegistration { ref name } if name == "Pages"));
    }

    #[test]
    fn reserved_names_are_rejected() {
        let pool = pool();
        assert!(matches!(
            pool.register_source("", pages()),
            Err(MenuError::InvalidSource { .. })
        ));
        assert!(matches!(
            pool.register_source("Blog:1", pages()),
            Err(MenuError::InvalidSource { .. })
        ));
    }

    #[test]
    fn modifier_registration_is_idempotent_and_ordered() {
        let pool = pool();
        pool.register_modifier(Arc::new(LevelLimit::new(1)));
        pool.register_modifier(Arc::new(AuthVisibility));
        pool.register_modifier(Arc::new(LevelLimit::new(3)));

        let names: Vec<String> = pool.modifiers().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["level_limit", "auth_visibility"]);
    }

    #[test]
    fn initialize_runs_hooks_once() {
        let pool = pool();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        pool.add_discovery_hook(Box::new(move |pool: &MenuPool| -> MenuResult<()> {
            *counter.lock() += 1;
            pool.register_source("Pages", pages())
        }));

        pool.initialize().unwrap();
        pool.initialize().unwrap();

        assert_eq!(*calls.lock(), 1);
        assert!(pool.is_initialized());
        assert_eq!(pool.source_names(), vec!["Pages"]);
        assert_eq!(pool.modifiers().len(), 1);
    }

    #[test]
    fn failing_hook_leaves_pool_undiscovered() {
        let pool = pool();
        pool.register_source("Pages", pages()).unwrap();
        pool.add_discovery_hook(Box::new(|pool: &MenuPool| -> MenuResult<()> {
            pool.register_source("Pages", pages())
        }));

        assert!(pool.initialize().is_err());
        assert!(!pool.is_initialized());
    }

    #[test]
    fn concurrent_initialize_is_safe() {
        let pool = pool();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        pool.add_discovery_hook(Box::new(move |_: &MenuPool| -> MenuResult<()> {
            *counter.lock() += 1;
            Ok(())
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || pool.initialize())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(*calls.lock(), 1);
    }

    #[tokio::test]
    async fn attachable_sources_expand_per_instance() {
        let pool = pool();
        pool.register_source("Pages", pages()).unwrap();
        pool.register_source("Blog", blog(&["4", "9"])).unwrap();
        pool.register_source("Shop", blog(&[])).unwrap();

        let rendering: Vec<String> = pool
            .registered_sources(true)
            .await
            .iter()
            .map(|s| s.namespace().to_string())
            .collect();
        assert_eq!(rendering, vec!["Pages", "Blog:4", "Blog:9"]);

        let listing: Vec<String> = pool
            .registered_sources(false)
            .await
            .iter()
            .map(|s| s.namespace().to_string())
            .collect();
        assert_eq!(listing, vec!["Pages", "Blog:4", "Blog:9", "Shop"]);
    }

    #[tokio::test]
    async fn menus_by_attribute_lists_each_source_once() {
        let pool = pool();
        pool.register_source(
            "Blog",
            MenuSource::attachable(
                StaticAttachedSource::new(
                    "Blog app",
                    vec![("1".to_string(), Vec::new()), ("2".to_string(), Vec::new())],
                )
                .with_attribute("cms_enabled", true),
            ),
        )
        .unwrap();
        pool.register_source("Pages", pages()).unwrap();

        let found = pool.menus_by_attribute("cms_enabled", &Value::Bool(true)).await;
        assert_eq!(found, vec![("Blog".to_string(), "Blog app".to_string())]);
    }

    #[tokio::test]
    async fn clear_only_touches_matching_site_and_language() {
        let pool = pool();
        let keys = &pool.services().keys;
        keys.create("k_en_1", "en", 1).await.unwrap();
        keys.create("k_en_2", "en", 2).await.unwrap();
        keys.create("k_de_1", "de", 1).await.unwrap();

        assert_eq!(pool.clear(Some(1), Some("en"), false).await, 1);
        assert!(!keys.exists("k_en_1", "en", 1).await.unwrap());
        assert!(keys.exists("k_en_2", "en", 2).await.unwrap());
        assert!(keys.exists("k_de_1", "de", 1).await.unwrap());

        assert_eq!(pool.clear(Some(2), None, false).await, 1);
        assert_eq!(pool.clear(None, None, true).await, 1);
        assert!(keys.keys(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn renderer_initializes_pool() {
        let pool = pool();
        pool.register_source("Pages", pages()).unwrap();

        let renderer = pool.renderer(MenuRequest::new("/")).await.unwrap();
        assert!(pool.is_initialized());

        let menu = renderer.get_nodes(None, None, false).await;
        assert_eq!(menu.len(), 1);
        let mut tree = menu.tree.clone();
        let nodes = renderer.apply_modifiers(&mut tree, menu.nodes.clone(), &ModifyOptions::default());
        assert_eq!(nodes, menu.nodes);
    }
}
