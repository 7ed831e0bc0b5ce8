//! Per-request menu rendering.
//!
//! A [`MenuRenderer`] is created for one request. It fixes the source list,
//! language, site and edit mode at construction so repeated `get_nodes`
//! calls within the request stay consistent even if the pool changes.
//!
//! Rendering: fetch the assembled tree from cache (or rebuild it from the
//! sources), mark selection relative to the request path, flatten, and run
//! the registered modifiers.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::cache::menu_cache_key;
use crate::error::SourceError;
use crate::modifier::ModifyOptions;
use crate::node::{NavigationNode, NodeId};
use crate::pool::MenuPool;
use crate::request::MenuRequest;
use crate::services::SiteId;
use crate::source::BoundSource;
use crate::tree::{MenuTree, NodeCollection, build_tree};

/// Result of [`MenuRenderer::get_nodes`].
#[derive(Debug, Clone)]
pub struct RenderedMenu {
    /// The decorated tree the node list points into.
    pub tree: MenuTree,
    /// Nodes in final order, after modifiers.
    pub nodes: Vec<NodeId>,
    /// Notices for staff viewers (e.g. a source that could not be loaded).
    pub notices: Vec<String>,
}

impl RenderedMenu {
    /// Iterate over the final nodes.
    pub fn iter(&self) -> impl Iterator<Item = &NavigationNode> {
        self.nodes.iter().filter_map(|&id| self.tree.node(id))
    }

    /// Number of final nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no nodes survived.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a final node by namespace and local id.
    pub fn find(&self, namespace: &str, id: &str) -> Option<&NavigationNode> {
        self.tree
            .find(namespace, id)
            .filter(|n| self.nodes.contains(n))
            .and_then(|n| self.tree.node(n))
    }
}

/// Request-scoped menu renderer.
pub struct MenuRenderer {
    pool: MenuPool,
    request: MenuRequest,
    sources: Vec<BoundSource>,
    language: String,
    site: SiteId,
    edit_or_preview: bool,
    is_cached: Mutex<Option<bool>>,
    selected: Mutex<Vec<NodeId>>,
}

impl MenuRenderer {
    /// Create a renderer for a request.
    ///
    /// The language comes from the request path when language-prefixed
    /// routing is active, otherwise from the site's default.
    pub async fn new(pool: MenuPool, request: MenuRequest) -> Self {
        let sources = pool.registered_sources(true).await;
        let services = pool.services();

        let site = services.sites.current_site(&request);
        let language = services
            .languages
            .prefix_patterns_used()
            .then(|| services.languages.language_from_request(&request))
            .flatten()
            .unwrap_or_else(|| services.languages.default_language_for_site(site));
        let edit_or_preview = request.edit_or_preview();

        Self {
            pool,
            request,
            sources,
            language,
            site,
            edit_or_preview,
            is_cached: Mutex::new(None),
            selected: Mutex::new(Vec::new()),
        }
    }

    /// The request being rendered.
    pub fn request(&self) -> &MenuRequest {
        &self.request
    }

    /// Resolved language.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Resolved site.
    pub fn site(&self) -> SiteId {
        self.site
    }

    /// Whether the request renders in edit or preview mode.
    pub fn edit_or_preview(&self) -> bool {
        self.edit_or_preview
    }

    /// Sources this renderer draws from, in registration order.
    pub fn sources(&self) -> &[BoundSource] {
        &self.sources
    }

    /// Get a source by namespace.
    pub fn get_menu(&self, namespace: &str) -> Option<&BoundSource> {
        self.sources.iter().find(|s| s.namespace() == namespace)
    }

    /// Nodes selected during the last marking pass.
    pub fn selected(&self) -> Vec<NodeId> {
        self.selected.lock().clone()
    }

    /// Cache key for this request's tree.
    pub fn cache_key(&self) -> String {
        let user = &self.request.user;
        menu_cache_key(
            &self.pool.services().config.cache_prefix,
            &self.language,
            self.site,
            user.authenticated.then_some(user.id.as_str()),
            self.edit_or_preview,
        )
    }

    /// Whether the key index holds a record for this request's key.
    ///
    /// Looked up once per renderer; a failing index counts as "not cached".
    pub async fn is_cached(&self) -> bool {
        let known = *self.is_cached.lock();
        if let Some(cached) = known {
            return cached;
        }

        let key = self.cache_key();
        let cached = match self
            .pool
            .services()
            .keys
            .exists(&key, &self.language, self.site)
            .await
        {
            Ok(exists) => exists,
            Err(e) => {
                warn!(error = %e, key = %key, "failed to look up menu cache key");
                false
            }
        };

        *self.is_cached.lock() = Some(cached);
        cached
    }

    /// Fetch the assembled, undecorated tree from cache or rebuild it.
    async fn build_nodes(&self, notices: &mut Vec<String>) -> MenuTree {
        let services = self.pool.services();
        let key = self.cache_key();

        // A cached tree is only used while its key is still in the index, so
        // trees invalidated through the index are never served.
        if let Some(payload) = services.cache.get(&key).await
            && self.is_cached().await
        {
            match serde_json::from_str::<MenuTree>(&payload) {
                Ok(tree) => {
                    debug!(key = %key, nodes = tree.len(), "menu tree served from cache");
                    return tree;
                }
                Err(e) => warn!(error = %e, key = %key, "discarding unreadable cached menu tree"),
            }
        }

        let mut collection = NodeCollection::new();
        for source in &self.sources {
            match source.collect_nodes(&self.request, &mut collection).await {
                Ok(count) => {
                    debug!(namespace = %source.namespace(), nodes = count, "collected menu nodes");
                }
                Err(SourceError::NoReverseMatch { target }) => {
                    error!(
                        namespace = %source.namespace(),
                        target = %target,
                        "menu could not be loaded"
                    );
                    if self.request.is_staff() {
                        notices.push(format!(
                            "Menu {} cannot be loaded. Please, make sure all its urls exist and can be resolved.",
                            source.namespace()
                        ));
                    }
                }
                Err(e) => {
                    error!(namespace = %source.namespace(), error = %e, "menu source failed");
                }
            }
        }

        let tree = build_tree(collection);

        match serde_json::to_string(&tree) {
            Ok(payload) => {
                services
                    .cache
                    .set(&key, &payload, services.config.cache_ttl_secs)
                    .await;
            }
            Err(e) => warn!(error = %e, key = %key, "failed to serialize menu tree"),
        }

        if !self.is_cached().await {
            match services.keys.create(&key, &self.language, self.site).await {
                Ok(()) => *self.is_cached.lock() = Some(true),
                Err(e) => warn!(error = %e, key = %key, "failed to record menu cache key"),
            }
        }

        debug!(key = %key, nodes = tree.len(), "menu tree rebuilt");
        tree
    }

    /// Set `level` on every node and selection flags around selected nodes.
    ///
    /// Returns the flattened node list, namespace-major.
    pub fn mark_nodes(&self, tree: &mut MenuTree) -> Vec<NodeId> {
        tree.clear_marks();

        let mut selected = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<(NodeId, usize)> = tree.roots().iter().rev().map(|&r| (r, 0)).collect();

        while let Some((id, level)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }

            tree[id].level = level;

            if tree[id].is_selected(&self.request) {
                tree[id].selected = true;
                selected.push(id);
                for sibling in tree.siblings(id) {
                    tree[sibling].sibling = true;
                }
                for descendant in tree.descendants(id) {
                    tree[descendant].descendant = true;
                }
                for ancestor in tree.ancestors(id) {
                    tree[ancestor].ancestor = true;
                }
            }

            stack.extend(tree.children(id).iter().rev().map(|&c| (c, level + 1)));
        }

        *self.selected.lock() = selected;
        tree.flatten()
    }

    /// Run every registered modifier over `nodes`, in registration order.
    pub fn apply_modifiers(
        &self,
        tree: &mut MenuTree,
        mut nodes: Vec<NodeId>,
        options: &ModifyOptions,
    ) -> Vec<NodeId> {
        for modifier in self.pool.modifiers() {
            nodes = modifier.modify(self, &self.request, tree, nodes, options);
        }
        nodes
    }

    /// Render the menu for this request.
    pub async fn get_nodes(
        &self,
        namespace: Option<&str>,
        root_id: Option<&str>,
        breadcrumb: bool,
    ) -> RenderedMenu {
        let mut notices = Vec::new();
        let mut tree = self.build_nodes(&mut notices).await;
        let nodes = self.mark_nodes(&mut tree);

        let options = ModifyOptions {
            namespace: namespace.map(str::to_string),
            root_id: root_id.map(str::to_string),
            post_cut: false,
            breadcrumb,
        };
        let nodes = self.apply_modifiers(&mut tree, nodes, &options);

        RenderedMenu {
            tree,
            nodes,
            notices,
        }
    }
}

impl std::fmt::Debug for MenuRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuRenderer")
            .field("language", &self.language)
            .field("site", &self.site)
            .field("edit_or_preview", &self.edit_or_preview)
            .field("sources", &self.sources.len())
            .finish_non_exhaustive()
    }
}
