//! Menu sources.
//!
//! A source contributes navigation nodes under its own namespace. Two kinds
//! exist and are fixed at registration time:
//!
//! - [`NodeSource`]: one set of nodes (e.g. the page tree).
//! - [`AttachableSource`]: an application menu that can be attached to any
//!   number of pages; each attachment produces its own nodes under the
//!   namespace `"{name}:{instance id}"`.
//!
//! The pool resolves registered sources into [`BoundSource`] values, which
//! is what a renderer actually asks for nodes.

mod static_source;

pub use static_source::{InstanceDefinition, SourceDefinition, StaticAttachedSource, StaticSource};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SourceError;
use crate::node::NavigationNode;
use crate::request::MenuRequest;
use crate::tree::NodeCollection;

/// A source producing one set of nodes.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Human-readable label for administrative listings.
    fn label(&self) -> &str {
        ""
    }

    /// Source-level attribute used by [`MenuPool::menus_by_attribute`](crate::pool::MenuPool::menus_by_attribute).
    fn attribute(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Produce nodes for a request.
    async fn get_nodes(&self, request: &MenuRequest) -> Result<Vec<NavigationNode>, SourceError>;
}

/// One place an attachable source is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInstance {
    /// Identifier of the attachment point (e.g. a page id).
    pub id: String,
}

impl SourceInstance {
    /// Create an instance reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A source attached to zero or more instances.
#[async_trait]
pub trait AttachableSource: Send + Sync {
    /// Human-readable label for administrative listings.
    fn label(&self) -> &str {
        ""
    }

    /// Source-level attribute used by [`MenuPool::menus_by_attribute`](crate::pool::MenuPool::menus_by_attribute).
    fn attribute(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Currently live attachment points.
    async fn instances(&self) -> Vec<SourceInstance>;

    /// Produce nodes for one attachment point.
    async fn get_nodes(
        &self,
        request: &MenuRequest,
        instance: &SourceInstance,
    ) -> Result<Vec<NavigationNode>, SourceError>;
}

/// A registered source.
#[derive(Clone)]
pub enum MenuSource {
    /// Produces one set of nodes.
    Plain(Arc<dyn NodeSource>),
    /// Expanded into one bound source per attachment.
    Attachable(Arc<dyn AttachableSource>),
}

impl MenuSource {
    /// Wrap a plain node source.
    pub fn plain(source: impl NodeSource + 'static) -> Self {
        Self::Plain(Arc::new(source))
    }

    /// Wrap an attachable source.
    pub fn attachable(source: impl AttachableSource + 'static) -> Self {
        Self::Attachable(Arc::new(source))
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        match self {
            Self::Plain(source) => source.label(),
            Self::Attachable(source) => source.label(),
        }
    }

    /// Source-level attribute.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Self::Plain(source) => source.attribute(name),
            Self::Attachable(source) => source.attribute(name),
        }
    }
}

impl std::fmt::Debug for MenuSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(_) => f.debug_tuple("Plain").field(&self.label()).finish(),
            Self::Attachable(_) => f.debug_tuple("Attachable").field(&self.label()).finish(),
        }
    }
}

/// A source ready to render, bound to its namespace and attachment.
#[derive(Debug, Clone)]
pub struct BoundSource {
    name: String,
    namespace: String,
    source: MenuSource,
    instance: Option<SourceInstance>,
}

impl BoundSource {
    /// Bind a source under its registered name.
    pub fn unbound(name: impl Into<String>, source: MenuSource) -> Self {
        let name = name.into();
        Self {
            namespace: name.clone(),
            name,
            source,
            instance: None,
        }
    }

    /// Returns a factory binding an attachable source to its instances.
    pub fn attach_factory(
        name: &str,
        source: &Arc<dyn AttachableSource>,
    ) -> impl Fn(SourceInstance) -> BoundSource {
        let name = name.to_string();
        let source = Arc::clone(source);
        move |instance| BoundSource {
            namespace: format!("{name}:{}", instance.id),
            name: name.clone(),
            source: MenuSource::Attachable(Arc::clone(&source)),
            instance: Some(instance),
        }
    }

    /// Registered name of the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace the nodes are collected under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Attachment point, for attached sources.
    pub fn instance(&self) -> Option<&SourceInstance> {
        self.instance.as_ref()
    }

    /// The underlying source definition.
    pub fn source(&self) -> &MenuSource {
        &self.source
    }

    /// Fetch nodes from the source.
    ///
    /// An attachable source without an instance produces nothing.
    pub async fn get_nodes(&self, request: &MenuRequest) -> Result<Vec<NavigationNode>, SourceError> {
        match (&self.source, &self.instance) {
            (MenuSource::Plain(source), _) => source.get_nodes(request).await,
            (MenuSource::Attachable(source), Some(instance)) => {
                source.get_nodes(request, instance).await
            }
            (MenuSource::Attachable(_), None) => Ok(Vec::new()),
        }
    }

    /// Fetch nodes and add them to `collection` under this namespace.
    ///
    /// Nothing is written when the source fails.
    pub async fn collect_nodes(
        &self,
        request: &MenuRequest,
        collection: &mut NodeCollection,
    ) -> Result<usize, SourceError> {
        let nodes = self.get_nodes(request).await?;
        let count = nodes.len();
        for node in nodes {
            collection.insert(&self.namespace, node);
        }
        Ok(count)
    }
}
