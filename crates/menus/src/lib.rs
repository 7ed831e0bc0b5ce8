//! CMS navigation menu engine.
//!
//! Merges the nodes of every registered menu source into one tree per
//! language, site and visitor context, caches the assembled tree, and
//! decorates it with selection state before modifiers post-process it.
//!
//! The usual flow:
//!
//! 1. Build [`MenuServices`] (site/language resolution, cache, key index).
//! 2. Create a [`MenuPool`], register sources and modifiers, `initialize()`.
//! 3. Per request, `pool.renderer(request)` and `renderer.get_nodes(..)`.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod modifier;
pub mod node;
pub mod pool;
pub mod renderer;
pub mod request;
pub mod services;
pub mod source;
pub mod tree;

pub use config::MenuConfig;
pub use error::{MenuError, MenuResult, SourceError};
pub use node::{NavigationNode, NodeId};
pub use pool::MenuPool;
pub use renderer::{MenuRenderer, RenderedMenu};
pub use request::{MenuRequest, Toolbar, UserContext};
pub use services::{MenuServices, SiteId};
pub use source::{AttachableSource, BoundSource, MenuSource, NodeSource, SourceInstance};
pub use tree::{MenuTree, NodeCollection, build_tree};
