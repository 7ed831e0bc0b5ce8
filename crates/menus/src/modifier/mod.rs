//! Menu modifiers.
//!
//! Modifiers run after selection marking, in registration order. Each one
//! receives the flattened node list produced by the previous one and may
//! filter, reorder, or annotate it.

mod auth_visibility;
mod level;

pub use auth_visibility::{AuthVisibility, VISIBLE_FOR_ANONYMOUS, VISIBLE_FOR_AUTHENTICATED};
pub use level::LevelLimit;

use crate::node::NodeId;
use crate::renderer::MenuRenderer;
use crate::request::MenuRequest;
use crate::tree::MenuTree;

/// Arguments a renderer passes along to every modifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifyOptions {
    /// Restrict to one namespace.
    pub namespace: Option<String>,
    /// Restrict to the subtree of one node id.
    pub root_id: Option<String>,
    /// The nodes have already been cut down to what will be shown.
    pub post_cut: bool,
    /// Rendering a breadcrumb rather than a menu.
    pub breadcrumb: bool,
}

/// A post-processing stage over the marked node list.
pub trait Modifier: Send + Sync {
    /// Name used to keep registration idempotent.
    fn name(&self) -> &str;

    /// Transform the node list.
    ///
    /// `tree` holds the nodes referenced by `nodes` and may be mutated
    /// (e.g. to detach removed nodes or set attributes).
    fn modify(
        &self,
        renderer: &MenuRenderer,
        request: &MenuRequest,
        tree: &mut MenuTree,
        nodes: Vec<NodeId>,
        options: &ModifyOptions,
    ) -> Vec<NodeId>;
}
