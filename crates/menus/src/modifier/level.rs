//! Depth cut-off.

use super::{Modifier, ModifyOptions};
use crate::node::NodeId;
use crate::renderer::MenuRenderer;
use crate::request::MenuRequest;
use crate::tree::MenuTree;

/// Drops nodes deeper than `max_level` (roots are level 0).
///
/// Relies on `level` having been set by selection marking.
#[derive(Debug, Clone, Copy)]
pub struct LevelLimit {
    max_level: usize,
}

impl LevelLimit {
    /// Keep levels `0..=max_level`.
    pub fn new(max_level: usize) -> Self {
        Self { max_level }
    }
}

impl Modifier for LevelLimit {
    fn name(&self) -> &str {
        "level_limit"
    }

    fn modify(
        &self,
        _renderer: &MenuRenderer,
        _request: &MenuRequest,
        tree: &mut MenuTree,
        nodes: Vec<NodeId>,
        _options: &ModifyOptions,
    ) -> Vec<NodeId> {
        let max_level = self.max_level;
        for &id in &nodes {
            if tree.node(id).is_some_and(|n| n.level == max_level) {
                tree[id].children.clear();
            }
        }
        nodes
            .into_iter()
            .filter(|&id| tree.node(id).is_some_and(|n| n.level <= max_level))
            .collect()
    }
}
