//! Menu tree assembly.
//!
//! Sources deliver nodes as a flat collection keyed by namespace and local id.
//! [`build_tree`] wires parents and children across namespaces, collects the
//! root list, and prunes every node that cannot be reached from a root
//! (missing parent, self-parenting, parent cycles) together with its subtree.
//!
//! Assembly never fails: malformed input only shows up as missing branches.

use std::collections::HashSet;
use std::ops::{Index, IndexMut};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::node::{NavigationNode, NodeId};

/// Nodes produced by sources, grouped by namespace.
///
/// Iteration order is insertion order: namespaces in the order sources
/// contributed them, nodes in the order each source produced them.
#[derive(Debug, Clone, Default)]
pub struct NodeCollection {
    namespaces: IndexMap<String, IndexMap<String, NavigationNode>>,
}

impl NodeCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under a namespace.
    ///
    /// A node with the same id replaces the earlier one but keeps its position.
    pub fn insert(&mut self, namespace: &str, node: NavigationNode) -> Option<NavigationNode> {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(node.id.clone(), node)
    }

    /// Get a node by namespace and local id.
    pub fn get(&self, namespace: &str, id: &str) -> Option<&NavigationNode> {
        self.namespaces.get(namespace).and_then(|nodes| nodes.get(id))
    }

    /// Check if a node exists.
    pub fn contains(&self, namespace: &str, id: &str) -> bool {
        self.get(namespace, id).is_some()
    }

    /// Namespaces in contribution order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(|s| s.as_str())
    }

    /// Total number of nodes across all namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.values().map(|nodes| nodes.len()).sum()
    }

    /// Check if the collection holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An assembled menu forest.
///
/// Nodes are stored in an arena; `parent` and `children` on each node are
/// indices into it. The undecorated tree is what gets cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuTree {
    nodes: Vec<NavigationNode>,
    namespaces: IndexMap<String, Vec<NodeId>>,
    roots: Vec<NodeId>,
}

impl MenuTree {
    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by index.
    pub fn node(&self, id: NodeId) -> Option<&NavigationNode> {
        self.nodes.get(id)
    }

    /// Get a node by index for mutation.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NavigationNode> {
        self.nodes.get_mut(id)
    }

    /// Top-level nodes in source order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of a node in assembly order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Namespaces present in the tree, in source order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(|s| s.as_str())
    }

    /// Nodes belonging to a namespace, in the order the source produced them.
    pub fn namespace_nodes(&self, namespace: &str) -> &[NodeId] {
        self.namespaces
            .get(namespace)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Look up a node by namespace and local id.
    pub fn find(&self, namespace: &str, id: &str) -> Option<NodeId> {
        self.namespace_nodes(namespace)
            .iter()
            .copied()
            .find(|&n| self.nodes[n].id == id)
    }

    /// All node indices, namespace-major, then per-namespace insertion order.
    pub fn flatten(&self) -> Vec<NodeId> {
        self.namespaces.values().flatten().copied().collect()
    }

    /// Every node below `id`, depth-first. Does not include `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        collect_descendants(&self.nodes, id)
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::from([id]);
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent);

        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent);
            current = self.nodes.get(parent).and_then(|n| n.parent);
        }

        chain
    }

    /// Nodes sharing a parent with `id` (all roots for a root node).
    ///
    /// The node itself is part of its sibling set.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        match node.parent {
            Some(parent) => self.children(parent).to_vec(),
            None => self.roots.clone(),
        }
    }

    /// Detach a node from its parent (or from the root list).
    ///
    /// The node and its subtree stay in the arena; they are just no longer
    /// reachable from the roots.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(id).map(|n| n.parent) else {
            return;
        };
        match parent {
            Some(parent) => self.nodes[parent].children.retain(|&c| c != id),
            None => self.roots.retain(|&r| r != id),
        }
        self.nodes[id].parent = None;
    }

    /// Filter `nodes` down to those whose attribute `name` equals `value`.
    pub fn nodes_by_attribute(&self, nodes: &[NodeId], name: &str, value: &Value) -> Vec<NodeId> {
        nodes
            .iter()
            .copied()
            .filter(|&id| {
                self.nodes
                    .get(id)
                    .and_then(|n| n.attr.get(name))
                    .is_some_and(|v| v == value)
            })
            .collect()
    }

    /// Reset level and selection flags on every node.
    pub fn clear_marks(&mut self) {
        for node in &mut self.nodes {
            node.clear_marks();
        }
    }

    /// Iterate over `(index, node)` pairs in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NavigationNode)> {
        self.nodes.iter().enumerate()
    }
}

impl Index<NodeId> for MenuTree {
    type Output = NavigationNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for MenuTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id]
    }
}

/// Assemble a forest from a node collection.
///
/// The parent of a node is looked up in its `parent_namespace`, else its
/// `namespace` hint. Without either, the namespace it was contributed under
/// is tried first, then every other namespace in collection order. Nodes whose
/// parent cannot be found are dropped with their whole subtree, as are nodes
/// caught in parent cycles. Root order follows collection order.
///
/// The cross-namespace fallback matches on id alone: a node without a
/// namespace hint whose parent is missing from its own source attaches to any
/// other source's node with that id instead of being pruned. Sources whose ids
/// can collide should set `parent_namespace`.
pub fn build_tree(collection: NodeCollection) -> MenuTree {
    let total = collection.len();
    let mut arena: Vec<NavigationNode> = Vec::with_capacity(total);
    let mut owners: Vec<String> = Vec::with_capacity(total);
    let mut index: IndexMap<String, IndexMap<String, NodeId>> = IndexMap::new();

    for (namespace, nodes) in collection.namespaces {
        let slots = index.entry(namespace.clone()).or_default();
        for (id, mut node) in nodes {
            node.reset();
            slots.insert(id, arena.len());
            owners.push(namespace.clone());
            arena.push(node);
        }
    }

    // Phase 1: link every node to its parent, or record it as a root or orphan.
    let mut roots = Vec::new();
    let mut orphans = Vec::new();

    for slot in 0..arena.len() {
        let owner = &owners[slot];
        let node = &arena[slot];

        let Some(parent_id) = node.parent_id.clone().filter(|p| !p.is_empty()) else {
            arena[slot].namespace = Some(owner.clone());
            roots.push(slot);
            continue;
        };

        let hint = node
            .parent_namespace
            .clone()
            .or_else(|| node.namespace.clone());

        let parent = match hint {
            Some(namespace) => lookup(&index, &namespace, &parent_id),
            None => lookup(&index, owner, &parent_id).or_else(|| {
                // No namespace given and the owner has no such id: take the
                // first namespace, in collection order, that does.
                index.iter().find_map(|(namespace, ids)| {
                    ids.get(&parent_id).map(|&p| (namespace.clone(), p))
                })
            }),
        };

        match parent {
            Some((parent_namespace, parent)) if parent != slot => {
                arena[parent].children.push(slot);
                let node = &mut arena[slot];
                node.parent = Some(parent);
                node.parent_namespace = Some(parent_namespace);
                node.namespace = Some(owner.clone());
            }
            _ => {
                arena[slot].namespace = Some(owner.clone());
                orphans.push(slot);
            }
        }
    }

    // Phase 2: mark orphans with their subtrees, then anything else that never
    // reaches a root (parent cycles). Removal happens only after marking.
    let mut doomed = vec![false; arena.len()];

    for &orphan in &orphans {
        doomed[orphan] = true;
        for desc in collect_descendants(&arena, orphan) {
            doomed[desc] = true;
        }
    }

    let mut reachable = vec![false; arena.len()];
    for &root in &roots {
        reachable[root] = true;
        for desc in collect_descendants(&arena, root) {
            reachable[desc] = true;
        }
    }

    let mut cyclic = 0usize;
    for slot in 0..arena.len() {
        if !reachable[slot] && !doomed[slot] {
            doomed[slot] = true;
            cyclic += 1;
        }
    }

    let pruned = doomed.iter().filter(|&&d| d).count();
    if pruned > 0 {
        debug!(
            orphans = orphans.len(),
            cyclic = cyclic,
            pruned = pruned,
            "pruned unreachable menu nodes"
        );
    }

    // Phase 3: compact the survivors into the final arena.
    let mut remap: Vec<Option<NodeId>> = vec![None; arena.len()];
    let mut nodes = Vec::with_capacity(arena.len() - pruned);
    let mut namespaces: IndexMap<String, Vec<NodeId>> = IndexMap::new();

    for (slot, node) in arena.into_iter().enumerate() {
        if doomed[slot] {
            continue;
        }
        let id = nodes.len();
        remap[slot] = Some(id);
        namespaces.entry(owners[slot].clone()).or_default().push(id);
        nodes.push(node);
    }

    for node in &mut nodes {
        node.parent = node.parent.and_then(|p| remap[p]);
        node.children = node.children.iter().filter_map(|&c| remap[c]).collect();
    }

    let roots = roots.into_iter().filter_map(|r| remap[r]).collect();

    MenuTree {
        nodes,
        namespaces,
        roots,
    }
}

fn lookup(
    index: &IndexMap<String, IndexMap<String, NodeId>>,
    namespace: &str,
    id: &str,
) -> Option<(String, NodeId)> {
    index
        .get(namespace)
        .and_then(|ids| ids.get(id))
        .map(|&slot| (namespace.to_string(), slot))
}

/// Depth-first walk below `start`, guarded against revisiting nodes.
fn collect_descendants(nodes: &[NavigationNode], start: NodeId) -> Vec<NodeId> {
    let Some(first) = nodes.get(start) else {
        return Vec::new();
    };

    let mut seen = HashSet::from([start]);
    let mut found = Vec::new();
    let mut stack: Vec<NodeId> = first.children.iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(node) = nodes.get(id) else {
            continue;
        };
        found.push(id);
        stack.extend(node.children.iter().rev());
    }

    found
}
