//! Hide nodes meant only for anonymous or only for authenticated visitors.

use std::collections::HashSet;

use serde_json::Value;

use super::{Modifier, ModifyOptions};
use crate::node::{NavigationNode, NodeId};
use crate::renderer::MenuRenderer;
use crate::request::MenuRequest;
use crate::tree::MenuTree;

/// Node attribute: a falsy value hides the node from logged-in users.
pub const VISIBLE_FOR_AUTHENTICATED: &str = "visible_for_authenticated";

/// Node attribute: a falsy value hides the node from anonymous visitors.
pub const VISIBLE_FOR_ANONYMOUS: &str = "visible_for_anonymous";

/// Removes nodes (with their subtrees) that the current visitor should not see.
///
/// Breadcrumbs and already-cut lists pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthVisibility;

/// Missing attributes count as visible. `false`, `null`, zero, and empty
/// strings, arrays and objects count as hidden.
fn flag(node: &NavigationNode, name: &str) -> bool {
    match node.attr.get(name) {
        None => true,
        Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

impl Modifier for AuthVisibility {
    fn name(&self) -> &str {
        "auth_visibility"
    }

    fn modify(
        &self,
        _renderer: &MenuRenderer,
        request: &MenuRequest,
        tree: &mut MenuTree,
        nodes: Vec<NodeId>,
        options: &ModifyOptions,
    ) -> Vec<NodeId> {
        if options.post_cut || options.breadcrumb {
            return nodes;
        }

        let attribute = if request.is_authenticated() {
            VISIBLE_FOR_AUTHENTICATED
        } else {
            VISIBLE_FOR_ANONYMOUS
        };

        let hidden: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|&id| tree.node(id).is_some_and(|n| !flag(n, attribute)))
            .collect();

        if hidden.is_empty() {
            return nodes;
        }

        let mut removed: HashSet<NodeId> = HashSet::new();
        for id in hidden {
            if removed.insert(id) {
                removed.extend(tree.descendants(id));
                tree.detach(id);
            }
        }

        nodes.into_iter().filter(|id| !removed.contains(id)).collect()
    }
}
