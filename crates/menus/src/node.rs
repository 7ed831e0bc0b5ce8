//! Navigation node model.
//!
//! A node is identified by `(namespace, id)`. Sources hand nodes over with
//! only `parent_id` (and optionally a namespace hint) filled in; the tree
//! assembler wires `parent`/`children` and the renderer sets the
//! decoration flags.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::MenuRequest;

/// Index of a node inside a [`MenuTree`](crate::tree::MenuTree).
pub type NodeId = usize;

/// A single navigation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationNode {
    /// Local identifier, unique within the namespace.
    pub id: String,

    /// Human-readable title.
    pub title: String,

    /// Link target path.
    #[serde(default)]
    pub url: String,

    /// Parent node's local id (None = root).
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Namespace the parent lives in (defaults to the owning namespace).
    #[serde(default)]
    pub parent_namespace: Option<String>,

    /// Namespace of the node; filled in during assembly when absent.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Whether templates should show the node in menus (it stays available
    /// for breadcrumbs either way).
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Free-form attributes for modifiers and templates.
    #[serde(default)]
    pub attr: Map<String, Value>,

    /// Parent node, set during assembly.
    #[serde(default)]
    pub parent: Option<NodeId>,

    /// Child nodes in assembly order.
    #[serde(default)]
    pub children: Vec<NodeId>,

    /// Depth from the root (root = 0), set during marking.
    #[serde(default)]
    pub level: usize,

    /// Node matches the current request.
    #[serde(default)]
    pub selected: bool,

    /// Node shares a parent with the selected node.
    #[serde(default)]
    pub sibling: bool,

    /// Node lies below the selected node.
    #[serde(default)]
    pub descendant: bool,

    /// Node lies on the path from the selected node to its root.
    #[serde(default)]
    pub ancestor: bool,
}

fn default_true() -> bool {
    true
}

impl NavigationNode {
    /// Create a root node.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            parent_id: None,
            parent_namespace: None,
            namespace: None,
            visible: true,
            attr: Map::new(),
            parent: None,
            children: Vec::new(),
            level: 0,
            selected: false,
            sibling: false,
            descendant: false,
            ancestor: false,
        }
    }

    /// Set the parent id.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the namespace the parent is looked up in.
    pub fn with_parent_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.parent_namespace = Some(namespace.into());
        self
    }

    /// Set a free-form attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attr.insert(name.into(), value.into());
        self
    }

    /// Hide the node from menus.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Check if this node represents the requested page.
    ///
    /// Trailing slashes are ignored; a node without a url is never selected.
    pub fn is_selected(&self, request: &MenuRequest) -> bool {
        let url = self.url.trim_end_matches('/');
        let path = request.path.trim_end_matches('/');
        !self.url.is_empty() && url == path
    }

    /// Clear parent/child wiring and all decoration flags.
    pub(crate) fn reset(&mut self) {
        self.parent = None;
        self.children.clear();
        self.clear_marks();
    }

    pub(crate) fn clear_marks(&mut self) {
        self.level = 0;
        self.selected = false;
        self.sibling = false;
        self.descendant = false;
        self.ancestor = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn is_selected_ignores_trailing_slash() {
        let node = NavigationNode::new("1", "About", "/about/");
        assert!(node.is_selected(&MenuRequest::new("/about")));
        assert!(node.is_selected(&MenuRequest::new("/about/")));
        assert!(!node.is_selected(&MenuRequest::new("/about/team")));
    }

    #[test]
    fn empty_url_is_never_selected() {
        let node = NavigationNode::new("1", "Separator", "");
        assert!(!node.is_selected(&MenuRequest::new("")));
    }

    #[test]
    fn root_url_matches_root_path() {
        let node = NavigationNode::new("home", "Home", "/");
        assert!(node.is_selected(&MenuRequest::new("/")));
    }

    #[test]
    fn deserializes_with_defaults() {
        let node: NavigationNode =
            serde_json::from_str(r#"{"id": "a", "title": "A", "parent_id": "root"}"#).unwrap();
        assert_eq!(node.parent_id.as_deref(), Some("root"));
        assert!(node.visible);
        assert!(node.children.is_empty());
        assert!(node.attr.is_empty());
    }
}
