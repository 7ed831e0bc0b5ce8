//! Sources defined by data rather than code.
//!
//! Plugins and fixtures describe menus as JSON: each definition names the
//! source and carries either a flat `nodes` list or a list of `instances`,
//! each with its own nodes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::{AttachableSource, MenuSource, NodeSource, SourceInstance};
use crate::error::{MenuError, SourceError};
use crate::node::NavigationNode;
use crate::request::MenuRequest;

/// A plain source serving a fixed list of nodes.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    label: String,
    nodes: Vec<NavigationNode>,
    attributes: Map<String, Value>,
}

impl StaticSource {
    /// Create a source from nodes.
    pub fn new(label: impl Into<String>, nodes: Vec<NavigationNode>) -> Self {
        Self {
            label: label.into(),
            nodes,
            attributes: Map::new(),
        }
    }

    /// Set a source-level attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl NodeSource for StaticSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }

    async fn get_nodes(&self, _request: &MenuRequest) -> Result<Vec<NavigationNode>, SourceError> {
        Ok(self.nodes.clone())
    }
}

/// An attachable source serving fixed nodes per instance.
#[derive(Debug, Clone, Default)]
pub struct StaticAttachedSource {
    label: String,
    instances: Vec<(String, Vec<NavigationNode>)>,
    attributes: Map<String, Value>,
}

impl StaticAttachedSource {
    /// Create a source from `(instance id, nodes)` pairs.
    pub fn new(label: impl Into<String>, instances: Vec<(String, Vec<NavigationNode>)>) -> Self {
        Self {
            label: label.into(),
            instances,
            attributes: Map::new(),
        }
    }

    /// Set a source-level attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl AttachableSource for StaticAttachedSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }

    async fn instances(&self) -> Vec<SourceInstance> {
        self.instances
            .iter()
            .map(|(id, _)| SourceInstance::new(id.clone()))
            .collect()
    }

    async fn get_nodes(
        &self,
        _request: &MenuRequest,
        instance: &SourceInstance,
    ) -> Result<Vec<NavigationNode>, SourceError> {
        Ok(self
            .instances
            .iter()
            .find(|(id, _)| *id == instance.id)
            .map(|(_, nodes)| nodes.clone())
            .unwrap_or_default())
    }
}

/// One attachment of a data-defined attachable source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDefinition {
    /// Attachment point id.
    pub id: String,
    /// Nodes served for this attachment.
    #[serde(default)]
    pub nodes: Vec<NavigationNode>,
}

/// A data-defined source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Registration name (also the namespace).
    pub name: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Nodes of a plain source.
    #[serde(default)]
    pub nodes: Option<Vec<NavigationNode>>,
    /// Attachments of an attachable source.
    #[serde(default)]
    pub instances: Option<Vec<InstanceDefinition>>,
    /// Source-level attributes.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl SourceDefinition {
    /// Parse definitions from JSON arrays, one per contributing plugin.
    ///
    /// Each element of `jsons` is a (plugin name, JSON array) pair. Arrays that
    /// fail to parse are logged and skipped.
    pub fn from_plugin_results(jsons: Vec<(String, String)>) -> Vec<Self> {
        let mut definitions = Vec::new();

        for (plugin_name, json) in jsons {
            match serde_json::from_str::<Vec<SourceDefinition>>(&json) {
                Ok(parsed) => definitions.extend(parsed),
                Err(e) => {
                    warn!(
                        plugin = %plugin_name,
                        error = %e,
                        "failed to parse menu source definitions"
                    );
                }
            }
        }

        definitions
    }

    /// Turn the definition into a registrable source.
    ///
    /// Exactly one of `nodes` and `instances` must be present.
    pub fn into_source(self) -> Result<(String, MenuSource), MenuError> {
        let name = self.name;
        let source = match (self.nodes, self.instances) {
            (Some(nodes), None) => {
                let mut source = StaticSource::new(self.label, nodes);
                source.attributes = self.attributes;
                MenuSource::plain(source)
            }
            (None, Some(instances)) => {
                let instances = instances.into_iter().map(|i| (i.id, i.nodes)).collect();
                let mut source = StaticAttachedSource::new(self.label, instances);
                source.attributes = self.attributes;
                MenuSource::attachable(source)
            }
            (Some(_), Some(_)) => {
                return Err(MenuError::InvalidSource {
                    name,
                    reason: "defines both `nodes` and `instances`".to_string(),
                });
            }
            (None, None) => {
                return Err(MenuError::InvalidSource {
                    name,
                    reason: "defines neither `nodes` nor `instances`".to_string(),
                });
            }
        };
        Ok((name, source))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_attachable_definitions() {
        let json = r#"[
            {"name": "Pages", "nodes": [{"id": "1", "title": "Home", "url": "/"}]},
            {"name": "Blog", "label": "Blog app", "instances": [{"id": "4", "nodes": []}]}
        ]"#;

        let defs = SourceDefinition::from_plugin_results(vec![("core".to_string(), json.to_string())]);
        assert_eq!(defs.len(), 2);

        let (name, source) = defs[0].clone().into_source().unwrap();
        assert_eq!(name, "Pages");
        assert!(matches!(source, MenuSource::Plain(_)));

        let (_, source) = defs[1].clone().into_source().unwrap();
        assert!(matches!(source, MenuSource::Attachable(_)));
        assert_eq!(source.label(), "Blog app");
    }

    #[test]
    fn malformed_plugin_json_is_skipped() {
        let defs = SourceDefinition::from_plugin_results(vec![
            ("broken".to_string(), "{not json".to_string()),
            ("ok".to_string(), r#"[{"name": "A", "nodes": []}]"#.to_string()),
        ]);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "A");
    }

    #[test]
    fn definition_without_nodes_is_invalid() {
        let def: SourceDefinition = serde_json::from_str(r#"{"name": "Empty"}"#).unwrap();
        let err = def.into_source().unwrap_err();
        assert!(matches!(err, MenuError::InvalidSource { ref name, .. } if name == "Empty"));
    }

    #[test]
    fn definition_with_both_kinds_is_invalid() {
        let def: SourceDefinition =
            serde_json::from_str(r#"{"name": "Both", "nodes": [], "instances": []}"#).unwrap();
        assert!(def.into_source().is_err());
    }

    #[test]
    fn attributes_are_exposed() {
        let source = StaticSource::new("Pages", Vec::new()).with_attribute("cms_enabled", true);
        assert_eq!(source.attribute("cms_enabled"), Some(Value::Bool(true)));
        assert_eq!(source.attribute("missing"), None);
    }
}
