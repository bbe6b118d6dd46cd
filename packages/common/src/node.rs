//! Document node model
//!
//! Nodes live in a flat store and reference each other by [`NodeId`]:
//! `parent_id` points up, `children` lists the ordered ids below. The
//! serialized shape is the plain record handed to persistence.

use crate::style::StyleMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt;

/// Free-form widget settings
pub type Settings = serde_json::Map<String, Value>;

/// Unique node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Element type tag (`section`, `heading`, `button`, ...)
///
/// Fixed at creation. Changing the semantic type of an element means
/// deleting it and creating a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeType(String);

impl NodeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<&str> for NodeType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Node payload: plain text or a structured block (e.g. widget data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Structured(Value),
}

impl Content {
    pub fn text(value: impl Into<String>) -> Self {
        Content::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Structured(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(text) => text.is_empty(),
            Content::Structured(value) => value.is_null(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

/// Preset tag plus per-instance overrides of the preset's styles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    #[serde(default, skip_serializing_if = "StyleMap::is_empty")]
    pub overrides: StyleMap,
}

impl Configuration {
    pub fn preset(name: impl Into<String>) -> Self {
        Self {
            preset: Some(name.into()),
            overrides: StyleMap::new(),
        }
    }
}

/// A single document node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default)]
    pub parent_id: Option<NodeId>,

    #[serde(default)]
    pub children: Vec<NodeId>,

    #[serde(default)]
    pub content: Content,

    #[serde(default)]
    pub styles: StyleMap,

    #[serde(default)]
    pub configuration: Configuration,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<NodeType>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            parent_id: None,
            children: Vec::new(),
            content: Content::default(),
            styles: StyleMap::new(),
            configuration: Configuration::default(),
            settings: Settings::new(),
            label: None,
            description: None,
        }
    }

    /// Build a detached node from creation props
    pub fn from_props(id: NodeId, node_type: NodeType, props: NodeProps) -> Self {
        Self {
            id,
            node_type,
            parent_id: None,
            children: Vec::new(),
            content: props.content.unwrap_or_default(),
            styles: props.styles,
            configuration: props.configuration,
            settings: props.settings,
            label: props.label,
            description: props.description,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn child_position(&self, child: &NodeId) -> Option<usize> {
        self.children.iter().position(|c| c == child)
    }

    /// Display name for structure views: label if set, else type
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(self.node_type.as_str())
    }
}

/// Initial properties accepted by node creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(skip_serializing_if = "StyleMap::is_empty")]
    pub styles: StyleMap,

    pub configuration: Configuration,

    #[serde(skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeProps {
    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_styles(mut self, styles: StyleMap) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Shallow merge of settings; `null` removes a key
pub fn merge_settings(target: &mut Settings, patch: &Settings) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_record_shape() {
        let mut node = Node::new("n-1", "heading");
        node.content = Content::text("Welcome");
        node.children.push(NodeId::from("n-2"));

        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(value["type"], json!("heading"));
        assert_eq!(value["parentId"], Value::Null);
        assert_eq!(value["children"], json!(["n-2"]));
        assert_eq!(value["content"], json!("Welcome"));
        assert!(value.get("label").is_none());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_structured_content_roundtrip() {
        let json = json!({
            "id": "w-1",
            "type": "widget",
            "parentId": null,
            "content": { "chart": "line", "series": [1, 2, 3] }
        });

        let node: Node = serde_json::from_value(json).unwrap();
        assert!(matches!(node.content, Content::Structured(_)));
        assert!(node.children.is_empty());
        assert_eq!(node.node_type, "widget");
    }

    #[test]
    fn test_merge_settings_removes_nulls() {
        let mut settings = Settings::new();
        settings.insert("href".into(), json!("/home"));
        settings.insert("target".into(), json!("_blank"));

        let patch = json!({ "target": null, "rel": "noopener" });
        merge_settings(&mut settings, patch.as_object().unwrap());

        assert_eq!(Value::Object(settings), json!({ "href": "/home", "rel": "noopener" }));
    }
}
