//! # Style Resolution
//!
//! Effective styles are computed by layering, lowest precedence first:
//!
//! 1. type defaults (per element type, from the [`StyleCatalog`])
//! 2. preset styles (catalog entry named by `configuration.preset`),
//!    followed by the node's `configuration.overrides`
//! 3. instance styles (`node.styles`)
//! 4. transient interaction styles (drop-target highlight, selection, ...)
//!
//! Later layers win per leaf, including inside interaction-state sub-maps.
//! Resolution reads nothing but its arguments, so the canvas renderer and
//! the static export path get identical results.

use pagecraft_common::{Node, NodeId, StyleMap, StyleValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Type defaults and named preset styles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleCatalog {
    #[serde(default)]
    type_defaults: HashMap<String, StyleMap>,

    #[serde(default)]
    presets: HashMap<String, StyleMap>,
}

impl StyleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type_default(&mut self, node_type: impl Into<String>, styles: StyleMap) {
        self.type_defaults.insert(node_type.into(), styles);
    }

    pub fn set_preset(&mut self, preset: impl Into<String>, styles: StyleMap) {
        self.presets.insert(preset.into(), styles);
    }

    pub fn with_type_default(mut self, node_type: impl Into<String>, styles: StyleMap) -> Self {
        self.set_type_default(node_type, styles);
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>, styles: StyleMap) -> Self {
        self.set_preset(preset, styles);
        self
    }

    pub fn type_default(&self, node_type: &str) -> Option<&StyleMap> {
        self.type_defaults.get(node_type)
    }

    pub fn preset(&self, preset: &str) -> Option<&StyleMap> {
        self.presets.get(preset)
    }
}

/// Short-lived per-node interaction styles, owned by the caller
#[derive(Debug, Clone, Default)]
pub struct TransientStyles {
    by_node: HashMap<NodeId, StyleMap>,
}

impl TransientStyles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: NodeId, styles: StyleMap) {
        self.by_node.insert(id, styles);
    }

    pub fn clear(&mut self, id: &NodeId) {
        self.by_node.remove(id);
    }

    pub fn get(&self, id: &NodeId) -> Option<&StyleMap> {
        self.by_node.get(id)
    }
}

/// Merge layers in order, later layers overriding earlier ones per leaf
pub fn resolve_layers<'a>(layers: impl IntoIterator<Item = &'a StyleMap>) -> StyleMap {
    let mut resolved = StyleMap::new();
    for layer in layers {
        resolved.merge(layer);
    }
    resolved
}

/// Compute the effective style map for one node
pub fn resolve_style(node: &Node, catalog: &StyleCatalog, transient: Option<&StyleMap>) -> StyleMap {
    let defaults = catalog.type_default(node.node_type.as_str());
    let preset = node
        .configuration
        .preset
        .as_deref()
        .and_then(|name| catalog.preset(name));

    trace!(
        node = %node.id,
        has_defaults = defaults.is_some(),
        has_preset = preset.is_some(),
        has_transient = transient.is_some(),
        "Resolving style"
    );

    resolve_layers(
        defaults
            .into_iter()
            .chain(preset)
            .chain(std::iter::once(&node.configuration.overrides))
            .chain(std::iter::once(&node.styles))
            .chain(transient),
    )
}

/// Resolve every node, keyed by id
pub fn resolve_all(
    nodes: &[Node],
    catalog: &StyleCatalog,
    transient: &TransientStyles,
) -> HashMap<NodeId, StyleMap> {
    nodes
        .iter()
        .map(|node| {
            let styles = resolve_style(node, catalog, transient.get(&node.id));
            (node.id.clone(), styles)
        })
        .collect()
}

/// Flatten a resolved map for one interaction state.
///
/// Top-level scalars are the base; the scalars of the `state` sub-map
/// (e.g. `":hover"`) are laid over them. Other sub-maps are dropped.
/// The leading `:` may be omitted (`"hover"`).
pub fn resolve_state(resolved: &StyleMap, state: &str) -> StyleMap {
    let mut flat: StyleMap = resolved
        .iter()
        .filter(|(_, value)| matches!(value, StyleValue::Scalar(_)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let state_styles = resolved
        .nested(state)
        .or_else(|| resolved.nested(&format!(":{}", state.trim_start_matches(':'))));
    if let Some(state_styles) = state_styles {
        for (key, value) in state_styles.iter() {
            if let StyleValue::Scalar(_) = value {
                flat.insert(key.clone(), value.clone());
            }
        }
    }

    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_common::Configuration;
    use serde_json::{json, Value};

    fn styles(value: Value) -> StyleMap {
        StyleMap::try_from(value).unwrap()
    }

    fn catalog() -> StyleCatalog {
        StyleCatalog::new()
            .with_type_default("button", styles(json!({ "color": "black" })))
            .with_preset("primary", styles(json!({ "color": "blue", "fontSize": 12 })))
    }

    #[test]
    fn test_layers_override_per_leaf() {
        let mut node = Node::new("b-1", "button");
        node.configuration = Configuration::preset("primary");
        node.styles = styles(json!({ "color": "red" }));

        let resolved = resolve_style(&node, &catalog(), None);

        assert_eq!(resolved, styles(json!({ "color": "red", "fontSize": 12 })));
    }

    #[test]
    fn test_configuration_overrides_sit_between_preset_and_instance() {
        let mut node = Node::new("b-1", "button");
        node.configuration = Configuration::preset("primary");
        node.configuration.overrides = styles(json!({ "fontSize": 14, "color": "navy" }));
        node.styles = styles(json!({ "color": "red" }));

        let resolved = resolve_style(&node, &catalog(), None);

        assert_eq!(resolved.get_str("color"), Some("red"));
        assert_eq!(resolved, styles(json!({ "color": "red", "fontSize": 14 })));
    }

    #[test]
    fn test_transient_layer_wins() {
        let mut node = Node::new("s-1", "section");
        node.styles = styles(json!({ "outline": "none", ":hover": { "background": "white" } }));
        let highlight = styles(json!({ "outline": "2px dashed blue", ":hover": { "background": "azure" } }));

        let resolved = resolve_style(&node, &StyleCatalog::new(), Some(&highlight));

        assert_eq!(resolved.get_str("outline"), Some("2px dashed blue"));
        assert_eq!(
            resolved.nested(":hover").and_then(|h| h.get_str("background")),
            Some("azure")
        );
    }

    #[test]
    fn test_unknown_preset_is_ignored() {
        let mut node = Node::new("b-1", "button");
        node.configuration = Configuration::preset("does-not-exist");

        let resolved = resolve_style(&node, &catalog(), None);

        assert_eq!(resolved, styles(json!({ "color": "black" })));
    }

    #[test]
    fn test_resolve_state_flattens_pseudo_state() {
        let resolved = styles(json!({
            "color": "black",
            "padding": "4px",
            ":hover": { "color": "blue" },
            ":focus": { "outline": "1px solid" }
        }));

        let hover = resolve_state(&resolved, ":hover");

        assert_eq!(hover, styles(json!({ "color": "blue", "padding": "4px" })));
        assert_eq!(resolve_state(&resolved, "hover"), hover);
    }

    #[test]
    fn test_resolve_all_uses_per_node_transient() {
        let nodes = vec![Node::new("a", "button"), Node::new("b", "button")];
        let mut transient = TransientStyles::new();
        transient.set("b".into(), styles(json!({ "color": "orange" })));

        let resolved = resolve_all(&nodes, &catalog(), &transient);

        assert_eq!(resolved[&NodeId::from("a")].get_str("color"), Some("black"));
        assert_eq!(resolved[&NodeId::from("b")].get_str("color"), Some("orange"));
    }
}
