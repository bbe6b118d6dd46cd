//! # Element Templates
//!
//! Named configuration templates used by the command interpreter's `add`
//! action. A template is a [`Blueprint`] (the node tree to create) plus
//! optional preset styles. Nodes created from a template carry the
//! template name as their `configuration.preset`, so the preset styles
//! stay shared in the [`StyleCatalog`] instead of being copied into every
//! instance.

use pagecraft_common::{Content, NodeType, Settings, StyleMap};
use pagecraft_evaluator::StyleCatalog;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Node tree to instantiate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "StyleMap::is_empty")]
    pub styles: StyleMap,

    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Blueprint>,
}

impl Blueprint {
    pub fn new(node_type: impl Into<NodeType>) -> Self {
        Self {
            node_type: node_type.into(),
            preset: None,
            content: None,
            styles: StyleMap::new(),
            settings: Settings::new(),
            label: None,
            description: None,
            children: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_structured(mut self, content: Value) -> Self {
        self.content = Some(Content::Structured(content));
        self
    }

    pub fn with_styles(mut self, styles: StyleMap) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_setting(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_child(mut self, child: Blueprint) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes this blueprint creates
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Blueprint::size).sum::<usize>()
    }
}

/// A named entry in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,

    pub blueprint: Blueprint,

    /// Styles registered in the catalog under `name`
    #[serde(default, skip_serializing_if = "StyleMap::is_empty")]
    pub preset_styles: StyleMap,
}

impl Template {
    pub fn new(name: impl Into<String>, blueprint: Blueprint) -> Self {
        Self {
            name: name.into(),
            blueprint,
            preset_styles: StyleMap::new(),
        }
    }

    pub fn with_preset_styles(mut self, styles: StyleMap) -> Self {
        self.preset_styles = styles;
        self
    }

    /// Blueprint with the root tagged with this template's preset
    pub fn instantiate(&self) -> Blueprint {
        let mut blueprint = self.blueprint.clone();
        blueprint.preset = Some(self.name.clone());
        blueprint
    }
}

/// All templates the interpreter can expand, plus per-type default styles
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Template>,
    type_defaults: BTreeMap<String, StyleMap>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn set_type_default(&mut self, node_type: impl Into<String>, styles: StyleMap) {
        self.type_defaults.insert(node_type.into(), styles);
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Catalog for the style resolver
    pub fn style_catalog(&self) -> StyleCatalog {
        let mut catalog = StyleCatalog::new();
        for (node_type, styles) in &self.type_defaults {
            catalog.set_type_default(node_type.clone(), styles.clone());
        }
        for template in self.templates.values() {
            if !template.preset_styles.is_empty() {
                catalog.set_preset(template.name.clone(), template.preset_styles.clone());
            }
        }
        catalog
    }

    /// Built-in page-builder catalog
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.set_type_default("text", styles(json!({ "color": "#1F2937", "fontSize": 16 })));
        registry.set_type_default("heading", styles(json!({ "color": "#111827", "fontWeight": 700 })));
        registry.set_type_default("button", styles(json!({ "cursor": "pointer", "border": "none" })));
        registry.set_type_default("link", styles(json!({ "color": "#2563EB", "textDecoration": "underline" })));
        registry.set_type_default("image", styles(json!({ "maxWidth": "100%", "display": "block" })));

        registry.register(
            Template::new(
                "section",
                Blueprint::new("section")
                    .with_label("Section")
                    .with_child(Blueprint::new("heading").with_content("Section title"))
                    .with_child(Blueprint::new("text").with_content("Describe this section.")),
            )
            .with_preset_styles(styles(json!({ "padding": "64px 24px", "width": "100%" }))),
        );

        registry.register(
            Template::new("container", Blueprint::new("container"))
                .with_preset_styles(styles(json!({ "display": "flex", "flexDirection": "column", "gap": "16px" }))),
        );

        registry.register(
            Template::new("heading", Blueprint::new("heading").with_content("Heading"))
                .with_preset_styles(styles(json!({ "fontSize": 32, "lineHeight": 1.2 }))),
        );

        registry.register(Template::new("text", Blueprint::new("text").with_content("Text")));

        registry.register(
            Template::new(
                "button",
                Blueprint::new("button")
                    .with_content("Click me")
                    .with_setting("href", json!("#")),
            )
            .with_preset_styles(styles(json!({
                "padding": "8px 16px",
                "background": "#3366FF",
                "color": "white",
                "borderRadius": "4px",
                ":hover": { "background": "#2255EE" }
            }))),
        );

        registry.register(Template::new(
            "image",
            Blueprint::new("image")
                .with_setting("src", json!("https://placehold.co/600x400"))
                .with_setting("alt", json!("")),
        ));

        registry.register(Template::new(
            "link",
            Blueprint::new("link")
                .with_content("Link")
                .with_setting("href", json!("#")),
        ));

        registry.register(Template::new(
            "input",
            Blueprint::new("input")
                .with_setting("name", json!("field"))
                .with_setting("placeholder", json!("Type here")),
        ));

        registry.register(
            Template::new(
                "navbar",
                Blueprint::new("navbar")
                    .with_label("Navigation")
                    .with_child(Blueprint::new("image").with_setting("alt", json!("Logo")))
                    .with_child(link("Home", "/"))
                    .with_child(link("About", "/about"))
                    .with_child(link("Contact", "/contact")),
            )
            .with_preset_styles(styles(json!({
                "display": "flex",
                "alignItems": "center",
                "justifyContent": "space-between",
                "padding": "16px 24px"
            }))),
        );

        registry.register(
            Template::new(
                "footer",
                Blueprint::new("footer")
                    .with_label("Footer")
                    .with_child(Blueprint::new("text").with_content("© All rights reserved."))
                    .with_child(link("Privacy", "/privacy")),
            )
            .with_preset_styles(styles(json!({ "padding": "32px 24px", "background": "#F3F4F6" }))),
        );

        registry.register(
            Template::new(
                "hero",
                Blueprint::new("section")
                    .with_label("Hero")
                    .with_child(Blueprint::new("heading").with_content("Build something great"))
                    .with_child(Blueprint::new("text").with_content("A short line about what you offer."))
                    .with_child(Blueprint::new("button").with_content("Get started")),
            )
            .with_preset_styles(styles(json!({
                "padding": "96px 24px",
                "textAlign": "center",
                "background": "#EEF2FF"
            }))),
        );

        registry.register(
            Template::new(
                "card",
                Blueprint::new("card")
                    .with_child(Blueprint::new("image").with_setting("alt", json!("")))
                    .with_child(Blueprint::new("heading").with_content("Card title"))
                    .with_child(Blueprint::new("text").with_content("Card body.")),
            )
            .with_preset_styles(styles(json!({
                "borderRadius": "8px",
                "padding": "16px",
                "boxShadow": "0 1px 3px rgba(0,0,0,0.1)",
                ":hover": { "boxShadow": "0 4px 12px rgba(0,0,0,0.15)" }
            }))),
        );

        registry.register(
            Template::new(
                "form",
                Blueprint::new("form")
                    .with_setting("action", json!(""))
                    .with_child(Blueprint::new("input").with_setting("name", json!("name")))
                    .with_child(Blueprint::new("input").with_setting("name", json!("email")))
                    .with_child(Blueprint::new("button").with_content("Submit")),
            )
            .with_preset_styles(styles(json!({ "display": "flex", "flexDirection": "column", "gap": "12px" }))),
        );

        registry.register(
            Template::new(
                "widget",
                Blueprint::new("widget").with_structured(json!({ "kind": "stat", "title": "Metric", "value": 0 })),
            )
            .with_preset_styles(styles(json!({ "padding": "16px", "border": "1px solid #E5E7EB" }))),
        );

        registry.register(
            Template::new(
                "dashboard",
                Blueprint::new("dashboard")
                    .with_label("Dashboard")
                    .with_child(Blueprint::new("heading").with_content("Overview"))
                    .with_child(widget("Visitors"))
                    .with_child(widget("Signups"))
                    .with_child(widget("Revenue")),
            )
            .with_preset_styles(styles(json!({
                "display": "grid",
                "gridTemplateColumns": "repeat(3, 1fr)",
                "gap": "16px"
            }))),
        );

        registry
    }
}

fn styles(value: Value) -> StyleMap {
    // Built-in literals are always objects
    StyleMap::try_from(value).unwrap_or_default()
}

fn link(text: &str, href: &str) -> Blueprint {
    Blueprint::new("link")
        .with_content(text)
        .with_setting("href", json!(href))
}

fn widget(title: &str) -> Blueprint {
    Blueprint::new("widget").with_structured(json!({ "kind": "stat", "title": title, "value": 0 }))
}
