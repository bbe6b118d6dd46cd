//! # Command Interpreter
//!
//! Turns high-level intents (`add` / `edit` / `remove`, typically coming
//! from the assistant panel as loose JSON) into one atomic batch.
//!
//! Intents are checked at the boundary: the action must be known, the
//! properties object may only use known keys, and `add`/`edit`/`remove`
//! must name what they need. A parsed [`Command`] is then expanded
//! against the [`TemplateRegistry`] and committed with
//! [`Document::batch_labeled`], so a failing command leaves no trace.

use crate::document::Document;
use crate::mutations::{Mutation, MutationError, MutationOutcome};
use crate::templates::{Blueprint, TemplateRegistry};
use pagecraft_common::{merge_settings, Configuration, Content, NodeId, NodeProps, Settings, StyleMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Loosely-typed request as received from callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<NodeId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,

    /// Document version the intent was prepared against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
}

impl Intent {
    pub fn add(element_type: impl Into<String>) -> Self {
        Self {
            action: "add".to_string(),
            element_type: Some(element_type.into()),
            ..Default::default()
        }
    }

    pub fn edit(target_id: impl Into<NodeId>, properties: Value) -> Self {
        Self {
            action: "edit".to_string(),
            target_id: Some(target_id.into()),
            properties: Some(properties),
            ..Default::default()
        }
    }

    pub fn remove(target_id: impl Into<NodeId>) -> Self {
        Self {
            action: "remove".to_string(),
            target_id: Some(target_id.into()),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target_id: impl Into<NodeId>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_base_version(mut self, version: u64) -> Self {
        self.base_version = Some(version);
        self
    }

    pub fn from_json(source: &str) -> Result<Self, CommandError> {
        serde_json::from_str(source).map_err(|e| CommandError::Validation(e.to_string()))
    }
}

/// Properties accepted by `add` and `edit`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ElementProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<StyleMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Desired children, in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ChildDescriptor>>,
}

impl ElementProperties {
    pub fn is_empty(&self) -> bool {
        self.styles.is_none()
            && self.content.is_none()
            && self.settings.is_none()
            && self.label.is_none()
            && self.description.is_none()
            && self.children.is_none()
    }
}

/// Typed child entry inside `properties.children`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChildDescriptor {
    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<StyleMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ChildDescriptor>>,
}

impl ChildDescriptor {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            styles: None,
            content: None,
            settings: None,
            label: None,
            description: None,
            children: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ChildDescriptor>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn properties(&self) -> ElementProperties {
        ElementProperties {
            styles: self.styles.clone(),
            content: self.content.clone(),
            settings: self.settings.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            children: self.children.clone(),
        }
    }
}

/// Validated command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    Add {
        element_type: String,
        properties: ElementProperties,
        parent_id: Option<NodeId>,
        position: Option<usize>,
    },

    #[serde(rename_all = "camelCase")]
    Edit {
        target_id: NodeId,
        properties: ElementProperties,
    },

    #[serde(rename_all = "camelCase")]
    Remove { target_id: NodeId },
}

impl TryFrom<&Intent> for Command {
    type Error = CommandError;

    fn try_from(intent: &Intent) -> Result<Self, Self::Error> {
        let action = intent.action.trim().to_ascii_lowercase();
        let properties: ElementProperties = match &intent.properties {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| CommandError::Validation(format!("properties: {}", e)))?,
            None => ElementProperties::default(),
        };

        let target = |action: &str| {
            intent
                .target_id
                .clone()
                .ok_or_else(|| CommandError::MissingTarget {
                    action: action.to_string(),
                })
        };

        match action.as_str() {
            "add" => {
                let element_type = intent
                    .element_type
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(CommandError::MissingElementType)?;
                Ok(Command::Add {
                    element_type,
                    properties,
                    parent_id: intent.target_id.clone(),
                    position: intent.position,
                })
            }
            "edit" => {
                if properties.is_empty() {
                    return Err(CommandError::Validation(
                        "edit needs at least one property to change".to_string(),
                    ));
                }
                Ok(Command::Edit {
                    target_id: target("edit")?,
                    properties,
                })
            }
            "remove" => Ok(Command::Remove {
                target_id: target("remove")?,
            }),
            _ => Err(CommandError::UnknownAction(intent.action.clone())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown element type: {0}")]
    UnknownElementType(String),

    #[error("`add` requires an elementType")]
    MissingElementType,

    #[error("`{action}` requires a targetId")]
    MissingTarget { action: String },

    #[error("Invalid command: {0}")]
    Validation(String),

    #[error("Stale command: prepared against version {base}, document is at {current}")]
    Stale { base: u64, current: u64 },

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

impl CommandError {
    /// Plain-language message for the assistant reply
    pub fn user_message(&self) -> String {
        match self {
            CommandError::UnknownAction(action) => {
                format!("I can add, edit or remove elements, but not \"{}\".", action)
            }
            CommandError::UnknownElementType(element_type) => {
                format!("There is no \"{}\" element in the catalog.", element_type)
            }
            CommandError::MissingElementType => "Which kind of element should I add?".to_string(),
            CommandError::MissingTarget { action } => {
                format!("Which element should I {}?", action)
            }
            CommandError::Stale { .. } => {
                "The page changed while this edit was being prepared. Please try again.".to_string()
            }
            CommandError::Mutation(MutationError::NodeNotFound(id))
            | CommandError::Mutation(MutationError::ParentNotFound(id)) => {
                format!("The element {} no longer exists.", id)
            }
            CommandError::Mutation(MutationError::CycleDetected { .. }) => {
                "An element cannot be moved inside itself.".to_string()
            }
            other => format!("That change could not be applied: {}", other),
        }
    }
}

/// Result of a successful command
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    /// Created root (add) or target (edit/remove)
    pub primary: Option<NodeId>,
    pub created: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    /// Document version after the command
    pub version: u64,
}

impl CommandOutcome {
    fn from_outcomes(primary: NodeId, outcomes: &[MutationOutcome], version: u64) -> Self {
        let mut result = CommandOutcome {
            primary: Some(primary),
            version,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                MutationOutcome::Created { id } => result.created.push(id.clone()),
                MutationOutcome::Deleted { removed, .. } => result.removed.extend(removed.iter().cloned()),
                MutationOutcome::Updated { id } | MutationOutcome::Moved { id } => {
                    if !result.updated.contains(id) {
                        result.updated.push(id.clone());
                    }
                }
            }
        }

        let created = result.created.clone();
        result.updated.retain(|id| !created.contains(id));
        result
    }

    /// Every id the command touched
    pub fn affected(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .created
            .iter()
            .chain(&self.updated)
            .chain(&self.removed)
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Expands commands into batches against a template catalog
#[derive(Debug, Clone, Default)]
pub struct CommandInterpreter {
    templates: TemplateRegistry,
}

impl CommandInterpreter {
    pub fn new(templates: TemplateRegistry) -> Self {
        Self { templates }
    }

    pub fn builtin() -> Self {
        Self::new(TemplateRegistry::builtin())
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    /// Parse, check staleness and execute
    #[instrument(skip(self, doc, intent), fields(action = %intent.action))]
    pub fn submit(&self, doc: &mut Document, intent: &Intent) -> Result<CommandOutcome, CommandError> {
        let command = Command::try_from(intent)?;

        if let Some(base) = intent.base_version {
            if base != doc.version() {
                warn!(base, current = doc.version(), "Rejecting stale command");
                return Err(CommandError::Stale {
                    base,
                    current: doc.version(),
                });
            }
        }

        self.execute(doc, command)
    }

    pub fn execute(&self, doc: &mut Document, command: Command) -> Result<CommandOutcome, CommandError> {
        let mut ops = Vec::new();

        let (primary, label) = match &command {
            Command::Add {
                element_type,
                properties,
                parent_id,
                position,
            } => {
                let blueprint = self.blueprint(element_type, properties)?;
                let root = self.expand(doc, &blueprint, parent_id.clone(), *position, &mut ops);
                (root, format!("Add {}", element_type))
            }

            Command::Edit {
                target_id,
                properties,
            } => {
                if !doc.contains(target_id) {
                    return Err(MutationError::NodeNotFound(target_id.clone()).into());
                }
                push_updates(target_id, properties, &mut ops);
                if let Some(children) = &properties.children {
                    self.reconcile_children(doc, target_id, children, &mut ops)?;
                }
                (target_id.clone(), format!("Edit {}", target_id))
            }

            Command::Remove { target_id } => {
                ops.push(Mutation::DeleteNode {
                    node_id: target_id.clone(),
                });
                (target_id.clone(), format!("Remove {}", target_id))
            }
        };

        let outcomes = doc.batch_labeled(Some(&label), ops)?;
        let outcome = CommandOutcome::from_outcomes(primary, &outcomes, doc.version());

        info!(
            label = %label,
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            removed = outcome.removed.len(),
            version = outcome.version,
            "Command applied"
        );

        Ok(outcome)
    }

    /// Template blueprint for `element_type` with `properties` laid over it
    pub(crate) fn blueprint(
        &self,
        element_type: &str,
        properties: &ElementProperties,
    ) -> Result<Blueprint, CommandError> {
        let template = self
            .templates
            .get(element_type)
            .ok_or_else(|| CommandError::UnknownElementType(element_type.to_string()))?;

        let mut blueprint = template.instantiate();
        if let Some(styles) = &properties.styles {
            blueprint.styles.merge(styles);
        }
        if let Some(content) = &properties.content {
            blueprint.content = Some(content.clone());
        }
        if let Some(settings) = &properties.settings {
            merge_settings(&mut blueprint.settings, settings);
        }
        if let Some(label) = &properties.label {
            blueprint.label = Some(label.clone());
        }
        if let Some(description) = &properties.description {
            blueprint.description = Some(description.clone());
        }
        if let Some(children) = &properties.children {
            blueprint.children = children
                .iter()
                .map(|child| self.blueprint(&child.node_type, &child.properties()))
                .collect::<Result<_, _>>()?;
        }

        Ok(blueprint)
    }

    /// Append the ops creating `blueprint`; returns the new root id
    pub(crate) fn expand(
        &self,
        doc: &mut Document,
        blueprint: &Blueprint,
        parent_id: Option<NodeId>,
        position: Option<usize>,
        ops: &mut Vec<Mutation>,
    ) -> NodeId {
        let id = doc.allocate_id(blueprint.node_type.as_str());

        let configuration = match &blueprint.preset {
            Some(preset) => Configuration::preset(preset.clone()),
            None => Configuration::default(),
        };
        ops.push(Mutation::CreateNode {
            id: Some(id.clone()),
            node_type: blueprint.node_type.clone(),
            parent_id,
            position,
            props: NodeProps {
                configuration,
                settings: blueprint.settings.clone(),
                label: blueprint.label.clone(),
                description: blueprint.description.clone(),
                ..Default::default()
            },
        });

        if !blueprint.styles.is_empty() {
            ops.push(Mutation::UpdateStyles {
                node_id: id.clone(),
                styles: blueprint.styles.clone(),
            });
        }
        if let Some(content) = &blueprint.content {
            ops.push(Mutation::UpdateContent {
                node_id: id.clone(),
                content: content.clone(),
            });
        }

        for child in &blueprint.children {
            self.expand(doc, child, Some(id.clone()), None, ops);
        }

        id
    }
}

/// In-place property updates for an existing node
pub(crate) fn push_updates(id: &NodeId, properties: &ElementProperties, ops: &mut Vec<Mutation>) {
    if let Some(styles) = &properties.styles {
        if !styles.is_empty() {
            ops.push(Mutation::UpdateStyles {
                node_id: id.clone(),
                styles: styles.clone(),
            });
        }
    }
    if let Some(content) = &properties.content {
        ops.push(Mutation::UpdateContent {
            node_id: id.clone(),
            content: content.clone(),
        });
    }
    if let Some(settings) = &properties.settings {
        if !settings.is_empty() {
            ops.push(Mutation::UpdateSettings {
                node_id: id.clone(),
                settings: settings.clone(),
            });
        }
    }
    if properties.label.is_some() || properties.description.is_some() {
        ops.push(Mutation::UpdateMeta {
            node_id: id.clone(),
            label: properties.label.clone(),
            description: properties.description.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_add() {
        let intent = Intent::from_json(
            r#"{ "action": "add", "elementType": "button", "targetId": "root", "position": 1,
                 "properties": { "content": "Buy now", "styles": { "color": "red" } } }"#,
        )
        .unwrap();

        let command = Command::try_from(&intent).unwrap();
        match command {
            Command::Add {
                element_type,
                properties,
                parent_id,
                position,
            } => {
                assert_eq!(element_type, "button");
                assert_eq!(parent_id, Some("root".into()));
                assert_eq!(position, Some(1));
                assert_eq!(properties.content, Some(Content::text("Buy now")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_action_and_keys() {
        let unknown = Intent {
            action: "duplicate".to_string(),
            ..Default::default()
        };
        assert_eq!(
            Command::try_from(&unknown),
            Err(CommandError::UnknownAction("duplicate".to_string()))
        );

        let bad_key = Intent::edit("n-1", json!({ "colour": "red" }));
        assert!(matches!(Command::try_from(&bad_key), Err(CommandError::Validation(_))));
    }

    #[test]
    fn test_requires_target_and_type() {
        let remove = Intent {
            action: "remove".to_string(),
            ..Default::default()
        };
        assert_eq!(
            Command::try_from(&remove),
            Err(CommandError::MissingTarget {
                action: "remove".to_string()
            })
        );

        let add = Intent {
            action: "add".to_string(),
            ..Default::default()
        };
        assert_eq!(Command::try_from(&add), Err(CommandError::MissingElementType));

        let empty_edit = Intent::edit("n-1", json!({}));
        assert!(matches!(Command::try_from(&empty_edit), Err(CommandError::Validation(_))));
    }

    #[test]
    fn test_blueprint_overlay() {
        let interpreter = CommandInterpreter::builtin();
        let properties: ElementProperties = serde_json::from_value(json!({
            "label": "Pricing",
            "children": [{ "type": "heading", "content": "Plans" }]
        }))
        .unwrap();

        let blueprint = interpreter.blueprint("section", &properties).unwrap();

        assert_eq!(blueprint.label.as_deref(), Some("Pricing"));
        assert_eq!(blueprint.children.len(), 1);
        assert_eq!(blueprint.children[0].content, Some(Content::text("Plans")));
        assert_eq!(blueprint.children[0].preset.as_deref(), Some("heading"));

        let unknown: ElementProperties =
            serde_json::from_value(json!({ "children": [{ "type": "carousel" }] })).unwrap();
        assert_eq!(
            interpreter.blueprint("section", &unknown),
            Err(CommandError::UnknownElementType("carousel".to_string()))
        );
    }

    #[test]
    fn test_user_messages() {
        let err = CommandError::Mutation(MutationError::NodeNotFound("n-9".into()));
        assert_eq!(err.user_message(), "The element n-9 no longer exists.");
        assert!(CommandError::UnknownElementType("carousel".into())
            .user_message()
            .contains("carousel"));
    }
}
