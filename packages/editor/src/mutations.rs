//! # Store Mutations
//!
//! The primitive write operations on a [`NodeStore`]. Every change to a
//! document, including the compound ones produced by commands, is a
//! sequence of these.
//!
//! ## Mutation Semantics
//!
//! ### CreateNode
//! - Inserts a new node under `parent_id` (or as a root) at `position`
//! - `position` is clamped to the sibling list; absent means append
//! - The id must be assigned before applying; [`crate::Document`] fills
//!   in missing ids from its generator
//!
//! ### UpdateStyles / UpdateSettings
//! - Deep (styles) or shallow (settings) merge; `null` removes a key
//!
//! ### UpdateContent / UpdateMeta
//! - Atomic replacement. An empty label or description clears it
//!
//! ### DeleteNode
//! - Removes the node and all descendants
//!
//! ### Reparent
//! - Detaches the node, then inserts it at `position` in the new list
//! - `position` is interpreted after the node left its old list
//! - Fails if the new parent is the node itself or one of its descendants

use crate::store::NodeStore;
use pagecraft_common::{merge_settings, Content, Node, NodeId, NodeProps, NodeType, Settings, StyleMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primitive store operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Mutation {
    /// Insert a new node
    #[serde(rename_all = "camelCase")]
    CreateNode {
        #[serde(default)]
        id: Option<NodeId>,
        #[serde(rename = "type")]
        node_type: NodeType,
        #[serde(default)]
        parent_id: Option<NodeId>,
        #[serde(default)]
        position: Option<usize>,
        #[serde(default)]
        props: NodeProps,
    },

    /// Deep-merge a style patch into the node's instance styles
    #[serde(rename_all = "camelCase")]
    UpdateStyles { node_id: NodeId, styles: StyleMap },

    /// Replace content
    #[serde(rename_all = "camelCase")]
    UpdateContent { node_id: NodeId, content: Content },

    /// Merge a settings patch
    #[serde(rename_all = "camelCase")]
    UpdateSettings { node_id: NodeId, settings: Settings },

    /// Set label and/or description
    #[serde(rename_all = "camelCase")]
    UpdateMeta {
        node_id: NodeId,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },

    /// Remove a node and its whole subtree
    #[serde(rename_all = "camelCase")]
    DeleteNode { node_id: NodeId },

    /// Move a node to a new parent (or to the root list)
    #[serde(rename_all = "camelCase")]
    Reparent {
        node_id: NodeId,
        #[serde(default)]
        new_parent_id: Option<NodeId>,
        #[serde(default)]
        position: Option<usize>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("Node already exists: {0}")]
    DuplicateId(NodeId),

    #[error("Would create cycle: {node} cannot be placed under {parent}")]
    CycleDetected { node: NodeId, parent: NodeId },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid mutation: {0}")]
    Validation(String),
}

/// What a successfully applied mutation did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MutationOutcome {
    Created { id: NodeId },
    Updated { id: NodeId },
    /// `removed` lists the deleted node first, then its descendants
    Deleted { id: NodeId, removed: Vec<NodeId> },
    Moved { id: NodeId },
}

impl MutationOutcome {
    pub fn id(&self) -> &NodeId {
        match self {
            MutationOutcome::Created { id }
            | MutationOutcome::Updated { id }
            | MutationOutcome::Deleted { id, .. }
            | MutationOutcome::Moved { id } => id,
        }
    }
}

impl Mutation {
    /// The node this mutation targets, if already known
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Mutation::CreateNode { id, .. } => id.as_ref(),
            Mutation::UpdateStyles { node_id, .. }
            | Mutation::UpdateContent { node_id, .. }
            | Mutation::UpdateSettings { node_id, .. }
            | Mutation::UpdateMeta { node_id, .. }
            | Mutation::DeleteNode { node_id }
            | Mutation::Reparent { node_id, .. } => Some(node_id),
        }
    }

    /// Apply mutation to the store with validation
    pub fn apply(&self, store: &mut NodeStore) -> Result<MutationOutcome, MutationError> {
        self.validate(store)?;

        match self {
            Mutation::CreateNode {
                id,
                node_type,
                parent_id,
                position,
                props,
            } => {
                let id = id
                    .clone()
                    .ok_or_else(|| MutationError::Validation("node id not assigned".to_string()))?;
                Ok(Self::apply_create(store, id, node_type, parent_id.as_ref(), *position, props))
            }

            Mutation::UpdateStyles { node_id, styles } => {
                Self::with_node(store, node_id, |node| node.styles.merge(styles))
            }

            Mutation::UpdateContent { node_id, content } => {
                Self::with_node(store, node_id, |node| node.content = content.clone())
            }

            Mutation::UpdateSettings { node_id, settings } => {
                Self::with_node(store, node_id, |node| merge_settings(&mut node.settings, settings))
            }

            Mutation::UpdateMeta {
                node_id,
                label,
                description,
            } => Self::with_node(store, node_id, |node| {
                if let Some(label) = label {
                    node.label = non_empty(label);
                }
                if let Some(description) = description {
                    node.description = non_empty(description);
                }
            }),

            Mutation::DeleteNode { node_id } => Self::apply_delete(store, node_id),

            Mutation::Reparent {
                node_id,
                new_parent_id,
                position,
            } => Self::apply_reparent(store, node_id, new_parent_id.as_ref(), *position),
        }
    }

    fn apply_create(
        store: &mut NodeStore,
        id: NodeId,
        node_type: &NodeType,
        parent_id: Option<&NodeId>,
        position: Option<usize>,
        props: &NodeProps,
    ) -> MutationOutcome {
        let mut node = Node::from_props(id.clone(), node_type.clone(), props.clone());
        node.parent_id = parent_id.cloned();

        store.insert_detached(node);
        store.link(&id, parent_id, position);

        MutationOutcome::Created { id }
    }

    fn with_node(
        store: &mut NodeStore,
        node_id: &NodeId,
        update: impl FnOnce(&mut Node),
    ) -> Result<MutationOutcome, MutationError> {
        let node = store
            .get_mut(node_id)
            .ok_or_else(|| MutationError::NodeNotFound(node_id.clone()))?;
        update(node);

        Ok(MutationOutcome::Updated { id: node_id.clone() })
    }

    fn apply_delete(store: &mut NodeStore, node_id: &NodeId) -> Result<MutationOutcome, MutationError> {
        let parent = store
            .get(node_id)
            .ok_or_else(|| MutationError::NodeNotFound(node_id.clone()))?
            .parent_id
            .clone();

        let removed = store.subtree(node_id);
        store.unlink(node_id, parent.as_ref());
        for id in &removed {
            store.remove_detached(id);
        }

        Ok(MutationOutcome::Deleted {
            id: node_id.clone(),
            removed,
        })
    }

    fn apply_reparent(
        store: &mut NodeStore,
        node_id: &NodeId,
        new_parent_id: Option<&NodeId>,
        position: Option<usize>,
    ) -> Result<MutationOutcome, MutationError> {
        let old_parent = store
            .get(node_id)
            .ok_or_else(|| MutationError::NodeNotFound(node_id.clone()))?
            .parent_id
            .clone();

        store.unlink(node_id, old_parent.as_ref());
        if let Some(node) = store.get_mut(node_id) {
            node.parent_id = new_parent_id.cloned();
        }
        store.link(node_id, new_parent_id, position);

        Ok(MutationOutcome::Moved { id: node_id.clone() })
    }

    /// Validate without applying
    pub fn validate(&self, store: &NodeStore) -> Result<(), MutationError> {
        match self {
            Mutation::CreateNode {
                id,
                node_type,
                parent_id,
                ..
            } => {
                if node_type.as_str().trim().is_empty() {
                    return Err(MutationError::Validation("node type must not be empty".to_string()));
                }

                match id {
                    None => return Err(MutationError::Validation("node id not assigned".to_string())),
                    Some(id) if id.as_str().is_empty() => {
                        return Err(MutationError::Validation("node id must not be empty".to_string()))
                    }
                    Some(id) if store.contains(id) => return Err(MutationError::DuplicateId(id.clone())),
                    Some(_) => {}
                }

                if let Some(parent_id) = parent_id {
                    if !store.contains(parent_id) {
                        return Err(MutationError::ParentNotFound(parent_id.clone()));
                    }
                }

                Ok(())
            }

            Mutation::UpdateMeta {
                node_id,
                label: None,
                description: None,
            } => {
                Self::require(store, node_id)?;
                Err(MutationError::Validation(
                    "updateMeta needs a label or a description".to_string(),
                ))
            }

            Mutation::UpdateStyles { node_id, .. }
            | Mutation::UpdateContent { node_id, .. }
            | Mutation::UpdateSettings { node_id, .. }
            | Mutation::UpdateMeta { node_id, .. }
            | Mutation::DeleteNode { node_id } => Self::require(store, node_id),

            Mutation::Reparent {
                node_id,
                new_parent_id,
                ..
            } => {
                Self::require(store, node_id)?;

                if let Some(new_parent_id) = new_parent_id {
                    if !store.contains(new_parent_id) {
                        return Err(MutationError::ParentNotFound(new_parent_id.clone()));
                    }
                    if store.is_within(new_parent_id, node_id) {
                        return Err(MutationError::CycleDetected {
                            node: node_id.clone(),
                            parent: new_parent_id.clone(),
                        });
                    }
                }

                Ok(())
            }
        }
    }

    fn require(store: &NodeStore, node_id: &NodeId) -> Result<(), MutationError> {
        if store.contains(node_id) {
            Ok(())
        } else {
            Err(MutationError::NodeNotFound(node_id.clone()))
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(id: &str, ty: &str, parent: Option<&str>, position: Option<usize>) -> Mutation {
        Mutation::CreateNode {
            id: Some(id.into()),
            node_type: ty.into(),
            parent_id: parent.map(NodeId::from),
            position,
            props: NodeProps::default(),
        }
    }

    fn child_ids(store: &NodeStore, id: &str) -> Vec<String> {
        store
            .get(&id.into())
            .unwrap()
            .children
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_create_clamps_position() {
        let mut store = NodeStore::new();
        create("root", "section", None, None).apply(&mut store).unwrap();
        create("a", "text", Some("root"), None).apply(&mut store).unwrap();
        create("b", "text", Some("root"), Some(99)).apply(&mut store).unwrap();
        create("c", "text", Some("root"), Some(0)).apply(&mut store).unwrap();

        assert_eq!(child_ids(&store, "root"), vec!["c", "a", "b"]);
        assert_eq!(store.get(&"b".into()).unwrap().parent_id, Some("root".into()));
    }

    #[test]
    fn test_create_rejects_duplicate_and_missing_parent() {
        let mut store = NodeStore::new();
        create("root", "section", None, None).apply(&mut store).unwrap();

        assert_eq!(
            create("root", "section", None, None).apply(&mut store),
            Err(MutationError::DuplicateId("root".into()))
        );
        assert_eq!(
            create("x", "text", Some("ghost"), None).apply(&mut store),
            Err(MutationError::ParentNotFound("ghost".into()))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_create_without_id_is_rejected() {
        let mut store = NodeStore::new();
        let op = Mutation::CreateNode {
            id: None,
            node_type: "text".into(),
            parent_id: None,
            position: None,
            props: NodeProps::default(),
        };

        assert!(matches!(op.apply(&mut store), Err(MutationError::Validation(_))));
    }

    #[test]
    fn test_delete_removes_subtree() {
        let mut store = NodeStore::new();
        create("root", "section", None, None).apply(&mut store).unwrap();
        create("card", "card", Some("root"), None).apply(&mut store).unwrap();
        create("title", "heading", Some("card"), None).apply(&mut store).unwrap();
        create("other", "text", Some("root"), None).apply(&mut store).unwrap();

        let outcome = Mutation::DeleteNode { node_id: "card".into() }
            .apply(&mut store)
            .unwrap();

        assert_eq!(
            outcome,
            MutationOutcome::Deleted {
                id: "card".into(),
                removed: vec!["card".into(), "title".into()],
            }
        );
        assert!(!store.contains(&"title".into()));
        assert_eq!(child_ids(&store, "root"), vec!["other"]);
        assert!(store.check_integrity().is_ok());
    }

    #[test]
    fn test_reparent_rejects_cycle() {
        let mut store = NodeStore::new();
        create("root", "section", None, None).apply(&mut store).unwrap();
        create("a", "container", Some("root"), None).apply(&mut store).unwrap();
        create("b", "container", Some("a"), None).apply(&mut store).unwrap();

        let into_descendant = Mutation::Reparent {
            node_id: "a".into(),
            new_parent_id: Some("b".into()),
            position: None,
        };
        let into_self = Mutation::Reparent {
            node_id: "a".into(),
            new_parent_id: Some("a".into()),
            position: None,
        };

        assert!(matches!(into_descendant.apply(&mut store), Err(MutationError::CycleDetected { .. })));
        assert!(matches!(into_self.apply(&mut store), Err(MutationError::CycleDetected { .. })));
        assert!(store.check_integrity().is_ok());
    }

    #[test]
    fn test_reparent_within_same_parent_and_to_root() {
        let mut store = NodeStore::new();
        create("root", "section", None, None).apply(&mut store).unwrap();
        for id in ["a", "b", "c"] {
            create(id, "text", Some("root"), None).apply(&mut store).unwrap();
        }

        Mutation::Reparent {
            node_id: "a".into(),
            new_parent_id: Some("root".into()),
            position: Some(2),
        }
        .apply(&mut store)
        .unwrap();
        assert_eq!(child_ids(&store, "root"), vec!["b", "c", "a"]);

        Mutation::Reparent {
            node_id: "b".into(),
            new_parent_id: None,
            position: Some(0),
        }
        .apply(&mut store)
        .unwrap();
        assert_eq!(store.roots(), &[NodeId::from("b"), NodeId::from("root")]);
        assert!(store.get(&"b".into()).unwrap().is_root());
        assert!(store.check_integrity().is_ok());
    }

    #[test]
    fn test_updates_merge() {
        let mut store = NodeStore::new();
        create("t", "text", None, None).apply(&mut store).unwrap();

        let styles = StyleMap::try_from(json!({ "color": "red", ":hover": { "color": "blue" } })).unwrap();
        Mutation::UpdateStyles { node_id: "t".into(), styles }
            .apply(&mut store)
            .unwrap();
        let patch = StyleMap::try_from(json!({ "color": null, "fontSize": 14 })).unwrap();
        Mutation::UpdateStyles { node_id: "t".into(), styles: patch }
            .apply(&mut store)
            .unwrap();

        let node = store.get(&"t".into()).unwrap();
        assert_eq!(node.styles.get_str("color"), None);
        assert_eq!(node.styles.nested(":hover").and_then(|h| h.get_str("color")), Some("blue"));

        Mutation::UpdateMeta {
            node_id: "t".into(),
            label: Some("Intro".into()),
            description: None,
        }
        .apply(&mut store)
        .unwrap();
        assert_eq!(store.get(&"t".into()).unwrap().label.as_deref(), Some("Intro"));

        Mutation::UpdateMeta {
            node_id: "t".into(),
            label: Some(String::new()),
            description: None,
        }
        .apply(&mut store)
        .unwrap();
        assert_eq!(store.get(&"t".into()).unwrap().label, None);
    }

    #[test]
    fn test_wire_format() {
        let op: Mutation = serde_json::from_value(json!({
            "op": "reparent",
            "nodeId": "a",
            "newParentId": null,
            "position": 1
        }))
        .unwrap();

        assert_eq!(
            op,
            Mutation::Reparent {
                node_id: "a".into(),
                new_parent_id: None,
                position: Some(1),
            }
        );

        let create: Mutation = serde_json::from_value(json!({
            "op": "createNode",
            "type": "button",
            "parentId": "root",
            "props": { "content": "Buy" }
        }))
        .unwrap();
        assert_eq!(create.node_id(), None);
    }
}
