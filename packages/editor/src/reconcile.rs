//! # Child Reconciliation
//!
//! Applies an ordered list of typed child descriptors to an existing node
//! with as little churn as possible. Matching is by type ordinal: the k-th
//! descriptor of type `T` reuses the k-th existing child of type `T`.
//!
//! - matched children keep their id and are updated in place
//! - unmatched descriptors become new nodes (expanded from templates)
//! - unmatched existing children are deleted
//! - reused children are moved only when their position differs
//!
//! Descriptors naming a template (e.g. `hero`) match on the node type the
//! template produces (`section`).
//!
//! Example: children `[heading A, button B]` reconciled against
//! `[heading, button, button]` keeps A and B and creates one button.

use crate::commands::{push_updates, ChildDescriptor, CommandError, CommandInterpreter};
use crate::document::Document;
use crate::mutations::Mutation;
use pagecraft_common::NodeId;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

impl CommandInterpreter {
    /// Node type a descriptor expands to: its template's root type, or the
    /// descriptor type itself when no template has that name
    fn produced_type<'a>(&'a self, element_type: &'a str) -> &'a str {
        self.templates()
            .get(element_type)
            .map(|template| template.blueprint.node_type.as_str())
            .unwrap_or(element_type)
    }

    /// Append the ops that turn `parent`'s children into `desired`
    pub(crate) fn reconcile_children(
        &self,
        doc: &mut Document,
        parent: &NodeId,
        desired: &[ChildDescriptor],
        ops: &mut Vec<Mutation>,
    ) -> Result<(), CommandError> {
        let existing: Vec<(NodeId, String)> = doc
            .get_children(parent)?
            .into_iter()
            .map(|child| (child.id.clone(), child.node_type.to_string()))
            .collect();

        let mut by_type: HashMap<&str, VecDeque<&NodeId>> = HashMap::new();
        for (id, node_type) in &existing {
            by_type.entry(node_type.as_str()).or_default().push_back(id);
        }

        let matches: Vec<Option<NodeId>> = desired
            .iter()
            .map(|descriptor| {
                by_type
                    .get_mut(self.produced_type(&descriptor.node_type))
                    .and_then(VecDeque::pop_front)
                    .cloned()
            })
            .collect();

        // Simulated child order, kept in step with the emitted ops
        let mut order: Vec<NodeId> = Vec::with_capacity(desired.len());
        for (id, _) in &existing {
            if matches.iter().flatten().any(|m| m == id) {
                order.push(id.clone());
            } else {
                ops.push(Mutation::DeleteNode { node_id: id.clone() });
            }
        }

        let mut created = 0;
        let mut moved = 0;
        for (index, (descriptor, matched)) in desired.iter().zip(&matches).enumerate() {
            match matched {
                Some(id) => {
                    let current = order.iter().position(|o| o == id).unwrap_or(index);
                    if current != index {
                        let node = order.remove(current);
                        order.insert(index, node);
                        ops.push(Mutation::Reparent {
                            node_id: id.clone(),
                            new_parent_id: Some(parent.clone()),
                            position: Some(index),
                        });
                        moved += 1;
                    }

                    let properties = descriptor.properties();
                    push_updates(id, &properties, ops);
                    if let Some(grandchildren) = &descriptor.children {
                        self.reconcile_children(doc, id, grandchildren, ops)?;
                    }
                }
                None => {
                    let blueprint = self.blueprint(&descriptor.node_type, &descriptor.properties())?;
                    let id = self.expand(doc, &blueprint, Some(parent.clone()), Some(index), ops);
                    order.insert(index.min(order.len()), id);
                    created += 1;
                }
            }
        }

        debug!(
            parent = %parent,
            reused = matches.iter().flatten().count(),
            created,
            moved,
            deleted = existing.len() - matches.iter().flatten().count(),
            "Children reconciled"
        );

        Ok(())
    }
}
