//! # Node Store
//!
//! Arena of document nodes. Nodes sit in a slot vector; an id → slot index
//! gives O(1) lookup, and freed slots are reused. Parent/child links are
//! ids, never references, so the store can be cloned cheaply into a
//! working copy for atomic batches and shared as an immutable snapshot.
//!
//! Writes go through [`crate::Mutation`]; this module only exposes the
//! read API publicly.

use crate::mutations::MutationError;
use pagecraft_common::{subtree_ids, walk_roots, Node, NodeId, NodeLookup, PreOrderCollector};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<NodeId, usize>,
    roots: Vec<NodeId>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.index
            .get(id)
            .and_then(|&slot| self.slots[slot].as_ref())
    }

    /// Top-level nodes, in page order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `id`, in document order
    pub fn children(&self, id: &NodeId) -> Result<Vec<&Node>, MutationError> {
        let node = self
            .get(id)
            .ok_or_else(|| MutationError::NodeNotFound(id.clone()))?;

        Ok(node
            .children
            .iter()
            .filter_map(|child| self.get(child))
            .collect())
    }

    /// All nodes in document order (roots in order, pre-order below)
    pub fn nodes(&self) -> Vec<&Node> {
        self.document_order()
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Nodes in slot order, cheaper than [`NodeStore::nodes`] when order
    /// does not matter
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn document_order(&self) -> Vec<NodeId> {
        let mut collector = PreOrderCollector::default();
        walk_roots(&mut collector, self, &self.roots);
        collector.ids
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut current = self.get(id).and_then(|n| n.parent_id.clone());
        while let Some(parent) = current {
            if !seen.insert(parent.clone()) {
                break;
            }
            current = self.get(&parent).and_then(|n| n.parent_id.clone());
            out.push(parent);
        }
        out
    }

    /// `id` and everything below it, pre-order
    pub fn subtree(&self, id: &NodeId) -> Vec<NodeId> {
        subtree_ids(self, id)
    }

    /// True if `candidate` is `ancestor` or lies below it
    pub fn is_within(&self, candidate: &NodeId, ancestor: &NodeId) -> bool {
        candidate == ancestor || self.ancestors(candidate).contains(ancestor)
    }

    /// Ids whose node differs between the two stores (added, removed or changed)
    pub fn diff_ids(&self, other: &NodeStore) -> Vec<NodeId> {
        let mut changed: Vec<NodeId> = self
            .iter()
            .filter(|node| other.get(&node.id) != Some(*node))
            .map(|node| node.id.clone())
            .collect();
        changed.extend(
            other
                .iter()
                .filter(|node| !self.contains(&node.id))
                .map(|node| node.id.clone()),
        );
        changed.sort();
        changed
    }

    /// Verify every structural invariant of the store
    pub fn check_integrity(&self) -> Result<(), MutationError> {
        for (id, &slot) in &self.index {
            match self.slots.get(slot).and_then(Option::as_ref) {
                Some(node) if &node.id == id => {}
                _ => {
                    return Err(MutationError::InvalidStructure(format!(
                        "index entry {} points at the wrong slot",
                        id
                    )))
                }
            }
        }

        let mut listed: HashSet<&NodeId> = HashSet::new();
        for root in &self.roots {
            let node = self
                .get(root)
                .ok_or_else(|| MutationError::NodeNotFound(root.clone()))?;
            if node.parent_id.is_some() {
                return Err(MutationError::InvalidStructure(format!(
                    "{} is listed as a root but has a parent",
                    root
                )));
            }
            if !listed.insert(root) {
                return Err(MutationError::InvalidStructure(format!("{} listed twice", root)));
            }
        }

        for node in self.iter() {
            for child_id in &node.children {
                let child = self
                    .get(child_id)
                    .ok_or_else(|| MutationError::NodeNotFound(child_id.clone()))?;
                if child.parent_id.as_ref() != Some(&node.id) {
                    return Err(MutationError::InvalidStructure(format!(
                        "{} lists {} as a child but its parent is {:?}",
                        node.id, child_id, child.parent_id
                    )));
                }
                if !listed.insert(child_id) {
                    return Err(MutationError::InvalidStructure(format!(
                        "{} listed twice",
                        child_id
                    )));
                }
            }
        }

        // Every node is listed exactly once; anything unreachable from the
        // roots must then sit on a parent cycle.
        if listed.len() != self.len() {
            return Err(MutationError::InvalidStructure(
                "some nodes are not listed by any parent".to_string(),
            ));
        }
        let reachable = self.document_order();
        if reachable.len() != self.len() {
            let seen: HashSet<&NodeId> = reachable.iter().collect();
            if let Some(node) = self.iter().find(|n| !seen.contains(&n.id)) {
                return Err(MutationError::CycleDetected {
                    node: node.id.clone(),
                    parent: node.parent_id.clone().unwrap_or_else(|| node.id.clone()),
                });
            }
        }

        Ok(())
    }

    // Primitive writes, used by mutations and hydration. Callers validate.

    pub(crate) fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        match self.index.get(id) {
            Some(&slot) => self.slots[slot].as_mut(),
            None => None,
        }
    }

    /// Put a node into the arena without touching any sibling list
    pub(crate) fn insert_detached(&mut self, node: Node) {
        let id = node.id.clone();
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
    }

    /// Take a node out of the arena without touching any sibling list
    pub(crate) fn remove_detached(&mut self, id: &NodeId) -> Option<Node> {
        let slot = self.index.remove(id)?;
        self.free.push(slot);
        self.slots[slot].take()
    }

    /// Sibling list a node with this parent lives in
    pub(crate) fn sibling_list_mut(&mut self, parent: Option<&NodeId>) -> Option<&mut Vec<NodeId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(parent) => self.get_mut(parent).map(|node| &mut node.children),
        }
    }

    /// Insert `id` into its parent's list at `position`, clamped to the list length
    pub(crate) fn link(&mut self, id: &NodeId, parent: Option<&NodeId>, position: Option<usize>) -> usize {
        let Some(list) = self.sibling_list_mut(parent) else {
            return 0;
        };
        let at = position.unwrap_or(list.len()).min(list.len());
        list.insert(at, id.clone());
        at
    }

    /// Remove `id` from its parent's list, returning its former position
    pub(crate) fn unlink(&mut self, id: &NodeId, parent: Option<&NodeId>) -> Option<usize> {
        let list = self.sibling_list_mut(parent)?;
        let position = list.iter().position(|c| c == id)?;
        list.remove(position);
        Some(position)
    }
}

impl NodeLookup for NodeStore {
    fn lookup(&self, id: &NodeId) -> Option<&Node> {
        self.get(id)
    }
}
