//! # Hierarchy Projection
//!
//! Projects a flat node list into nested roots for rendering and for the
//! structure outline.
//!
//! The projection follows `children` lists and never fails. Anything it
//! cannot place is skipped and reported as a [`HierarchyIssue`], so callers
//! can tell a clean tree from one that masks upstream corruption.

use pagecraft_common::{Node, NodeId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};
use tracing::{debug, instrument, warn};

/// A node with its resolved children
///
/// Building, walking and dropping a tree use explicit stacks. The derived
/// `Clone`, `PartialEq` and `Serialize` impls recurse once per level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<'a> {
    pub node: &'a Node,
    pub children: Vec<TreeNode<'a>>,
}

impl<'a> TreeNode<'a> {
    pub fn id(&self) -> &'a NodeId {
        &self.node.id
    }

    /// This subtree in pre-order, with each node's depth below `self`
    pub fn pre_order(&self) -> Vec<(&TreeNode<'a>, usize)> {
        let mut out = Vec::new();
        let mut stack = vec![(self, 0)];
        while let Some((tree, depth)) = stack.pop() {
            out.push((tree, depth));
            stack.extend(tree.children.iter().rev().map(|child| (child, depth + 1)));
        }
        out
    }

    /// Number of nodes in this subtree, including self
    pub fn size(&self) -> usize {
        self.pre_order().len()
    }

    pub fn find(&self, id: &NodeId) -> Option<&TreeNode<'a>> {
        self.pre_order()
            .into_iter()
            .map(|(tree, _)| tree)
            .find(|tree| &tree.node.id == id)
    }
}

impl Drop for TreeNode<'_> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut tree) = pending.pop() {
            pending.append(&mut tree.children);
        }
    }
}

/// Something the projection had to skip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HierarchyIssue {
    /// `parent.children` names an id with no matching node
    DanglingChild { parent: NodeId, child: NodeId },

    /// A child id that was already placed (shared child or cycle)
    RevisitedChild { parent: NodeId, child: NodeId },

    /// Node listed under a parent its own `parent_id` disagrees with
    ParentMismatch { parent: NodeId, child: NodeId },

    /// Node whose `parent_id` references a missing node
    OrphanedNode { node: NodeId, missing_parent: NodeId },

    /// Node that is neither a root nor listed by its parent
    UnreachableNode { node: NodeId },

    /// Same id appears more than once in the input (first one wins)
    DuplicateId { node: NodeId },
}

impl fmt::Display for HierarchyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyIssue::DanglingChild { parent, child } => {
                write!(f, "{} lists missing child {}", parent, child)
            }
            HierarchyIssue::RevisitedChild { parent, child } => {
                write!(f, "{} lists {} which was already placed", parent, child)
            }
            HierarchyIssue::ParentMismatch { parent, child } => {
                write!(f, "{} lists {} but {} names another parent", parent, child, child)
            }
            HierarchyIssue::OrphanedNode { node, missing_parent } => {
                write!(f, "{} points at missing parent {}", node, missing_parent)
            }
            HierarchyIssue::UnreachableNode { node } => write!(f, "{} is unreachable", node),
            HierarchyIssue::DuplicateId { node } => write!(f, "duplicate id {}", node),
        }
    }
}

/// Result of [`build_hierarchy`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hierarchy<'a> {
    pub roots: Vec<TreeNode<'a>>,
    pub issues: Vec<HierarchyIssue>,
}

impl<'a> Hierarchy<'a> {
    /// True when every input node was placed exactly once
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.roots.iter().map(TreeNode::size).sum()
    }

    pub fn find(&self, id: &NodeId) -> Option<&TreeNode<'a>> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    /// Indented structure view, one line per node
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for (tree, depth) in self.roots.iter().flat_map(TreeNode::pre_order) {
            let node = tree.node;
            let _ = write!(out, "{}{}", "  ".repeat(depth), node.node_type);
            if let Some(label) = &node.label {
                let _ = write!(out, " \"{}\"", label);
            }
            let _ = writeln!(out, " [{}]", node.id);
        }
        out
    }
}

/// Project a flat node list into nested roots.
///
/// Roots are the nodes with no `parent_id`, in input order. Identical
/// input (including child order) always yields identical output.
#[instrument(skip(nodes), fields(nodes = nodes.len()))]
pub fn build_hierarchy(nodes: &[Node]) -> Hierarchy<'_> {
    let mut issues = Vec::new();

    let mut index: HashMap<&NodeId, &Node> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if index.contains_key(&node.id) {
            issues.push(HierarchyIssue::DuplicateId {
                node: node.id.clone(),
            });
        } else {
            index.insert(&node.id, node);
        }
    }

    let mut builder = Builder {
        index: &index,
        placed: HashSet::with_capacity(nodes.len()),
        issues,
    };

    let mut roots = Vec::new();
    for node in nodes {
        if node.parent_id.is_none() && !builder.placed.contains(&node.id) {
            roots.push(builder.build(node));
        }
    }

    let mut issues = builder.issues;
    let mut reported: HashSet<&NodeId> = HashSet::new();
    for node in nodes {
        if builder.placed.contains(&node.id) || !reported.insert(&node.id) {
            continue;
        }
        match &node.parent_id {
            Some(parent) if !index.contains_key(parent) => {
                issues.push(HierarchyIssue::OrphanedNode {
                    node: node.id.clone(),
                    missing_parent: parent.clone(),
                });
            }
            _ => issues.push(HierarchyIssue::UnreachableNode {
                node: node.id.clone(),
            }),
        }
    }

    if issues.is_empty() {
        debug!(roots = roots.len(), "Hierarchy built");
    } else {
        warn!(roots = roots.len(), issues = issues.len(), "Hierarchy built with skipped references");
    }

    Hierarchy { roots, issues }
}

struct Builder<'a, 'i> {
    index: &'i HashMap<&'a NodeId, &'a Node>,
    placed: HashSet<&'a NodeId>,
    issues: Vec<HierarchyIssue>,
}

/// A node whose children are still being placed
struct Frame<'a> {
    node: &'a Node,
    next: usize,
    children: Vec<TreeNode<'a>>,
}

impl<'a> Frame<'a> {
    fn new(node: &'a Node) -> Self {
        Self {
            node,
            next: 0,
            children: Vec::with_capacity(node.children.len()),
        }
    }
}

impl<'a, 'i> Builder<'a, 'i> {
    fn build(&mut self, root: &'a Node) -> TreeNode<'a> {
        self.placed.insert(&root.id);

        let mut frames: Vec<Frame<'a>> = Vec::new();
        let mut current = Frame::new(root);
        loop {
            let node = current.node;
            if let Some(child_id) = node.children.get(current.next) {
                current.next += 1;
                if let Some(child) = self.accept(node, child_id) {
                    self.placed.insert(&child.id);
                    frames.push(std::mem::replace(&mut current, Frame::new(child)));
                }
                continue;
            }

            let finished = TreeNode {
                node,
                children: std::mem::take(&mut current.children),
            };
            match frames.pop() {
                Some(parent) => {
                    current = parent;
                    current.children.push(finished);
                }
                None => return finished,
            }
        }
    }

    /// Resolve a child reference, recording why it cannot be placed
    fn accept(&mut self, parent: &'a Node, child_id: &'a NodeId) -> Option<&'a Node> {
        let Some(child) = self.index.get(child_id).copied() else {
            self.issues.push(HierarchyIssue::DanglingChild {
                parent: parent.id.clone(),
                child: child_id.clone(),
            });
            return None;
        };

        if self.placed.contains(&child.id) {
            self.issues.push(HierarchyIssue::RevisitedChild {
                parent: parent.id.clone(),
                child: child_id.clone(),
            });
            return None;
        }

        if child.parent_id.as_ref() != Some(&parent.id) {
            self.issues.push(HierarchyIssue::ParentMismatch {
                parent: parent.id.clone(),
                child: child_id.clone(),
            });
        }

        Some(child)
    }
}
