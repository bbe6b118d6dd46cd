use crate::node::{Node, NodeId};
use std::collections::HashMap;

/// Read access to nodes by id, implemented by every flat node container
pub trait NodeLookup {
    fn lookup(&self, id: &NodeId) -> Option<&Node>;
}

impl NodeLookup for HashMap<NodeId, Node> {
    fn lookup(&self, id: &NodeId) -> Option<&Node> {
        self.get(id)
    }
}

/// Visitor pattern for traversing the node tree in document order
///
/// The walk keeps its own work stack, so nesting depth is bounded by memory
/// rather than by the call stack. Return `false` from `visit_node` to skip
/// a node's children. Child ids without a matching node are skipped.
pub trait Visitor {
    fn visit_node(&mut self, node: &Node, depth: usize) -> bool;
}

/// Visit every root in order, each followed by its subtree
pub fn walk_roots<V: Visitor, L: NodeLookup + ?Sized>(visitor: &mut V, tree: &L, roots: &[NodeId]) {
    let mut stack: Vec<(&Node, usize)> = roots
        .iter()
        .rev()
        .filter_map(|id| tree.lookup(id))
        .map(|node| (node, 0))
        .collect();

    while let Some((node, depth)) = stack.pop() {
        if !visitor.visit_node(node, depth) {
            continue;
        }
        stack.extend(
            node.children
                .iter()
                .rev()
                .filter_map(|id| tree.lookup(id))
                .map(|child| (child, depth + 1)),
        );
    }
}

/// Collects ids in pre-order (parent before children)
#[derive(Debug, Default)]
pub struct PreOrderCollector {
    pub ids: Vec<NodeId>,
}

impl Visitor for PreOrderCollector {
    fn visit_node(&mut self, node: &Node, _depth: usize) -> bool {
        self.ids.push(node.id.clone());
        true
    }
}

/// Ids of `start` and everything below it, in pre-order
pub fn subtree_ids<L: NodeLookup + ?Sized>(tree: &L, start: &NodeId) -> Vec<NodeId> {
    let mut collector = PreOrderCollector::default();
    walk_roots(&mut collector, tree, std::slice::from_ref(start));
    collector.ids
}
