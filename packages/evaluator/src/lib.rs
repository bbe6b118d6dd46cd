//! # Pagecraft Evaluator
//!
//! Read-side projections of the flat node store, shared by the live canvas,
//! the static export path and the structure outline:
//!
//! - [`build_hierarchy`]: flat node list → nested tree (+ integrity issues)
//! - [`resolve_style`]: layered style resolution for a single node
//!
//! Both are pure functions of their arguments.

pub mod hierarchy;
pub mod style_resolver;

pub use hierarchy::{build_hierarchy, Hierarchy, HierarchyIssue, TreeNode};
pub use style_resolver::{
    resolve_all, resolve_layers, resolve_state, resolve_style, StyleCatalog, TransientStyles,
};
