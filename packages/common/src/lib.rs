//! # Pagecraft Common
//!
//! Shared data model for the page builder: document nodes, style maps,
//! identifier allocation and tree traversal.

pub mod id_generator;
pub mod node;
pub mod style;
pub mod visitor;

pub use id_generator::*;
pub use node::*;
pub use style::*;
pub use visitor::*;
