//! # Pagecraft Editor
//!
//! Core document editing engine for Pagecraft pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ commands: intent → template expansion,      │
//! │           child reconciliation              │
//! └─────────────────────────────────────────────┘
//!                     ↓ one batch
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document lifecycle + mutations      │
//! │  - Arena node store, validated mutations    │
//! │  - Atomic batches on a working copy         │
//! │  - Snapshot undo/redo, change broadcast     │
//! │  - Load/save flat node records              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ evaluator: hierarchy + resolved styles      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Flat store is source of truth**: the nested tree is a projection
//! 2. **Fail closed**: every batch validates as it applies; a failure
//!    leaves the store untouched
//! 3. **One batch, one undo step**: template expansions undo as a whole
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagecraft_editor::{CommandInterpreter, Document, Intent};
//!
//! let mut doc = Document::new("home");
//! let interpreter = CommandInterpreter::builtin();
//!
//! // Add a hero section, then a button inside it
//! let hero = interpreter.submit(&mut doc, &Intent::add("hero"))?;
//! let cta = Intent::add("button").with_target(hero.primary.unwrap());
//! interpreter.submit(&mut doc, &cta)?;
//!
//! doc.undo();
//! ```

mod commands;
mod document;
mod errors;
mod mutations;
mod persistence;
mod reconcile;
mod store;
mod templates;
mod undo_stack;

pub use commands::{ChildDescriptor, Command, CommandError, CommandInterpreter, CommandOutcome, ElementProperties, Intent};
pub use document::{ChangeCause, Document, StoreEvent};
pub use errors::EditorError;
pub use mutations::{Mutation, MutationError, MutationOutcome};
pub use persistence::{HydrateReport, JsonFileSink, MemorySink, PersistenceError, SnapshotSink};
pub use store::NodeStore;
pub use templates::{Blueprint, Template, TemplateRegistry};
pub use undo_stack::{HistoryEntry, UndoStack};

// Re-export common types for convenience
pub use pagecraft_common::{Content, Node, NodeId, NodeProps, NodeType, Settings, StyleMap};
