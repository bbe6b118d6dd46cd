//! # Undo/Redo Stack
//!
//! Snapshot history for document editing.
//!
//! ## Design
//!
//! - Each committed batch records the store as it was *before* the batch
//! - Snapshots are `Arc<NodeStore>`; recording one is a pointer copy
//! - Undo swaps the current store for the recorded one and keeps the
//!   current store on the redo stack; redo does the reverse
//! - New batches clear the redo stack
//! - An open interaction (drag, resize, typing burst) collapses all of
//!   its batches into one undo step
//!
//! Because restore is a swap, k undos followed by k redos yield a store
//! identical to the one before the undos.

use crate::store::NodeStore;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

/// One undoable step
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Store to restore when this entry is applied
    pub snapshot: Arc<NodeStore>,

    pub label: Option<String>,

    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    fn new(snapshot: Arc<NodeStore>, label: Option<String>) -> Self {
        Self {
            snapshot,
            label,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct Interaction {
    before: Arc<NodeStore>,
    label: Option<String>,
    changed: bool,
}

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct UndoStack {
    /// Stack of states to go back to (most recent last)
    undo_stack: VecDeque<HistoryEntry>,

    /// Stack of undone states (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently coalescing an interaction
    current_interaction: Option<Interaction>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_interaction: None,
        }
    }

    /// Record the pre-batch store. Inside an interaction this only marks
    /// the interaction as dirty.
    pub fn record(&mut self, before: Arc<NodeStore>, label: Option<String>) {
        if let Some(interaction) = &mut self.current_interaction {
            if !interaction.changed {
                // New action invalidates future
                self.redo_stack.clear();
            }
            interaction.changed = true;
            if interaction.label.is_none() {
                interaction.label = label;
            }
            return;
        }

        self.push_entry(HistoryEntry::new(before, label));
    }

    /// Start coalescing. `current` is the store the whole interaction
    /// undoes back to. Nested calls are ignored.
    pub fn begin_interaction(&mut self, current: Arc<NodeStore>, label: Option<String>) {
        if self.current_interaction.is_some() {
            return;
        }
        self.current_interaction = Some(Interaction {
            before: current,
            label,
            changed: false,
        });
    }

    /// Close the open interaction. Returns true if it produced an undo step.
    pub fn end_interaction(&mut self) -> bool {
        match self.current_interaction.take() {
            Some(interaction) if interaction.changed => {
                self.push_entry(HistoryEntry::new(interaction.before, interaction.label));
                true
            }
            _ => false,
        }
    }

    pub fn in_interaction(&self) -> bool {
        self.current_interaction.is_some()
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push_back(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.pop_front();
        }

        // New action invalidates future
        self.redo_stack.clear();
    }

    /// Step back. Returns the store to install, or `None` if there is
    /// nothing to undo.
    pub fn undo(&mut self, current: Arc<NodeStore>) -> Option<Arc<NodeStore>> {
        let entry = self.undo_stack.pop_back()?;
        self.redo_stack
            .push(HistoryEntry::new(current, entry.label.clone()));
        Some(entry.snapshot)
    }

    /// Step forward again
    pub fn redo(&mut self, current: Arc<NodeStore>) -> Option<Arc<NodeStore>> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack
            .push_back(HistoryEntry::new(current, entry.label.clone()));
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.pop_front();
        }
        Some(entry.snapshot)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_interaction = None;
    }

    /// Label of the next undo step
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().and_then(|entry| entry.label.as_deref())
    }

    /// Label of the next redo step
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().and_then(|entry| entry.label.as_deref())
    }

    /// Most recent undo entry
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
