//! # Document Handle
//!
//! A `Document` owns one page's node store together with its id
//! generator, undo history, version counter and change channel. It is the
//! only way to write to the store.
//!
//! Documents can be:
//! - **Memory-backed**: created with [`Document::new`]
//! - **File-backed**: opened with [`Document::load`], written back with
//!   [`Document::save`]
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Hydrate → Edit (batches) → Serialize → Save
//!   ↓       ↓            ↓               ↓        ↓
//! File    Store     Snapshots         Records   File
//! ```

use crate::mutations::{Mutation, MutationError, MutationOutcome};
use crate::persistence::{HydrateReport, JsonFileSink, SnapshotSink};
use crate::store::NodeStore;
use crate::undo_stack::UndoStack;
use crate::EditorError;
use pagecraft_common::{Content, IdGenerator, Node, NodeId, NodeProps, NodeType, Settings, StyleMap};
use pagecraft_evaluator::{build_hierarchy, resolve_all, StyleCatalog, TransientStyles};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

const EVENT_CAPACITY: usize = 256;

/// Why the store changed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChangeCause {
    Batch { label: Option<String> },
    Undo,
    Redo,
    Hydrate,
}

/// Broadcast after every state change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEvent {
    pub version: u64,
    pub cause: ChangeCause,
    /// Ids created, changed or removed by the change
    pub affected: Vec<NodeId>,
}

/// Editable page document
#[derive(Debug)]
pub struct Document {
    name: String,

    /// Path to records file (if any)
    path: Option<PathBuf>,

    /// Current version number (increments on each committed change)
    version: u64,

    store: Arc<NodeStore>,
    ids: IdGenerator,
    history: UndoStack,
    dirty: bool,
    events: broadcast::Sender<StoreEvent>,
}

impl Document {
    /// Empty memory-backed document
    pub fn new(name: &str) -> Self {
        Self::with_history_depth(name, UndoStack::new().max_levels())
    }

    pub fn with_history_depth(name: &str, depth: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            name: name.to_string(),
            path: None,
            version: 0,
            store: Arc::new(NodeStore::new()),
            ids: IdGenerator::new(name),
            history: UndoStack::with_max_levels(depth),
            dirty: false,
            events,
        }
    }

    /// Open a records file (file-backed). The document is named after the
    /// file stem; a missing file opens as an empty document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("untitled");

        let mut doc = Self::new(name);
        if let Some(records) = JsonFileSink::new(path).load()? {
            doc.hydrate(records)?;
        }
        doc.path = Some(path.to_path_buf());
        doc.dirty = false;
        Ok(doc)
    }

    /// Write records back to the file this document was loaded from
    pub fn save(&mut self) -> Result<(), EditorError> {
        let path = self.path.clone().ok_or(EditorError::NotFileBacked)?;
        self.save_to(&mut JsonFileSink::new(path))
    }

    pub fn save_to(&mut self, sink: &mut dyn SnapshotSink) -> Result<(), EditorError> {
        sink.save(&self.serialize())?;
        self.dirty = false;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Declare the current state persisted (e.g. after restoring from a sink)
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Immutable view of the current state; stays valid across later edits
    pub fn snapshot(&self) -> Arc<NodeStore> {
        Arc::clone(&self.store)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // Read API

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.store.get(id)
    }

    pub fn get_children(&self, id: &NodeId) -> Result<Vec<&Node>, MutationError> {
        self.store.children(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        self.store.roots()
    }

    pub fn nodes(&self) -> Vec<&Node> {
        self.store.nodes()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.store.contains(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        self.store.ancestors(id)
    }

    /// Everything below `id`, pre-order, excluding `id`
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut ids = self.store.subtree(id);
        if !ids.is_empty() {
            ids.remove(0);
        }
        ids
    }

    pub fn check_integrity(&self) -> Result<(), MutationError> {
        self.store.check_integrity()
    }

    /// Indented structure view of the page
    pub fn outline(&self) -> String {
        let records = self.serialize();
        let outline = build_hierarchy(&records).outline();
        outline
    }

    /// Effective styles of every node
    pub fn resolve_styles(&self, catalog: &StyleCatalog, transient: &TransientStyles) -> HashMap<NodeId, StyleMap> {
        let records = self.serialize();
        resolve_all(&records, catalog, transient)
    }

    // Mutation API

    /// Reserve a fresh id. Ids are never handed out twice, even if the
    /// batch that uses them fails.
    pub fn allocate_id(&mut self, type_tag: &str) -> NodeId {
        let store = &self.store;
        self.ids.new_id_avoiding(type_tag, |candidate| store.contains(&NodeId::from(candidate)))
    }

    pub fn create_node(
        &mut self,
        node_type: impl Into<NodeType>,
        parent_id: Option<NodeId>,
        position: Option<usize>,
        props: NodeProps,
    ) -> Result<NodeId, MutationError> {
        let outcomes = self.batch(vec![Mutation::CreateNode {
            id: None,
            node_type: node_type.into(),
            parent_id,
            position,
            props,
        }])?;
        Ok(single(outcomes)?.id().clone())
    }

    pub fn update_styles(&mut self, node_id: NodeId, styles: StyleMap) -> Result<(), MutationError> {
        self.batch(vec![Mutation::UpdateStyles { node_id, styles }]).map(|_| ())
    }

    pub fn update_content(&mut self, node_id: NodeId, content: impl Into<Content>) -> Result<(), MutationError> {
        self.batch(vec![Mutation::UpdateContent {
            node_id,
            content: content.into(),
        }])
        .map(|_| ())
    }

    pub fn update_settings(&mut self, node_id: NodeId, settings: Settings) -> Result<(), MutationError> {
        self.batch(vec![Mutation::UpdateSettings { node_id, settings }]).map(|_| ())
    }

    pub fn update_meta(
        &mut self,
        node_id: NodeId,
        label: Option<String>,
        description: Option<String>,
    ) -> Result<(), MutationError> {
        self.batch(vec![Mutation::UpdateMeta {
            node_id,
            label,
            description,
        }])
        .map(|_| ())
    }

    /// Delete a node and its subtree; returns every removed id
    pub fn delete_node(&mut self, node_id: NodeId) -> Result<Vec<NodeId>, MutationError> {
        match single(self.batch(vec![Mutation::DeleteNode { node_id }])?)? {
            MutationOutcome::Deleted { removed, .. } => Ok(removed),
            other => Ok(vec![other.id().clone()]),
        }
    }

    pub fn reparent(
        &mut self,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        position: Option<usize>,
    ) -> Result<(), MutationError> {
        self.batch(vec![Mutation::Reparent {
            node_id,
            new_parent_id,
            position,
        }])
        .map(|_| ())
    }

    pub fn batch(&mut self, ops: Vec<Mutation>) -> Result<Vec<MutationOutcome>, MutationError> {
        self.batch_labeled(None, ops)
    }

    /// Apply `ops` atomically as one undo step.
    ///
    /// The ops run against a working copy; the copy replaces the store only
    /// if all of them succeed. An empty batch changes nothing.
    #[instrument(skip(self, ops), fields(doc = %self.name, ops = ops.len(), version = self.version))]
    pub fn batch_labeled(
        &mut self,
        label: Option<&str>,
        ops: Vec<Mutation>,
    ) -> Result<Vec<MutationOutcome>, MutationError> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let mut working = NodeStore::clone(&self.store);
        let mut outcomes = Vec::with_capacity(ops.len());

        for (index, op) in ops.into_iter().enumerate() {
            let op = assign_id(&mut self.ids, op, &working);
            match op.apply(&mut working) {
                Ok(outcome) => {
                    debug!(index, outcome = ?outcome, "Applied mutation");
                    outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(index, error = %e, "Batch rejected, store unchanged");
                    return Err(e);
                }
            }
        }

        debug_assert!(working.check_integrity().is_ok());

        let previous = std::mem::replace(&mut self.store, Arc::new(working));
        self.history.record(previous, label.map(str::to_string));
        self.version += 1;
        self.dirty = true;

        info!(version = self.version, nodes = self.store.len(), "Batch committed");
        self.notify(
            ChangeCause::Batch {
                label: label.map(str::to_string),
            },
            affected_ids(&outcomes),
        );

        Ok(outcomes)
    }

    // History

    /// Start collapsing subsequent batches into one undo step
    pub fn begin_interaction(&mut self, label: Option<&str>) {
        self.history
            .begin_interaction(self.snapshot(), label.map(str::to_string));
    }

    /// Close the interaction. Returns true if it recorded an undo step.
    pub fn end_interaction(&mut self) -> bool {
        self.history.end_interaction()
    }

    pub fn in_interaction(&self) -> bool {
        self.history.in_interaction()
    }

    pub fn undo(&mut self) -> bool {
        self.history.end_interaction();
        match self.history.undo(self.snapshot()) {
            Some(restored) => {
                self.restore(restored, ChangeCause::Undo);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.history.end_interaction();
        match self.history.redo(self.snapshot()) {
            Some(restored) => {
                self.restore(restored, ChangeCause::Redo);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_description()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_description()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    fn restore(&mut self, restored: Arc<NodeStore>, cause: ChangeCause) {
        let affected = self.store.diff_ids(&restored);
        self.store = restored;
        self.version += 1;
        self.dirty = true;

        info!(version = self.version, cause = ?cause, affected = affected.len(), "History restored");
        self.notify(cause, affected);
    }

    // Persistence

    /// Records in document order
    pub fn serialize(&self) -> Vec<Node> {
        self.store.to_records()
    }

    /// Replace the whole store with `records`. History is reset.
    #[instrument(skip(self, records), fields(doc = %self.name, records = records.len()))]
    pub fn hydrate(&mut self, records: Vec<Node>) -> Result<HydrateReport, EditorError> {
        let (store, report) = NodeStore::from_records(records)?;

        let affected = self.store.diff_ids(&store);
        self.ids.advance_past(store.iter().map(|node| &node.id));
        self.store = Arc::new(store);
        self.history.clear();
        self.version += 1;
        self.dirty = true;

        self.notify(ChangeCause::Hydrate, affected);
        Ok(report)
    }

    fn notify(&self, cause: ChangeCause, affected: Vec<NodeId>) {
        // No receivers is fine
        let _ = self.events.send(StoreEvent {
            version: self.version,
            cause,
            affected,
        });
    }
}

fn assign_id(ids: &mut IdGenerator, op: Mutation, working: &NodeStore) -> Mutation {
    match op {
        Mutation::CreateNode {
            id: None,
            node_type,
            parent_id,
            position,
            props,
        } => {
            let id = ids.new_id_avoiding(node_type.as_str(), |candidate| {
                working.contains(&NodeId::from(candidate))
            });
            Mutation::CreateNode {
                id: Some(id),
                node_type,
                parent_id,
                position,
                props,
            }
        }
        other => other,
    }
}

fn single(outcomes: Vec<MutationOutcome>) -> Result<MutationOutcome, MutationError> {
    outcomes
        .into_iter()
        .next()
        .ok_or_else(|| MutationError::Validation("mutation produced no outcome".to_string()))
}

fn affected_ids(outcomes: &[MutationOutcome]) -> Vec<NodeId> {
    let mut ids = Vec::new();
    for outcome in outcomes {
        match outcome {
            MutationOutcome::Deleted { removed, .. } => ids.extend(removed.iter().cloned()),
            other => ids.push(other.id().clone()),
        }
    }
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_allocates_tagged_ids() {
        let mut doc = Document::new("home");
        let section = doc.create_node("section", None, None, NodeProps::default()).unwrap();
        let heading = doc
            .create_node("heading", Some(section.clone()), None, NodeProps::default().with_content("Hi"))
            .unwrap();

        assert!(section.as_str().ends_with("-section-1"));
        assert!(heading.as_str().ends_with("-heading-2"));
        assert_eq!(doc.version(), 2);
        assert_eq!(doc.descendants(&section), vec![heading]);
    }

    #[test]
    fn test_failed_batch_keeps_store_and_version() {
        let mut doc = Document::new("home");
        let section = doc.create_node("section", None, None, NodeProps::default()).unwrap();
        let before = doc.snapshot();

        let result = doc.batch(vec![
            Mutation::CreateNode {
                id: None,
                node_type: "text".into(),
                parent_id: Some(section.clone()),
                position: None,
                props: NodeProps::default(),
            },
            Mutation::DeleteNode { node_id: "missing".into() },
        ]);

        assert_eq!(result, Err(MutationError::NodeNotFound("missing".into())));
        assert!(Arc::ptr_eq(&before, &doc.snapshot()));
        assert_eq!(doc.version(), 1);
        assert_eq!(doc.history().undo_levels(), 1);
    }

    #[test]
    fn test_events_are_broadcast() {
        let mut doc = Document::new("home");
        let mut rx = doc.subscribe();

        let id = doc.create_node("button", None, None, NodeProps::default()).unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.version, 1);
        assert_eq!(event.affected, vec![id.clone()]);

        assert!(doc.undo());
        let event = rx.try_recv().unwrap();
        assert_eq!(event.cause, ChangeCause::Undo);
        assert_eq!(event.affected, vec![id]);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut doc = Document::new("home");
        assert_eq!(doc.batch(Vec::new()).unwrap(), Vec::new());
        assert_eq!(doc.version(), 0);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_save_requires_file_backing() {
        let mut doc = Document::new("home");
        assert!(matches!(doc.save(), Err(EditorError::NotFileBacked)));
    }
}
