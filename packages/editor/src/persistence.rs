//! # Persistence
//!
//! The store persists as a flat array of node records in document order.
//! Hydration validates the records before building a store: duplicate ids,
//! parent mismatches and cycles are rejected, while child ids that point
//! at nothing are dropped and reported.

use crate::mutations::MutationError;
use crate::store::NodeStore;
use pagecraft_common::{Node, NodeId};
use pagecraft_evaluator::HierarchyIssue;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Records failed validation: {0}")]
    Integrity(#[from] MutationError),
}

/// What hydration had to repair
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HydrateReport {
    pub dropped: Vec<HierarchyIssue>,
}

impl HydrateReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

impl NodeStore {
    /// Plain records in document order
    pub fn to_records(&self) -> Vec<Node> {
        self.nodes().into_iter().cloned().collect()
    }

    /// Rebuild a store from records.
    ///
    /// Roots keep their record order; children keep their list order.
    #[instrument(skip(records), fields(records = records.len()))]
    pub fn from_records(records: Vec<Node>) -> Result<(NodeStore, HydrateReport), PersistenceError> {
        let mut report = HydrateReport::default();

        let mut known: HashSet<NodeId> = HashSet::with_capacity(records.len());
        for node in &records {
            if !known.insert(node.id.clone()) {
                return Err(MutationError::DuplicateId(node.id.clone()).into());
            }
        }

        let mut records = records;
        for node in &mut records {
            let parent = node.id.clone();
            node.children.retain(|child| {
                let exists = known.contains(child);
                if !exists {
                    report.dropped.push(HierarchyIssue::DanglingChild {
                        parent: parent.clone(),
                        child: child.clone(),
                    });
                }
                exists
            });
        }

        let parents: HashMap<&NodeId, Option<&NodeId>> = records
            .iter()
            .map(|node| (&node.id, node.parent_id.as_ref()))
            .collect();

        for node in &records {
            for child in &node.children {
                if parents.get(child).copied().flatten() != Some(&node.id) {
                    return Err(MutationError::InvalidStructure(format!(
                        "{} lists {} as a child but the child disagrees",
                        node.id, child
                    ))
                    .into());
                }
            }
            if let Some(parent) = &node.parent_id {
                if !known.contains(parent) {
                    return Err(MutationError::ParentNotFound(parent.clone()).into());
                }
            }
        }

        let mut store = NodeStore::new();
        let mut roots = Vec::new();
        for node in records {
            if node.parent_id.is_none() {
                roots.push(node.id.clone());
            }
            store.insert_detached(node);
        }
        for root in &roots {
            store.link(root, None, None);
        }

        store.check_integrity()?;

        if report.is_clean() {
            debug!(nodes = store.len(), "Store hydrated");
        } else {
            warn!(nodes = store.len(), dropped = report.dropped.len(), "Store hydrated with dropped references");
        }

        Ok((store, report))
    }
}

/// Somewhere to keep serialized records
pub trait SnapshotSink: Send {
    fn save(&mut self, records: &[Node]) -> Result<(), PersistenceError>;

    /// `None` if nothing was saved yet
    fn load(&mut self) -> Result<Option<Vec<Node>>, PersistenceError>;
}

/// Records as pretty JSON in a single file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for JsonFileSink {
    fn save(&mut self, records: &[Node]) -> Result<(), PersistenceError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(records)?)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), records = records.len(), "Records saved");
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Vec<Node>>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let source = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&source)?))
    }
}

/// In-memory sink; clones share the saved records
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    saved: Arc<Mutex<Option<Vec<Node>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<Vec<Node>> {
        self.saved.lock().ok().and_then(|saved| saved.clone())
    }
}

impl SnapshotSink for MemorySink {
    fn save(&mut self, records: &[Node]) -> Result<(), PersistenceError> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "memory sink poisoned"))?;
        *saved = Some(records.to_vec());
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Vec<Node>>, PersistenceError> {
        Ok(self.saved())
    }
}
