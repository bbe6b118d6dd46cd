use chrono::{DateTime, Utc};
use pagecraft_editor::{
    CommandError, CommandInterpreter, CommandOutcome, Document, EditorError, Intent, Mutation, MutationError,
    MutationOutcome, NodeStore, SnapshotSink,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error("Save failed: {0}")]
    Save(#[from] EditorError),

    #[error("No save location configured")]
    NoSink,

    #[error("Workspace service has shut down")]
    Closed,
}

impl WorkspaceError {
    /// Plain-language message for the assistant reply
    pub fn user_message(&self) -> String {
        match self {
            WorkspaceError::Command(e) => e.user_message(),
            WorkspaceError::Mutation(e) => CommandError::from(e.clone()).user_message(),
            other => other.to_string(),
        }
    }
}

/// Persistence state shown to the user
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatus {
    pub unsaved: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Consistent read view between batches
#[derive(Debug, Clone)]
pub struct WorkspaceSnapshot {
    pub version: u64,
    pub store: Arc<NodeStore>,
}

/// Single owner of the document. Everything here is synchronous; the
/// server task calls into it one request at a time.
pub struct WorkspaceState {
    document: Document,
    interpreter: CommandInterpreter,
    sink: Option<Box<dyn SnapshotSink>>,
    last_saved_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl WorkspaceState {
    pub fn new(document: Document, interpreter: CommandInterpreter, sink: Option<Box<dyn SnapshotSink>>) -> Self {
        Self {
            document,
            interpreter,
            sink,
            last_saved_at: None,
            last_error: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn submit_command(&mut self, intent: &Intent) -> Result<CommandOutcome, CommandError> {
        let result = self.interpreter.submit(&mut self.document, intent);
        if let Err(e) = &result {
            warn!(action = %intent.action, error = %e, "Command rejected");
        }
        result
    }

    pub fn apply_batch(
        &mut self,
        label: Option<&str>,
        ops: Vec<Mutation>,
    ) -> Result<Vec<MutationOutcome>, MutationError> {
        self.document.batch_labeled(label, ops)
    }

    pub fn undo(&mut self) -> bool {
        self.document.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.document.redo()
    }

    pub fn begin_interaction(&mut self, label: Option<&str>) {
        self.document.begin_interaction(label);
    }

    pub fn end_interaction(&mut self) -> bool {
        self.document.end_interaction()
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            version: self.document.version(),
            store: self.document.snapshot(),
        }
    }

    pub fn status(&self) -> SaveStatus {
        SaveStatus {
            unsaved: self.document.is_dirty(),
            last_saved_at: self.last_saved_at,
            last_error: self.last_error.clone(),
        }
    }

    /// Write the records to the sink. On failure the in-memory document
    /// stays authoritative and remains marked unsaved.
    pub fn save(&mut self) -> Result<(), WorkspaceError> {
        let sink = self.sink.as_mut().ok_or(WorkspaceError::NoSink)?;

        match self.document.save_to(sink.as_mut()) {
            Ok(()) => {
                self.last_saved_at = Some(Utc::now());
                self.last_error = None;
                info!(version = self.document.version(), nodes = self.document.len(), "Document saved");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Save failed, document kept in memory");
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Save if there is something to save and somewhere to put it
    pub fn autosave(&mut self) {
        if self.sink.is_none() || !self.document.is_dirty() {
            return;
        }
        debug!("Autosaving");
        // Failures are logged and kept in the status
        let _ = self.save();
    }
}
