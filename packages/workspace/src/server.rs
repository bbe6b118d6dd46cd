//! Workspace service
//!
//! One task owns the [`WorkspaceState`]; callers talk to it through a
//! cloneable [`WorkspaceHandle`]. Requests are handled strictly in arrival
//! order, so batches from concurrent callers never interleave and every
//! snapshot sits between two whole batches.

use crate::config::WorkspaceConfig;
use crate::state::{SaveStatus, WorkspaceError, WorkspaceSnapshot, WorkspaceState};
use anyhow::Context;
use pagecraft_editor::{
    CommandInterpreter, CommandOutcome, Document, Intent, JsonFileSink, Mutation, MutationOutcome, SnapshotSink,
    StoreEvent,
};
use std::path::Path;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<T>;

enum Request {
    Submit(Intent, Reply<Result<CommandOutcome, WorkspaceError>>),
    Batch {
        label: Option<String>,
        ops: Vec<Mutation>,
        reply: Reply<Result<Vec<MutationOutcome>, WorkspaceError>>,
    },
    Undo(Reply<bool>),
    Redo(Reply<bool>),
    BeginInteraction(Option<String>, Reply<()>),
    EndInteraction(Reply<bool>),
    Snapshot(Reply<WorkspaceSnapshot>),
    Subscribe(Reply<broadcast::Receiver<StoreEvent>>),
    Save(Reply<Result<(), WorkspaceError>>),
    Status(Reply<SaveStatus>),
    Shutdown(Reply<()>),
}

pub struct WorkspaceServer {
    config: WorkspaceConfig,
    document: Document,
    interpreter: CommandInterpreter,
    sink: Option<Box<dyn SnapshotSink>>,
}

impl WorkspaceServer {
    pub fn new(config: WorkspaceConfig) -> Self {
        let document = Document::with_history_depth(&config.document_name, config.history_depth);
        Self {
            config,
            document,
            interpreter: CommandInterpreter::builtin(),
            sink: None,
        }
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = document;
        self
    }

    pub fn with_interpreter(mut self, interpreter: CommandInterpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_sink(mut self, sink: impl SnapshotSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Keep edits in memory only
    pub fn without_sink(mut self) -> Self {
        self.sink = None;
        self
    }

    /// Open the workspace rooted at `cwd`: read its config and restore the
    /// last saved records, if any.
    pub fn open(cwd: &Path) -> anyhow::Result<Self> {
        let config = WorkspaceConfig::load(cwd)?;
        let mut server = Self::new(config);

        if let Some(path) = server.config.save_path_in(cwd) {
            let mut sink = JsonFileSink::new(&path);
            if let Some(records) = sink.load().with_context(|| format!("loading {}", path.display()))? {
                let report = server
                    .document
                    .hydrate(records)
                    .with_context(|| format!("restoring {}", path.display()))?;
                for issue in &report.dropped {
                    warn!(%issue, "Dropped while restoring");
                }
                server.document.mark_clean();
            }
            server.sink = Some(Box::new(sink));
        }

        info!(
            document = %server.config.document_name,
            nodes = server.document.len(),
            "Workspace opened"
        );
        Ok(server)
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Start the service task
    pub fn spawn(self) -> (WorkspaceHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let autosave = self.config.autosave_interval();
        let state = WorkspaceState::new(self.document, self.interpreter, self.sink);

        let task = tokio::spawn(run(state, rx, autosave));
        (WorkspaceHandle { tx }, task)
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn run(mut state: WorkspaceState, mut rx: mpsc::Receiver<Request>, autosave: Option<std::time::Duration>) {
    let mut timer = autosave.map(|period| {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    });

    debug!("Workspace service started");

    loop {
        tokio::select! {
            request = rx.recv() => {
                let Some(request) = request else {
                    break;
                };
                if let Some(done) = handle(&mut state, request) {
                    flush(&mut state);
                    let _ = done.send(());
                    info!("Workspace service stopped");
                    return;
                }
            }
            _ = tick(&mut timer) => state.autosave(),
        }
    }

    // Every handle dropped
    flush(&mut state);
    info!("Workspace service stopped");
}

fn flush(state: &mut WorkspaceState) {
    if state.status().unsaved {
        state.autosave();
    }
}

/// Returns the shutdown reply when the loop should stop
fn handle(state: &mut WorkspaceState, request: Request) -> Option<Reply<()>> {
    // A dropped receiver means the caller gave up waiting; nothing to do
    match request {
        Request::Submit(intent, reply) => {
            let _ = reply.send(state.submit_command(&intent).map_err(Into::into));
        }
        Request::Batch { label, ops, reply } => {
            let _ = reply.send(state.apply_batch(label.as_deref(), ops).map_err(Into::into));
        }
        Request::Undo(reply) => {
            let _ = reply.send(state.undo());
        }
        Request::Redo(reply) => {
            let _ = reply.send(state.redo());
        }
        Request::BeginInteraction(label, reply) => {
            state.begin_interaction(label.as_deref());
            let _ = reply.send(());
        }
        Request::EndInteraction(reply) => {
            let _ = reply.send(state.end_interaction());
        }
        Request::Snapshot(reply) => {
            let _ = reply.send(state.snapshot());
        }
        Request::Subscribe(reply) => {
            let _ = reply.send(state.document().subscribe());
        }
        Request::Save(reply) => {
            let _ = reply.send(state.save());
        }
        Request::Status(reply) => {
            let _ = reply.send(state.status());
        }
        Request::Shutdown(reply) => return Some(reply),
    }
    None
}

/// Cloneable client of a running workspace service
#[derive(Clone)]
pub struct WorkspaceHandle {
    tx: mpsc::Sender<Request>,
}

impl WorkspaceHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Request) -> Result<T, WorkspaceError> {
        let (reply, response) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| WorkspaceError::Closed)?;
        response.await.map_err(|_| WorkspaceError::Closed)
    }

    /// Interpret one assistant intent as a single undoable step
    pub async fn submit_command(&self, intent: Intent) -> Result<CommandOutcome, WorkspaceError> {
        self.request(|reply| Request::Submit(intent, reply)).await?
    }

    pub async fn apply_batch(&self, ops: Vec<Mutation>) -> Result<Vec<MutationOutcome>, WorkspaceError> {
        self.apply_batch_labeled(None, ops).await
    }

    pub async fn apply_batch_labeled(
        &self,
        label: Option<&str>,
        ops: Vec<Mutation>,
    ) -> Result<Vec<MutationOutcome>, WorkspaceError> {
        let label = label.map(str::to_string);
        self.request(|reply| Request::Batch { label, ops, reply }).await?
    }

    pub async fn undo(&self) -> Result<bool, WorkspaceError> {
        self.request(Request::Undo).await
    }

    pub async fn redo(&self) -> Result<bool, WorkspaceError> {
        self.request(Request::Redo).await
    }

    pub async fn begin_interaction(&self, label: Option<&str>) -> Result<(), WorkspaceError> {
        let label = label.map(str::to_string);
        self.request(|reply| Request::BeginInteraction(label, reply)).await
    }

    pub async fn end_interaction(&self) -> Result<bool, WorkspaceError> {
        self.request(Request::EndInteraction).await
    }

    pub async fn snapshot(&self) -> Result<WorkspaceSnapshot, WorkspaceError> {
        self.request(Request::Snapshot).await
    }

    pub async fn version(&self) -> Result<u64, WorkspaceError> {
        Ok(self.snapshot().await?.version)
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<StoreEvent>, WorkspaceError> {
        self.request(Request::Subscribe).await
    }

    pub async fn save(&self) -> Result<(), WorkspaceError> {
        self.request(Request::Save).await?
    }

    pub async fn status(&self) -> Result<SaveStatus, WorkspaceError> {
        self.request(Request::Status).await
    }

    /// Stop the service after a final save of unsaved changes
    pub async fn shutdown(&self) -> Result<(), WorkspaceError> {
        self.request(Request::Shutdown).await
    }
}
