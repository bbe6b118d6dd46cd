pub mod apply;
pub mod init;
pub mod outline;
pub mod resolve;

pub use apply::{apply, ApplyArgs};
pub use init::{init, InitArgs};
pub use outline::{outline, OutlineArgs};
pub use resolve::{resolve, ResolveArgs};

use anyhow::{Context, Result};
use pagecraft_editor::{JsonFileSink, Node, SnapshotSink};
use pagecraft_workspace::WorkspaceConfig;
use std::path::Path;

/// Saved records of the configured page (empty if never saved)
pub(crate) fn load_records(cwd: &Path) -> Result<Vec<Node>> {
    let config = WorkspaceConfig::load(cwd)?;
    let path = config
        .save_path_in(cwd)
        .context("no savePath in config; run `pagecraft init` first")?;

    let records = JsonFileSink::new(&path)
        .load()
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(records.unwrap_or_default())
}
