pub mod config;
pub mod server;
pub mod state;

pub use config::{WorkspaceConfig, DEFAULT_CONFIG_NAME};
pub use server::{WorkspaceHandle, WorkspaceServer};
pub use state::{SaveStatus, WorkspaceError, WorkspaceSnapshot, WorkspaceState};

// Re-export editor types used in the handle API
pub use pagecraft_editor::{CommandOutcome, Intent, Mutation, MutationOutcome, StoreEvent};
