//! Prelude module - commonly used types for convenient import.
//!
//! Use `use enclave_workspace::prelude::*;` to import all essential types.

// Workspaces
pub use crate::{WorkspaceManager, WorkspaceRegistry, WorkspaceSettings, WorkspaceSummary};

// Requests
pub use crate::{
    CleanupRequest, CopyRequest, DeleteRequest, FindRequest, ListRequest, MkdirRequest,
    MoveRequest,
};

// Results
pub use crate::{CopyReport, FindFiles, ItemError, WorkspaceInfo};
