//! Enclave Workspace - directory operations and workspace lifecycle.
//!
//! This crate provides:
//! - [`WorkspaceManager`]: listing, mkdir, move, copy, delete, glob search,
//!   statistics and empty-directory cleanup inside one workspace
//! - [`WorkspaceRegistry`]: named workspaces under a base directory
//! - [`WorkspaceSettings`]: per-workspace access policies built from
//!   [`enclave_config::Config`]
//!
//! Single-file operations live on [`WorkspaceManager::files`], which shares
//! the manager's resolver, locks and operation log.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use enclave_audit::OperationLog;
//! use enclave_vfs::WriteRequest;
//! use enclave_workspace::prelude::*;
//!
//! # async fn demo() -> enclave_core::FsResult<()> {
//! let log = Arc::new(OperationLog::in_memory(1_000));
//! let registry = WorkspaceRegistry::new("/srv/workspaces", WorkspaceSettings::default(), log)?;
//! let ws = registry.create("demo", None).await?;
//!
//! ws.files().write(WriteRequest::new("notes/todo.txt", "buy milk")).await?;
//! ws.move_item(MoveRequest::new("notes/todo.txt", "archive/todo.txt")).await?;
//! for record in ws.list_directory(ListRequest::new("archive")).await? {
//!     println!("{} {}", record.relative_path, record.size_bytes);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod find;
mod manager;
mod registry;
mod report;
mod request;
mod settings;

pub use find::FindFiles;
pub use manager::WorkspaceManager;
pub use registry::{WorkspaceRegistry, WorkspaceSummary};
pub use report::{CopyReport, ItemError, WorkspaceInfo, format_size};
pub use request::{
    CleanupRequest, CopyRequest, DeleteRequest, FindRequest, ListRequest, MkdirRequest,
    MoveRequest,
};
pub use settings::{DEFAULT_MAX_DEPTH, WorkspaceSettings};
