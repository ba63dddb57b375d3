//! Enclave VFS - path containment and single-file operations.
//!
//! This crate provides:
//! - [`PathResolver`]: proves a caller-supplied relative path stays inside
//!   a workspace root, through `..`, separators and symlinks
//! - [`FileHandler`]: read, write, append, exists and stat with size and
//!   extension limits from an [`AccessPolicy`]
//! - [`FileRecord`]: the metadata snapshot returned to callers
//! - [`TextEncoding`]: per-request text encoding, UTF-8 by default
//! - [`OperationRecorder`]: one operation log entry per public call
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use enclave_audit::OperationLog;
//! use enclave_vfs::prelude::*;
//!
//! # async fn demo() -> enclave_core::FsResult<()> {
//! let log = Arc::new(OperationLog::in_memory(1_000));
//! let recorder = OperationRecorder::new(log, "demo");
//! let files = FileHandler::open("/srv/workspaces/demo", AccessPolicy::default(), recorder)?;
//!
//! files.write(WriteRequest::new("notes/todo.txt", "buy milk")).await?;
//! let text = files.read(ReadRequest::new("notes/todo.txt")).await?;
//! assert_eq!(text, "buy milk");
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

mod dirs;
mod file;
mod locks;
mod path;
mod policy;
mod record;
mod recorder;
mod request;
mod task;
mod text;

pub use dirs::{create_dirs_below, ensure_root};
pub use file::{FileHandler, prepare_parent, record_for};
pub use locks::PathLocks;
pub use path::{
    MAX_COMPONENT_BYTES, MAX_PATH_BYTES, PathResolver, ResolvedPath, join_relative, normalize,
};
pub use policy::{AccessPolicy, DEFAULT_MAX_FILE_SIZE};
pub use record::{EntryType, FileRecord, extension_of};
pub use recorder::OperationRecorder;
pub use request::{
    AppendRequest, ExistsRequest, PathRequest, ReadRequest, StatRequest, WriteRequest,
    require_file_path,
};
pub use task::run_blocking;
pub use text::TextEncoding;
