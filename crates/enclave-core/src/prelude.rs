//! Prelude module - commonly used types for convenient import.
//!
//! Use `use enclave_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{ErrorKind, FileOpKind, FsError, FsResult};

// Operations
pub use crate::Operation;

// Identifiers
pub use crate::{CallerId, EntryId, Timestamp, WorkspaceName};
