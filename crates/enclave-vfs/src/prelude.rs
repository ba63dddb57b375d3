//! Prelude module - commonly used types for convenient import.
//!
//! Use `use enclave_vfs::prelude::*;` to import all essential types.

// Resolution
pub use crate::{PathResolver, ResolvedPath};

// File operations
pub use crate::{AccessPolicy, FileHandler, OperationRecorder};

// Requests
pub use crate::{
    AppendRequest, ExistsRequest, PathRequest, ReadRequest, StatRequest, TextEncoding,
    WriteRequest,
};

// Records
pub use crate::{EntryType, FileRecord};
