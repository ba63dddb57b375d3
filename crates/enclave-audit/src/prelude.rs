//! Prelude module - commonly used types for convenient import.
//!
//! Use `use enclave_audit::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuditError, AuditResult};

// Entry types
pub use crate::{OperationEvent, OperationLogEntry, OperationOutcome};

// Log and queries
pub use crate::{LogQuery, OperationLog};

// Storage
pub use crate::{JsonlLogStorage, LogStorage, MemoryLogStorage};
