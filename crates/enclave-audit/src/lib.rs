//! Enclave Audit - append-only operation log.
//!
//! Every attempted workspace operation, successful or not, is recorded as
//! one [`OperationLogEntry`]. The log provides:
//! - Strictly ordered appends (sequence number and monotonic timestamp)
//! - Filtered queries, most recent first
//! - Per-error-kind failure summaries
//! - FIFO retention, in memory or persisted as JSON lines
//!
//! # Example
//!
//! ```
//! use enclave_audit::{LogQuery, OperationEvent, OperationLog};
//! use enclave_core::Operation;
//!
//! let log = OperationLog::in_memory(1_000);
//! log.record(OperationEvent::new(Operation::Write, "demo", "notes/todo.txt"))
//!     .unwrap();
//!
//! let recent = log.query(&LogQuery::new().with_workspace("demo")).unwrap();
//! assert_eq!(recent.len(), 1);
//! assert!(recent[0].is_success());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod entry;
mod error;
mod log;
mod query;
mod storage;

pub use entry::{OperationEvent, OperationLogEntry, OperationOutcome};
pub use error::{AuditError, AuditResult};
pub use log::{DEFAULT_MAX_ENTRIES, OperationLog};
pub use query::LogQuery;
pub use storage::{JsonlLogStorage, LogStorage, MemoryLogStorage};
