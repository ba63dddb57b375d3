//! Enclave Core - shared types for the workspace-scoped file access layer.
//!
//! This crate provides:
//! - The error taxonomy every file operation reports ([`FsError`], [`ErrorKind`])
//! - Operation identifiers recorded in the operation log ([`Operation`])
//! - Identifier and timestamp newtypes ([`CallerId`], [`WorkspaceName`], [`Timestamp`])
//!
//! Nothing here touches the filesystem. Higher crates (`enclave-vfs`,
//! `enclave-workspace`, `enclave-audit`) build on these types.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod operation;
mod types;

pub use error::{ErrorKind, FileOpKind, FsError, FsResult};
pub use operation::Operation;
pub use types::{CallerId, EntryId, Timestamp, WorkspaceName};
