//! Operation log entry types.

use enclave_core::{CallerId, EntryId, ErrorKind, FsError, Operation, Timestamp};
use serde::{Deserialize, Serialize};

/// Outcome of a logged operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome {
    /// Operation completed.
    Success,
    /// Operation failed.
    Failure {
        /// Classified error kind.
        error_type: ErrorKind,
        /// Human-readable error message.
        message: String,
    },
}

impl OperationOutcome {
    /// Create a success outcome.
    #[must_use]
    pub fn success() -> Self {
        Self::Success
    }

    /// Create a failure outcome.
    pub fn failure(error_type: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            error_type,
            message: message.into(),
        }
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<&FsError> for OperationOutcome {
    fn from(err: &FsError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }
}

/// A single immutable record in the operation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    /// Unique entry ID.
    pub id: EntryId,
    /// Insertion sequence number; strictly increasing.
    pub sequence: u64,
    /// When the entry was appended; never earlier than its predecessor.
    pub timestamp: Timestamp,
    /// Caller the operation is attributed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<CallerId>,
    /// Operation kind.
    pub operation: Operation,
    /// Workspace the operation targeted.
    pub workspace: String,
    /// Workspace-relative path as supplied by the caller.
    pub relative_path: String,
    /// Destination for move and copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_path: Option<String>,
    /// Result of the operation.
    pub outcome: OperationOutcome,
}

impl OperationLogEntry {
    /// Whether the logged operation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Error kind, present only on failures.
    #[must_use]
    pub fn error_type(&self) -> Option<ErrorKind> {
        match &self.outcome {
            OperationOutcome::Success => None,
            OperationOutcome::Failure { error_type, .. } => Some(*error_type),
        }
    }

    /// Error message, present only on failures.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            OperationOutcome::Success => None,
            OperationOutcome::Failure { message, .. } => Some(message),
        }
    }
}

/// What a caller submits to [`OperationLog::record`](crate::OperationLog::record).
///
/// The log assigns the ID, sequence number and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEvent {
    /// Caller the operation is attributed to.
    pub caller_id: Option<CallerId>,
    /// Operation kind.
    pub operation: Operation,
    /// Workspace name.
    pub workspace: String,
    /// Workspace-relative path.
    pub relative_path: String,
    /// Destination for move and copy.
    pub destination_path: Option<String>,
    /// Result of the operation.
    pub outcome: OperationOutcome,
}

impl OperationEvent {
    /// Create a successful event for `operation` on `relative_path`.
    pub fn new(
        operation: Operation,
        workspace: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            caller_id: None,
            operation,
            workspace: workspace.into(),
            relative_path: relative_path.into(),
            destination_path: None,
            outcome: OperationOutcome::Success,
        }
    }

    /// Attribute the event to a caller.
    #[must_use]
    pub fn with_caller(mut self, caller_id: Option<CallerId>) -> Self {
        self.caller_id = caller_id;
        self
    }

    /// Set the destination path.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination_path = Some(destination.into());
        self
    }

    /// Set the outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: OperationOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}
