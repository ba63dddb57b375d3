//! Operation log filters.

use chrono::{DateTime, Utc};
use enclave_core::{CallerId, Operation};
use serde::{Deserialize, Serialize};

use crate::entry::OperationLogEntry;

/// Filter applied by [`OperationLog::query`](crate::OperationLog::query).
///
/// All set fields must match. `since` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogQuery {
    /// Keep only successes (`true`) or failures (`false`).
    pub success: Option<bool>,
    /// Keep only entries attributed to this caller.
    pub caller_id: Option<CallerId>,
    /// Keep only this operation kind.
    pub operation: Option<Operation>,
    /// Keep only entries for this workspace.
    pub workspace: Option<String>,
    /// Earliest timestamp to include.
    pub since: Option<DateTime<Utc>>,
    /// Timestamp to stop before.
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of entries returned.
    pub limit: Option<usize>,
}

impl LogQuery {
    /// A query matching every entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by outcome.
    #[must_use]
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Filter by caller.
    #[must_use]
    pub fn with_caller(mut self, caller_id: impl Into<CallerId>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    /// Filter by operation.
    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Filter by workspace.
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Include entries at or after `since`.
    #[must_use]
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Include entries strictly before `until`.
    #[must_use]
    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `entry` passes every set filter.
    #[must_use]
    pub fn matches(&self, entry: &OperationLogEntry) -> bool {
        if let Some(success) = self.success
            && entry.is_success() != success
        {
            return false;
        }
        if let Some(caller) = &self.caller_id
            && entry.caller_id.as_ref() != Some(caller)
        {
            return false;
        }
        if let Some(op) = self.operation
            && entry.operation != op
        {
            return false;
        }
        if let Some(ws) = &self.workspace
            && &entry.workspace != ws
        {
            return false;
        }
        if let Some(since) = self.since
            && entry.timestamp.0 < since
        {
            return false;
        }
        if let Some(until) = self.until
            && entry.timestamp.0 >= until
        {
            return false;
        }
        true
    }
}
