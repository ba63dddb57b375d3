//! Operation log bridge shared by file and workspace handlers.

use std::sync::Arc;

use enclave_audit::{OperationEvent, OperationLog, OperationOutcome};
use enclave_core::{CallerId, ErrorKind, FsResult, Operation};
use tracing::{debug, warn};

/// Records one log entry per public operation against one workspace.
///
/// Audit failures are logged and swallowed: the filesystem outcome is what
/// the caller receives.
#[derive(Clone)]
pub struct OperationRecorder {
    log: Arc<OperationLog>,
    workspace: String,
}

impl std::fmt::Debug for OperationRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRecorder")
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl OperationRecorder {
    /// Create a recorder writing to `log` under `workspace`.
    pub fn new(log: Arc<OperationLog>, workspace: impl Into<String>) -> Self {
        Self {
            log,
            workspace: workspace.into(),
        }
    }

    /// Workspace name entries are attributed to.
    #[must_use]
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Shared log handle.
    #[must_use]
    pub fn log(&self) -> &Arc<OperationLog> {
        &self.log
    }

    /// Start an event for `operation` on `path`, attributed to `caller`.
    #[must_use]
    pub fn event(
        &self,
        operation: Operation,
        path: &str,
        caller: Option<&CallerId>,
    ) -> OperationEvent {
        OperationEvent::new(operation, self.workspace.clone(), path).with_caller(caller.cloned())
    }

    /// Record `event` with the outcome of `result`, then hand `result` back.
    pub fn finish<T>(&self, event: OperationEvent, result: FsResult<T>) -> FsResult<T> {
        let outcome = match &result {
            Ok(_) => OperationOutcome::success(),
            Err(err) => {
                if err.kind() == ErrorKind::Security {
                    warn!(
                        workspace = %self.workspace,
                        operation = %event.operation,
                        path = %event.relative_path,
                        error = %err,
                        "rejected path outside workspace"
                    );
                } else {
                    debug!(
                        workspace = %self.workspace,
                        operation = %event.operation,
                        path = %event.relative_path,
                        error = %err,
                        "operation failed"
                    );
                }
                OperationOutcome::from(err)
            },
        };

        self.record(event.with_outcome(outcome));
        result
    }

    /// Record a fully formed event, e.g. a bulk operation with a custom
    /// outcome.
    pub fn record(&self, event: OperationEvent) {
        if let Err(e) = self.log.record(event) {
            warn!(workspace = %self.workspace, error = %e, "failed to record operation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_audit::LogQuery;
    use enclave_core::FsError;

    #[test]
    fn test_finish_records_success_and_failure() {
        let log = Arc::new(OperationLog::in_memory(100));
        let recorder = OperationRecorder::new(Arc::clone(&log), "demo");
        let caller = CallerId::new("agent-1");

        let ok: FsResult<u8> = Ok(1);
        let event = recorder.event(Operation::Read, "a.txt", Some(&caller));
        assert_eq!(recorder.finish(event, ok).unwrap(), 1);

        let err: FsResult<()> = Err(FsError::security("../x", "escape"));
        let event = recorder.event(Operation::Write, "../x", None);
        assert!(recorder.finish(event, err).is_err());

        let entries = log.query(&LogQuery::new()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].error_type(), Some(ErrorKind::Security));
        assert_eq!(entries[0].caller_id, None);
        assert!(entries[1].is_success());
        assert_eq!(entries[1].caller_id.as_ref().map(CallerId::as_str), Some("agent-1"));
        assert_eq!(entries[1].workspace, "demo");
    }
}
