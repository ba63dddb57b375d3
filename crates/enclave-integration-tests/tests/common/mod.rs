//! Shared test harness for integration tests.

use std::path::Path;
use std::sync::Arc;

use enclave_audit::OperationLog;
use enclave_workspace::{WorkspaceManager, WorkspaceRegistry, WorkspaceSettings};
use tempfile::TempDir;

/// A registry over a temporary base directory with one open workspace.
///
/// The tempdir is cleaned up when the harness is dropped.
#[allow(dead_code)]
pub struct Harness {
    /// Registry owning the workspace.
    pub registry: WorkspaceRegistry,
    /// The workspace under test.
    pub ws: Arc<WorkspaceManager>,
    /// Shared operation log.
    pub log: Arc<OperationLog>,
    /// Base directory (held to prevent cleanup).
    pub base: TempDir,
}

#[allow(dead_code)]
impl Harness {
    /// Workspace `demo` with default settings and an in-memory log.
    pub async fn new() -> Self {
        Self::with_settings(WorkspaceSettings::default()).await
    }

    /// Workspace `demo` with the given settings.
    pub async fn with_settings(settings: WorkspaceSettings) -> Self {
        let base = TempDir::new().expect("failed to create tempdir");
        let log = Arc::new(OperationLog::in_memory(10_000));
        Self::build(base, settings, log).await
    }

    /// Workspace `demo` logging to a JSON lines file at `log_path`.
    pub async fn with_persistent_log(log_path: &Path) -> Self {
        let base = TempDir::new().expect("failed to create tempdir");
        let log = Arc::new(OperationLog::open(log_path, 10_000).expect("failed to open log"));
        Self::build(base, WorkspaceSettings::default(), log).await
    }

    async fn build(base: TempDir, settings: WorkspaceSettings, log: Arc<OperationLog>) -> Self {
        let registry = WorkspaceRegistry::new(base.path(), settings, Arc::clone(&log))
            .expect("failed to create registry");
        let ws = registry
            .create("demo", None)
            .await
            .expect("failed to create workspace");
        Self {
            registry,
            ws,
            log,
            base,
        }
    }

    /// Absolute path of `relative` inside the workspace.
    pub fn path(&self, relative: &str) -> std::path::PathBuf {
        self.ws.root().join(relative)
    }

    /// Number of log entries recorded so far.
    pub fn log_count(&self) -> usize {
        self.log.count().expect("log count")
    }
}
