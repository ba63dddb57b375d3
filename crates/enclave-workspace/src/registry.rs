//! Named workspaces under one base directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use enclave_audit::{OperationEvent, OperationLog};
use enclave_core::{CallerId, FileOpKind, FsError, FsResult, Operation, WorkspaceName};
use enclave_vfs::{OperationRecorder, run_blocking};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::manager::WorkspaceManager;
use crate::settings::WorkspaceSettings;

/// Entry returned by [`WorkspaceRegistry::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    /// Workspace name.
    pub name: String,
    /// Root directory.
    pub root_path: PathBuf,
    /// Creation time of the root directory, if known.
    pub created_at: Option<DateTime<Utc>>,
}

/// Creates, opens, lists and deletes workspaces.
///
/// Each workspace is a direct subdirectory of the base directory named
/// after it. Opened managers are cached; all of them share one
/// [`OperationLog`].
#[derive(Debug)]
pub struct WorkspaceRegistry {
    base_dir: PathBuf,
    settings: WorkspaceSettings,
    log: Arc<OperationLog>,
    open: DashMap<String, Arc<WorkspaceManager>>,
}

impl WorkspaceRegistry {
    /// Create a registry over `base_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_dir` cannot be created or is not a
    /// directory.
    pub fn new(
        base_dir: impl AsRef<Path>,
        settings: WorkspaceSettings,
        log: Arc<OperationLog>,
    ) -> FsResult<Self> {
        let base = base_dir.as_ref();
        let display = base.display().to_string();
        fs::create_dir_all(base).map_err(|e| FsError::io(&display, &e))?;
        let base_dir = base.canonicalize().map_err(|e| FsError::io(&display, &e))?;
        if !base_dir.is_dir() {
            return Err(FsError::file_op(
                display,
                FileOpKind::NotADirectory,
                "workspace base is not a directory",
            ));
        }
        info!(base_dir = %base_dir.display(), "workspace registry ready");
        Ok(Self {
            base_dir,
            settings,
            log,
            open: DashMap::new(),
        })
    }

    /// Base directory holding all workspaces.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Shared operation log.
    #[must_use]
    pub fn log(&self) -> &Arc<OperationLog> {
        &self.log
    }

    /// Policy and traversal settings.
    #[must_use]
    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    fn recorder(&self, name: &str) -> OperationRecorder {
        OperationRecorder::new(Arc::clone(&self.log), name)
    }

    fn manager_for(&self, name: WorkspaceName, root: &Path) -> FsResult<WorkspaceManager> {
        let policy = self.settings.policy_for(name.as_str());
        Ok(WorkspaceManager::open(name, root, policy, Arc::clone(&self.log))?
            .with_max_depth(self.settings.max_depth()))
    }

    /// Create a new, empty workspace and open it.
    ///
    /// # Errors
    ///
    /// - [`FsError::PathValidation`] for an invalid name.
    /// - `FileOperation(AlreadyExists)` if the workspace exists.
    pub async fn create(
        &self,
        name: &str,
        caller: Option<&CallerId>,
    ) -> FsResult<Arc<WorkspaceManager>> {
        let event = self
            .recorder(name)
            .event(Operation::CreateWorkspace, ".", caller);
        let result = self.create_inner(name).await;
        self.recorder(name).finish(event, result)
    }

    async fn create_inner(&self, name: &str) -> FsResult<Arc<WorkspaceManager>> {
        let name = WorkspaceName::new(name)?;
        let root = self.base_dir.join(name.as_str());
        let display = name.as_str().to_owned();
        let target = root.clone();
        run_blocking(name.as_str(), move || {
            fs::create_dir(&target).map_err(|e| FsError::io(&display, &e))
        })
        .await?;

        let manager = Arc::new(self.manager_for(name.clone(), &root)?);
        self.open
            .insert(name.as_str().to_owned(), Arc::clone(&manager));
        info!(workspace = %name.as_str(), "created workspace");
        Ok(manager)
    }

    /// Open an existing workspace. Never creates one.
    ///
    /// # Errors
    ///
    /// - [`FsError::PathValidation`] for an invalid name.
    /// - `FileOperation(NotFound)` if the workspace does not exist.
    pub fn open(&self, name: &str) -> FsResult<Arc<WorkspaceManager>> {
        let name = WorkspaceName::new(name)?;
        if let Some(cached) = self.open.get(name.as_str())
            && cached.root().is_dir()
        {
            return Ok(Arc::clone(cached.value()));
        }
        // Root vanished behind the cache, or never opened.
        self.open.remove(name.as_str());

        let root = self.base_dir.join(name.as_str());
        match fs::symlink_metadata(&root) {
            Ok(meta) if meta.is_dir() => {},
            Ok(_) => {
                return Err(FsError::file_op(
                    name.as_str(),
                    FileOpKind::NotADirectory,
                    "workspace entry is not a directory",
                ));
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FsError::file_op(
                    name.as_str(),
                    FileOpKind::NotFound,
                    "workspace does not exist",
                ));
            },
            Err(e) => return Err(FsError::io(name.as_str(), &e)),
        }

        let manager = Arc::new(self.manager_for(name.clone(), &root)?);
        self.open
            .insert(name.as_str().to_owned(), Arc::clone(&manager));
        debug!(workspace = %name.as_str(), "opened workspace");
        Ok(manager)
    }

    /// All workspaces, sorted by name.
    ///
    /// Entries whose names are not valid workspace names are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory cannot be read.
    pub async fn list(&self) -> FsResult<Vec<WorkspaceSummary>> {
        let base = self.base_dir.clone();
        run_blocking(".", move || {
            let reader = fs::read_dir(&base).map_err(|e| FsError::io(&base, &e))?;
            let mut out = Vec::new();
            for entry in reader.flatten() {
                let Ok(meta) = entry.path().symlink_metadata() else {
                    continue;
                };
                let name = entry.file_name().to_string_lossy().into_owned();
                if !meta.is_dir() || WorkspaceName::new(name.as_str()).is_err() {
                    continue;
                }
                out.push(WorkspaceSummary {
                    name,
                    root_path: entry.path(),
                    created_at: meta
                        .created()
                        .or_else(|_| meta.modified())
                        .ok()
                        .map(DateTime::<Utc>::from),
                });
            }
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(out)
        })
        .await
    }

    /// Delete a workspace and everything in it. Irreversible.
    ///
    /// # Errors
    ///
    /// - [`FsError::PathValidation`] for an invalid name.
    /// - `FileOperation(NotFound)` if the workspace does not exist.
    pub async fn delete(&self, name: &str, caller: Option<&CallerId>) -> FsResult<()> {
        let event = self
            .recorder(name)
            .event(Operation::DeleteWorkspace, ".", caller);
        let result = self.delete_inner(name).await;
        self.recorder(name).finish(event, result)
    }

    async fn delete_inner(&self, name: &str) -> FsResult<()> {
        let name = WorkspaceName::new(name)?;
        self.open.remove(name.as_str());
        let root = self.base_dir.join(name.as_str());
        let display = name.as_str().to_owned();
        run_blocking(name.as_str(), move || {
            let meta = fs::symlink_metadata(&root).map_err(|e| FsError::io(&display, &e))?;
            if !meta.is_dir() {
                return Err(FsError::file_op(
                    &display,
                    FileOpKind::NotADirectory,
                    "workspace entry is not a directory",
                ));
            }
            fs::remove_dir_all(&root).map_err(|e| FsError::io(&display, &e))
        })
        .await?;
        info!(workspace = %name.as_str(), "deleted workspace");
        Ok(())
    }

    /// Record a free-form event against the shared log, e.g. from a
    /// front end that rejected a request before reaching a workspace.
    pub fn record(&self, event: OperationEvent) {
        self.recorder(&event.workspace).record(event);
    }
}
