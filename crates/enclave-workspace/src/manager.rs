//! Directory-level operations under one workspace root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use enclave_audit::{OperationLog, OperationOutcome};
use enclave_core::{CallerId, FileOpKind, FsError, FsResult, Operation, WorkspaceName};
use enclave_vfs::{
    AccessPolicy, EntryType, FileHandler, FileRecord, OperationRecorder, PathResolver,
    ResolvedPath, create_dirs_below, ensure_root, join_relative, prepare_parent, record_for,
    run_blocking,
};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::find::{FindFiles, FindScope, Pattern};
use crate::report::{CopyReport, ItemError, WorkspaceInfo, format_size};
use crate::request::{
    CleanupRequest, CopyRequest, DeleteRequest, FindRequest, ListRequest, MkdirRequest,
    MoveRequest,
};
use crate::settings::DEFAULT_MAX_DEPTH;

/// Directory operations, search and statistics for one workspace.
///
/// Owns the workspace's [`FileHandler`]; both share the resolver, policy,
/// per-path locks and operation recorder. Every public operation records
/// exactly one log entry.
#[derive(Debug)]
pub struct WorkspaceManager {
    name: WorkspaceName,
    files: FileHandler,
    max_depth: usize,
    created_at: Option<DateTime<Utc>>,
}

impl WorkspaceManager {
    /// Open the workspace `name` rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is missing or not a directory.
    pub fn open(
        name: WorkspaceName,
        root: impl AsRef<Path>,
        policy: AccessPolicy,
        log: Arc<OperationLog>,
    ) -> FsResult<Self> {
        let recorder = OperationRecorder::new(log, name.as_str());
        let files = FileHandler::open(root, policy, recorder)?;
        let created_at = fs::metadata(files.resolver().root())
            .ok()
            .and_then(|m| m.created().or_else(|_| m.modified()).ok())
            .map(DateTime::<Utc>::from);
        Ok(Self {
            name,
            files,
            max_depth: DEFAULT_MAX_DEPTH,
            created_at,
        })
    }

    /// Set the recursion limit for listing and search.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// Workspace name.
    #[must_use]
    pub fn name(&self) -> &WorkspaceName {
        &self.name
    }

    /// Canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.files.resolver().root()
    }

    /// Single-file operations for this workspace.
    #[must_use]
    pub fn files(&self) -> &FileHandler {
        &self.files
    }

    /// Recursion limit.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// When the root directory was created, if known.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn resolver(&self) -> &PathResolver {
        self.files.resolver()
    }

    fn recorder(&self) -> &OperationRecorder {
        self.files.recorder()
    }

    /// List a directory: directories first, then by name.
    ///
    /// A recursive listing is depth-first pre-order with the same sibling
    /// order, bounded by the max depth. Symlinks are listed, not followed.
    ///
    /// # Errors
    ///
    /// - `FileOperation(NotFound)` if the target does not exist.
    /// - `FileOperation(NotADirectory)` if the target is a file.
    pub async fn list_directory(&self, request: ListRequest) -> FsResult<Vec<FileRecord>> {
        let event = self
            .recorder()
            .event(Operation::List, &request.path, request.caller.as_ref());
        let result = self.list_inner(request).await;
        self.recorder().finish(event, result)
    }

    async fn list_inner(&self, request: ListRequest) -> FsResult<Vec<FileRecord>> {
        request.validate()?;
        let resolved = self.resolver().resolve(&request.path)?;
        let options = ListOptions {
            max_depth: if request.recursive { self.max_depth } else { 1 },
            include_hidden: request.include_hidden,
            entry_types: request.entry_types,
        };
        let display = request.path;
        let task_path = display.clone();
        run_blocking(&task_path, move || {
            require_directory(resolved.absolute(), &display)?;
            let mut out = Vec::new();
            list_into(
                resolved.absolute(),
                resolved.relative(),
                &display,
                1,
                &options,
                &mut out,
            )?;
            Ok(out)
        })
        .await
    }

    /// Create a directory. Succeeds without change if it already exists.
    ///
    /// # Errors
    ///
    /// - `FileOperation(AlreadyExists)` if a non-directory is at the path.
    /// - `FileOperation(NotFound)` if the parent is missing and
    ///   `create_parents` is false.
    pub async fn create_directory(&self, request: MkdirRequest) -> FsResult<FileRecord> {
        let event = self
            .recorder()
            .event(Operation::Mkdir, &request.path, request.caller.as_ref());
        let result = self.mkdir_inner(&request).await;
        self.recorder().finish(event, result)
    }

    async fn mkdir_inner(&self, request: &MkdirRequest) -> FsResult<FileRecord> {
        request.validate()?;
        let resolved = self.resolver().resolve(&request.path)?;
        let display = request.path.clone();
        let create_parents = request.create_parents;
        let root_name = self.name.as_str().to_owned();
        let root = self.root().to_path_buf();
        run_blocking(&request.path, move || {
            ensure_directory(&root, resolved.absolute(), &display, create_parents)?;
            let mut record = record_for(&resolved, &display)?;
            if resolved.is_root() {
                record.name = root_name;
            }
            Ok(record)
        })
        .await
    }

    /// Move or rename a file, directory or symlink.
    ///
    /// Both ends are resolved independently. Missing destination parents
    /// are created. A symlink is moved as itself.
    ///
    /// # Errors
    ///
    /// - `FileOperation(NotFound)` if the source does not exist.
    /// - `FileOperation(AlreadyExists)` if the destination exists and
    ///   `overwrite` is false.
    /// - `FileOperation(Other)` when moving a directory into itself.
    /// - [`FsError::InvalidFileType`] if a file would get a disallowed
    ///   extension.
    pub async fn move_item(&self, request: MoveRequest) -> FsResult<FileRecord> {
        let event = self
            .recorder()
            .event(Operation::Move, &request.source, request.caller.as_ref())
            .with_destination(request.destination.clone());
        let result = self.move_inner(&request).await;
        self.recorder().finish(event, result)
    }

    async fn move_inner(&self, request: &MoveRequest) -> FsResult<FileRecord> {
        request.validate()?;
        let source = self.resolver().resolve_entry(&request.source)?;
        let destination = self.resolver().resolve_entry(&request.destination)?;
        if destination.absolute() != source.absolute()
            && destination.absolute().starts_with(source.absolute())
        {
            return Err(FsError::file_op(
                &request.destination,
                FileOpKind::Other,
                "cannot move a directory into itself",
            ));
        }

        let _guards = self.lock_pair(source.absolute(), destination.absolute()).await;
        let root = self.root().to_path_buf();
        let policy = self.files.policy().clone();
        let src_display = request.source.clone();
        let dst_display = request.destination.clone();
        let overwrite = request.overwrite;
        run_blocking(&request.source, move || {
            ensure_root(&root, &src_display)?;
            let meta = fs::symlink_metadata(source.absolute())
                .map_err(|e| FsError::io(&src_display, &e))?;
            if !meta.is_dir() {
                policy.check_extension(&dst_display)?;
            }
            if source.absolute() == destination.absolute() {
                return record_for(&destination, &dst_display);
            }
            if !overwrite && entry_exists(destination.absolute(), &dst_display)? {
                return Err(FsError::already_exists(&dst_display));
            }
            prepare_parent(&root, destination.absolute(), &dst_display, true)?;
            fs::rename(source.absolute(), destination.absolute())
                .map_err(|e| FsError::io(&dst_display, &e))?;
            record_for(&destination, &dst_display)
        })
        .await
    }

    /// Copy a file, or a directory tree best-effort.
    ///
    /// Files are checked against the size and extension policy. In a tree,
    /// items that fail (including symlinks, which are never followed) are
    /// reported in [`CopyReport::errors`] and the rest are still copied.
    /// A report with item errors is logged as a failure of the first
    /// item's kind but returned as `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error only when nothing could be attempted: missing
    /// source, existing destination without `overwrite`, copying into
    /// itself, or a policy violation for a single-file copy.
    pub async fn copy_item(&self, request: CopyRequest) -> FsResult<CopyReport> {
        let event = self
            .recorder()
            .event(Operation::Copy, &request.source, request.caller.as_ref())
            .with_destination(request.destination.clone());
        match self.copy_inner(&request).await {
            Ok(report) => {
                let outcome = match report.errors.first() {
                    None => OperationOutcome::success(),
                    Some(first) => OperationOutcome::failure(
                        first.error_type,
                        format!(
                            "{} of {} items failed; first: {}",
                            report.errors.len(),
                            report.errors.len().saturating_add(report.items_copied),
                            first.message
                        ),
                    ),
                };
                self.recorder().record(event.with_outcome(outcome));
                Ok(report)
            },
            Err(e) => self.recorder().finish(event, Err(e)),
        }
    }

    async fn copy_inner(&self, request: &CopyRequest) -> FsResult<CopyReport> {
        request.validate()?;
        let source = self.resolver().resolve(&request.source)?;
        let destination = self.resolver().resolve_entry(&request.destination)?;
        if destination.absolute().starts_with(source.absolute()) {
            return Err(FsError::file_op(
                &request.destination,
                FileOpKind::Other,
                "destination is inside the source",
            ));
        }

        let _guard = self.files.locks().lock(destination.absolute()).await;
        let root = self.root().to_path_buf();
        let policy = self.files.policy().clone();
        let src_display = request.source.clone();
        let dst_display = request.destination.clone();
        let overwrite = request.overwrite;
        run_blocking(&request.source, move || {
            ensure_root(&root, &src_display)?;
            let meta =
                fs::metadata(source.absolute()).map_err(|e| FsError::io(&src_display, &e))?;
            if meta.is_dir() {
                return copy_tree(&root, &source, &destination, &dst_display, overwrite, &policy);
            }
            let bytes = copy_file(
                &root,
                source.absolute(),
                destination.absolute(),
                &dst_display,
                meta.len(),
                overwrite,
                &policy,
            )?;
            Ok(CopyReport {
                items_copied: 1,
                bytes_copied: bytes,
                errors: Vec::new(),
            })
        })
        .await
    }

    /// Delete a file, symlink or directory. Irreversible.
    ///
    /// # Errors
    ///
    /// - [`FsError::PathValidation`] for the workspace root.
    /// - `FileOperation(NotFound)` if nothing is at the path.
    /// - `FileOperation(NotEmpty)` for a non-empty directory without
    ///   `recursive`.
    pub async fn delete_item(&self, request: DeleteRequest) -> FsResult<()> {
        let event = self
            .recorder()
            .event(Operation::Delete, &request.path, request.caller.as_ref());
        let result = self.delete_inner(&request).await;
        self.recorder().finish(event, result)
    }

    async fn delete_inner(&self, request: &DeleteRequest) -> FsResult<()> {
        request.validate()?;
        let resolved = self.resolver().resolve_entry(&request.path)?;
        if resolved.is_root() {
            return Err(FsError::validation(
                &request.path,
                "the workspace root cannot be deleted",
            ));
        }

        let _guard = self.files.locks().lock(resolved.absolute()).await;
        let display = request.path.clone();
        let recursive = request.recursive;
        run_blocking(&request.path, move || {
            let absolute = resolved.absolute();
            let meta = fs::symlink_metadata(absolute).map_err(|e| FsError::io(&display, &e))?;
            let removed = if !meta.is_dir() {
                fs::remove_file(absolute)
            } else if recursive {
                fs::remove_dir_all(absolute)
            } else {
                let mut entries =
                    fs::read_dir(absolute).map_err(|e| FsError::io(&display, &e))?;
                if entries.next().is_some() {
                    return Err(FsError::file_op(
                        &display,
                        FileOpKind::NotEmpty,
                        "directory is not empty; delete recursively to remove it",
                    ));
                }
                fs::remove_dir(absolute)
            };
            removed.map_err(|e| FsError::io(&display, &e))
        })
        .await
    }

    /// Start a lazy glob search.
    ///
    /// The returned iterator performs blocking directory reads as it is
    /// advanced; drive it from a blocking context in async code. A setup
    /// error is logged immediately. Otherwise one entry is logged when the
    /// iterator is exhausted or dropped, failed if any item failed.
    ///
    /// # Errors
    ///
    /// - [`FsError::PathValidation`] for an invalid pattern.
    /// - `FileOperation(NotFound | NotADirectory)` for a bad start path.
    pub fn find_files(&self, request: FindRequest) -> FsResult<FindFiles> {
        let event = self
            .recorder()
            .event(Operation::Find, &request.path, request.caller.as_ref());
        match self.find_inner(request) {
            Ok(found) => Ok(found.logged(self.recorder().clone(), event)),
            Err(e) => self.recorder().finish(event, Err(e)),
        }
    }

    fn find_inner(&self, request: FindRequest) -> FsResult<FindFiles> {
        request.validate()?;
        let pattern = Pattern::compile(&request.pattern, request.case_insensitive)?;
        let start = self.resolver().resolve(&request.path)?;
        require_directory(start.absolute(), &request.path)?;

        Ok(FindFiles::new(pattern, FindScope {
            root: self.root().to_path_buf(),
            start: start.absolute().to_path_buf(),
            max_depth: if request.recursive { self.max_depth } else { 1 },
            entry_types: request.entry_types,
            include_hidden: request.include_hidden,
            follow_external_symlinks: self.files.policy().follow_external_symlinks(),
        }))
    }

    /// Aggregate statistics over the whole workspace.
    ///
    /// Walks every entry on each call; symlinks are counted, not followed.
    ///
    /// # Errors
    ///
    /// Returns `FileOperation(NotFound)` if the workspace root is gone.
    pub async fn get_workspace_info(&self, caller: Option<CallerId>) -> FsResult<WorkspaceInfo> {
        let event = self
            .recorder()
            .event(Operation::WorkspaceInfo, ".", caller.as_ref());
        let result = self.info_inner().await;
        self.recorder().finish(event, result)
    }

    async fn info_inner(&self) -> FsResult<WorkspaceInfo> {
        let root = self.resolver().resolve(".")?;
        let name = self.name.as_str().to_owned();
        let created_at = self.created_at;
        run_blocking(".", move || Ok(collect_info(name, root.absolute(), created_at))).await
    }

    /// Remove empty directories below `path`, deepest first.
    ///
    /// Never removes the workspace root or the starting directory.
    /// Returns the removed paths, sorted.
    ///
    /// # Errors
    ///
    /// - `FileOperation(NotFound)` if the start path does not exist.
    /// - `FileOperation(NotADirectory)` if it is a file.
    pub async fn cleanup_empty_directories(&self, request: CleanupRequest) -> FsResult<Vec<String>> {
        let event = self
            .recorder()
            .event(Operation::Cleanup, &request.path, request.caller.as_ref());
        let result = self.cleanup_inner(&request).await;
        self.recorder().finish(event, result)
    }

    async fn cleanup_inner(&self, request: &CleanupRequest) -> FsResult<Vec<String>> {
        request.validate()?;
        let start = self.resolver().resolve(&request.path)?;
        let display = request.path.clone();
        run_blocking(&request.path, move || {
            require_directory(start.absolute(), &display)?;
            Ok(remove_empty_dirs(&start))
        })
        .await
    }

    async fn lock_pair(
        &self,
        a: &Path,
        b: &Path,
    ) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>) {
        let locks = self.files.locks();
        // Fixed order so two opposing moves cannot deadlock.
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let first_guard = locks.lock(first).await;
        let second_guard = if first == second {
            None
        } else {
            Some(locks.lock(second).await)
        };
        (first_guard, second_guard)
    }
}

struct ListOptions {
    max_depth: usize,
    include_hidden: bool,
    entry_types: Option<Vec<EntryType>>,
}

impl ListOptions {
    fn allows(&self, entry_type: EntryType) -> bool {
        self.entry_types
            .as_ref()
            .is_none_or(|types| types.contains(&entry_type))
    }
}

fn require_directory(absolute: &Path, display: &str) -> FsResult<()> {
    let meta = fs::metadata(absolute).map_err(|e| FsError::io(display, &e))?;
    if !meta.is_dir() {
        return Err(FsError::file_op(
            display,
            FileOpKind::NotADirectory,
            "expected a directory",
        ));
    }
    Ok(())
}

/// Children of `dir`, directories first then by name, with their paths.
fn read_sorted(dir: &Path, relative: &str, display: &str) -> FsResult<Vec<(FileRecord, PathBuf)>> {
    let reader = fs::read_dir(dir).map_err(|e| FsError::io(display, &e))?;
    let mut entries = Vec::new();
    for entry in reader {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = relative, error = %e, "skipping unreadable directory entry");
                continue;
            },
        };
        let path = entry.path();
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            // Removed since read_dir returned it.
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(path = relative, error = %e, "skipping entry without metadata");
                continue;
            },
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        let child = join_relative(relative, &name);
        entries.push((FileRecord::from_metadata(name, child, &meta), path));
    }
    entries.sort_by(|(a, _), (b, _)| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(entries)
}

fn list_into(
    dir: &Path,
    relative: &str,
    display: &str,
    depth: usize,
    options: &ListOptions,
    out: &mut Vec<FileRecord>,
) -> FsResult<()> {
    for (record, path) in read_sorted(dir, relative, display)? {
        if !options.include_hidden && record.is_hidden {
            continue;
        }
        let descend = record.is_dir() && depth < options.max_depth;
        let child_relative = record.relative_path.clone();
        if options.allows(record.entry_type) {
            out.push(record);
        }
        if descend
            && let Err(e) = list_into(
                &path,
                &child_relative,
                &child_relative,
                depth.saturating_add(1),
                options,
                out,
            )
        {
            // Concurrent removal of a subtree is not fatal to the listing.
            debug!(path = %child_relative, error = %e, "skipping subdirectory");
        }
    }
    Ok(())
}

fn ensure_directory(
    root: &Path,
    absolute: &Path,
    display: &str,
    create_parents: bool,
) -> FsResult<()> {
    ensure_root(root, display)?;
    match fs::metadata(absolute) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(FsError::file_op(
                display,
                FileOpKind::AlreadyExists,
                "a non-directory already exists at this path",
            ));
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => return Err(FsError::io(display, &e)),
    }

    if create_parents {
        return create_dirs_below(root, absolute, display);
    }
    match fs::create_dir(absolute) {
        Ok(()) => Ok(()),
        // Lost a race with another creator.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && absolute.is_dir() => Ok(()),
        Err(e) => Err(FsError::io(display, &e)),
    }
}

fn entry_exists(absolute: &Path, display: &str) -> FsResult<bool> {
    match fs::symlink_metadata(absolute) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FsError::io(display, &e)),
    }
}

fn copy_file(
    root: &Path,
    source: &Path,
    target: &Path,
    display: &str,
    len: u64,
    overwrite: bool,
    policy: &AccessPolicy,
) -> FsResult<u64> {
    policy.check_extension(display)?;
    policy.check_size(display, len)?;

    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => {
            return Err(FsError::file_op(
                display,
                FileOpKind::IsADirectory,
                "destination is a directory",
            ));
        },
        Ok(_) if !overwrite => return Err(FsError::already_exists(display)),
        // Replace a link itself; copying through it could write outside.
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(target).map_err(|e| FsError::io(display, &e))?;
        },
        Ok(_) => {},
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => return Err(FsError::io(display, &e)),
    }

    prepare_parent(root, target, display, true)?;
    fs::copy(source, target).map_err(|e| FsError::io(display, &e))
}

fn ensure_copy_dir(target: &Path, display: &str) -> FsResult<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(meta) if meta.file_type().is_symlink() => Err(FsError::security(
            display,
            "destination directory is a symlink",
        )),
        Ok(_) => Err(FsError::file_op(
            display,
            FileOpKind::NotADirectory,
            "a non-directory already exists at this path",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir(target).map_err(|e| FsError::io(display, &e))
        },
        Err(e) => Err(FsError::io(display, &e)),
    }
}

fn relative_below(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn copy_tree(
    root: &Path,
    source: &ResolvedPath,
    destination: &ResolvedPath,
    dst_display: &str,
    overwrite: bool,
    policy: &AccessPolicy,
) -> FsResult<CopyReport> {
    match fs::symlink_metadata(destination.absolute()) {
        Ok(meta) if meta.is_dir() && overwrite => {},
        Ok(_) if !overwrite => return Err(FsError::already_exists(dst_display)),
        Ok(_) => {
            return Err(FsError::file_op(
                dst_display,
                FileOpKind::NotADirectory,
                "destination exists and is not a directory",
            ));
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            prepare_parent(root, destination.absolute(), dst_display, true)?;
            fs::create_dir(destination.absolute()).map_err(|e| FsError::io(dst_display, &e))?;
        },
        Err(e) => return Err(FsError::io(dst_display, &e)),
    }

    let mut report = CopyReport::default();
    let mut walker = WalkDir::new(source.absolute())
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(e) => {
                let rel = e
                    .path()
                    .map(|p| relative_below(source.absolute(), p))
                    .unwrap_or_default();
                let path = join_relative(source.relative(), &rel);
                let err = match e.io_error() {
                    Some(io) => FsError::io(&path, io),
                    None => FsError::file_op(&path, FileOpKind::Other, e.to_string()),
                };
                report.errors.push(ItemError::new(path, &err));
                continue;
            },
        };

        let rel = relative_below(source.absolute(), entry.path());
        let target = destination.absolute().join(&rel);
        let item = join_relative(destination.relative(), &rel);
        let file_type = entry.file_type();

        let outcome = if file_type.is_symlink() {
            let path = join_relative(source.relative(), &rel);
            let err = FsError::file_op(&path, FileOpKind::Other, "symlinks are not copied");
            report.errors.push(ItemError::new(path, &err));
            continue;
        } else if file_type.is_dir() {
            let created = ensure_copy_dir(&target, &item);
            if created.is_err() {
                walker.skip_current_dir();
            }
            created.map(|()| 0)
        } else {
            entry
                .metadata()
                .map_err(|e| {
                    FsError::file_op(&item, FileOpKind::Other, e.to_string())
                })
                .and_then(|meta| {
                    copy_file(root, entry.path(), &target, &item, meta.len(), overwrite, policy)
                })
        };

        match outcome {
            Ok(bytes) => {
                report.items_copied = report.items_copied.saturating_add(1);
                report.bytes_copied = report.bytes_copied.saturating_add(bytes);
            },
            Err(err) => report.errors.push(ItemError::new(item, &err)),
        }
    }

    debug!(
        source = source.relative(),
        destination = destination.relative(),
        items = report.items_copied,
        errors = report.errors.len(),
        "copied directory tree"
    );
    Ok(report)
}

fn collect_info(name: String, root: &Path, created_at: Option<DateTime<Utc>>) -> WorkspaceInfo {
    let mut info = WorkspaceInfo {
        name,
        root_path: root.to_path_buf(),
        created_at,
        total_files: 0,
        total_directories: 0,
        total_symlinks: 0,
        total_size_bytes: 0,
        total_size_human: String::new(),
        max_depth: 0,
    };

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping entry during workspace scan");
                continue;
            },
        };
        info.max_depth = info.max_depth.max(entry.depth());
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            info.total_symlinks = info.total_symlinks.saturating_add(1);
        } else if file_type.is_dir() {
            info.total_directories = info.total_directories.saturating_add(1);
        } else if file_type.is_file() {
            info.total_files = info.total_files.saturating_add(1);
            let len = entry.metadata().map_or(0, |m| m.len());
            info.total_size_bytes = info.total_size_bytes.saturating_add(len);
        }
    }

    info.total_size_human = format_size(info.total_size_bytes);
    info
}

fn remove_empty_dirs(start: &ResolvedPath) -> Vec<String> {
    let mut removed = Vec::new();
    let walker = WalkDir::new(start.absolute())
        .follow_links(false)
        .min_depth(1)
        .contents_first(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping entry during cleanup");
                continue;
            },
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let rel = join_relative(
            start.relative(),
            &relative_below(start.absolute(), entry.path()),
        );
        match fs::remove_dir(entry.path()) {
            Ok(()) => removed.push(rel),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::DirectoryNotEmpty | io::ErrorKind::AlreadyExists
                ) => {},
            Err(e) => warn!(path = %rel, error = %e, "failed to remove empty directory"),
        }
    }

    removed.sort();
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_audit::LogQuery;
    use enclave_core::ErrorKind;
    use enclave_vfs::{ReadRequest, WriteRequest};

    struct Fixture {
        dir: tempfile::TempDir,
        log: Arc<OperationLog>,
        manager: WorkspaceManager,
    }

    fn fixture_with(policy: AccessPolicy) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(OperationLog::in_memory(1_000));
        let manager = WorkspaceManager::open(
            WorkspaceName::new("demo").unwrap(),
            dir.path(),
            policy,
            Arc::clone(&log),
        )
        .unwrap();
        Fixture { dir, log, manager }
    }

    fn fixture() -> Fixture {
        fixture_with(AccessPolicy::default())
    }

    fn touch(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn names(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.relative_path.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_orders_directories_first() {
        let fx = fixture();
        touch(fx.dir.path(), "b.txt", "b");
        touch(fx.dir.path(), "a.txt", "a");
        touch(fx.dir.path(), "zeta/x.txt", "x");
        fs::create_dir(fx.dir.path().join("alpha")).unwrap();
        touch(fx.dir.path(), ".hidden", "h");

        let records = fx.manager.list_directory(ListRequest::new(".")).await.unwrap();
        assert_eq!(names(&records), vec!["alpha", "zeta", "a.txt", "b.txt"]);

        let records = fx
            .manager
            .list_directory(ListRequest::new(".").with_hidden(true))
            .await
            .unwrap();
        assert_eq!(names(&records), vec!["alpha", "zeta", ".hidden", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_recursive_list_is_pre_order() {
        let fx = fixture();
        touch(fx.dir.path(), "src/lib.rs", "");
        touch(fx.dir.path(), "src/util/mod.rs", "");
        touch(fx.dir.path(), "Cargo.toml", "");

        let records = fx
            .manager
            .list_directory(ListRequest::new(".").with_recursive(true))
            .await
            .unwrap();
        assert_eq!(names(&records), vec![
            "src",
            "src/util",
            "src/util/mod.rs",
            "src/lib.rs",
            "Cargo.toml"
        ]);

        let files = fx
            .manager
            .list_directory(
                ListRequest::new(".")
                    .with_recursive(true)
                    .with_entry_types(vec![EntryType::File]),
            )
            .await
            .unwrap();
        assert_eq!(names(&files), vec!["src/util/mod.rs", "src/lib.rs", "Cargo.toml"]);
    }

    #[tokio::test]
    async fn test_recursive_list_respects_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/b/c/d.txt", "");
        let manager = WorkspaceManager::open(
            WorkspaceName::new("deep").unwrap(),
            dir.path(),
            AccessPolicy::default(),
            Arc::new(OperationLog::in_memory(10)),
        )
        .unwrap()
        .with_max_depth(2);

        let records = manager
            .list_directory(ListRequest::new(".").with_recursive(true))
            .await
            .unwrap();
        assert_eq!(names(&records), vec!["a", "a/b"]);
    }

    #[tokio::test]
    async fn test_list_errors() {
        let fx = fixture();
        touch(fx.dir.path(), "file.txt", "x");

        let err = fx.manager.list_directory(ListRequest::new("missing")).await.unwrap_err();
        assert!(err.is_not_found());

        let err = fx.manager.list_directory(ListRequest::new("file.txt")).await.unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::NotADirectory));
    }

    #[tokio::test]
    async fn test_create_directory_is_idempotent() {
        let fx = fixture();
        fx.manager.create_directory(MkdirRequest::new("a/b")).await.unwrap();
        let record = fx.manager.create_directory(MkdirRequest::new("a/b")).await.unwrap();
        assert!(record.is_dir());
        assert_eq!(record.relative_path, "a/b");

        let listed = fx.manager.list_directory(ListRequest::new("a")).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_create_directory_errors() {
        let fx = fixture();
        touch(fx.dir.path(), "file", "x");
        let err = fx.manager.create_directory(MkdirRequest::new("file")).await.unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::AlreadyExists));

        let err = fx
            .manager
            .create_directory(MkdirRequest::new("x/y").with_create_parents(false))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_move_then_read_old_path_is_not_found() {
        let fx = fixture();
        fx.manager
            .files()
            .write(WriteRequest::new("notes/todo.txt", "buy milk"))
            .await
            .unwrap();

        let record = fx
            .manager
            .move_item(MoveRequest::new("notes/todo.txt", "archive/todo.txt"))
            .await
            .unwrap();
        assert_eq!(record.relative_path, "archive/todo.txt");

        let err = fx
            .manager
            .files()
            .read(ReadRequest::new("notes/todo.txt"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let moved = fx
            .manager
            .files()
            .read(ReadRequest::new("archive/todo.txt"))
            .await
            .unwrap();
        assert_eq!(moved, "buy milk");

        let moves = fx
            .log
            .query(&LogQuery::new().with_operation(Operation::Move))
            .unwrap();
        assert_eq!(moves[0].destination_path.as_deref(), Some("archive/todo.txt"));
    }

    #[tokio::test]
    async fn test_move_respects_overwrite() {
        let fx = fixture();
        touch(fx.dir.path(), "a.txt", "a");
        touch(fx.dir.path(), "b.txt", "b");

        let err = fx
            .manager
            .move_item(MoveRequest::new("a.txt", "b.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::AlreadyExists));

        fx.manager
            .move_item(MoveRequest::new("a.txt", "b.txt").with_overwrite(true))
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(fx.dir.path().join("b.txt")).unwrap(), "a");
        assert!(!fx.dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_move_directory_into_itself() {
        let fx = fixture();
        fs::create_dir(fx.dir.path().join("dir")).unwrap();
        let err = fx
            .manager
            .move_item(MoveRequest::new("dir", "dir/inner"))
            .await
            .unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::Other));
    }

    #[tokio::test]
    async fn test_move_destination_escape_rejected() {
        let fx = fixture();
        touch(fx.dir.path(), "a.txt", "a");
        let err = fx
            .manager
            .move_item(MoveRequest::new("a.txt", "../../a.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Security);
        assert!(fx.dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_copy_file() {
        let fx = fixture();
        touch(fx.dir.path(), "a.txt", "hello");
        let report = fx
            .manager
            .copy_item(CopyRequest::new("a.txt", "copies/a.txt"))
            .await
            .unwrap();
        assert_eq!(report.items_copied, 1);
        assert_eq!(report.bytes_copied, 5);
        assert!(report.is_complete());
        assert_eq!(fs::read_to_string(fx.dir.path().join("copies/a.txt")).unwrap(), "hello");

        let err = fx
            .manager
            .copy_item(CopyRequest::new("a.txt", "copies/a.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::AlreadyExists));
    }

    #[tokio::test]
    async fn test_copy_tree_collects_item_errors() {
        let fx = fixture_with(AccessPolicy::new().with_allowed_extensions([".txt"]));
        touch(fx.dir.path(), "src/a.txt", "aa");
        touch(fx.dir.path(), "src/sub/b.txt", "bbb");
        touch(fx.dir.path(), "src/run.sh", "echo");

        let report = fx
            .manager
            .copy_item(CopyRequest::new("src", "dst"))
            .await
            .unwrap();
        // a.txt, sub, sub/b.txt
        assert_eq!(report.items_copied, 3);
        assert_eq!(report.bytes_copied, 5);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "dst/run.sh");
        assert_eq!(report.errors[0].error_type, ErrorKind::InvalidFileType);
        assert!(fx.dir.path().join("dst/sub/b.txt").is_file());

        let copies = fx
            .log
            .query(&LogQuery::new().with_operation(Operation::Copy))
            .unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].error_type(), Some(ErrorKind::InvalidFileType));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_tree_reports_symlinks() {
        let fx = fixture();
        touch(fx.dir.path(), "src/a.txt", "a");
        std::os::unix::fs::symlink(
            fx.dir.path().join("src/a.txt"),
            fx.dir.path().join("src/link.txt"),
        )
        .unwrap();

        let report = fx
            .manager
            .copy_item(CopyRequest::new("src", "dst"))
            .await
            .unwrap();
        assert_eq!(report.items_copied, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "src/link.txt");
        assert!(!fx.dir.path().join("dst/link.txt").exists());
    }

    #[tokio::test]
    async fn test_copy_into_itself_rejected() {
        let fx = fixture();
        touch(fx.dir.path(), "src/a.txt", "a");
        let err = fx
            .manager
            .copy_item(CopyRequest::new("src", "src/nested"))
            .await
            .unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::Other));
    }

    #[tokio::test]
    async fn test_delete_requires_recursive_for_non_empty() {
        let fx = fixture();
        touch(fx.dir.path(), "notes/todo.txt", "buy milk");

        let err = fx.manager.delete_item(DeleteRequest::new("notes")).await.unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::NotEmpty));

        fx.manager
            .delete_item(DeleteRequest::new("notes").with_recursive(true))
            .await
            .unwrap();
        let listed = fx.manager.list_directory(ListRequest::new(".")).await.unwrap();
        assert!(listed.iter().all(|r| r.name != "notes"));
    }

    #[tokio::test]
    async fn test_delete_file_empty_dir_and_root() {
        let fx = fixture();
        touch(fx.dir.path(), "a.txt", "a");
        fs::create_dir(fx.dir.path().join("empty")).unwrap();

        fx.manager.delete_item(DeleteRequest::new("a.txt")).await.unwrap();
        fx.manager.delete_item(DeleteRequest::new("empty")).await.unwrap();
        assert!(!fx.dir.path().join("empty").exists());

        let err = fx.manager.delete_item(DeleteRequest::new("a.txt")).await.unwrap_err();
        assert!(err.is_not_found());

        let err = fx.manager.delete_item(DeleteRequest::new(".")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathValidation);
        assert!(fx.dir.path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_delete_symlink_keeps_target() {
        let fx = fixture();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("keep.txt"), "k").unwrap();
        std::os::unix::fs::symlink(outside.path(), fx.dir.path().join("ext")).unwrap();

        fx.manager
            .delete_item(DeleteRequest::new("ext").with_recursive(true))
            .await
            .unwrap();
        assert!(outside.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_find_files() {
        let fx = fixture();
        touch(fx.dir.path(), "notes/todo.txt", "");
        touch(fx.dir.path(), "notes/Ideas.TXT", "");
        touch(fx.dir.path(), "readme.md", "");

        let found: Vec<String> = fx
            .manager
            .find_files(FindRequest::new("*.txt").with_case_insensitive(true))
            .unwrap()
            .map(|r| r.unwrap().relative_path)
            .collect();
        assert_eq!(found, vec!["notes/Ideas.TXT", "notes/todo.txt"]);

        let shallow: Vec<String> = fx
            .manager
            .find_files(FindRequest::new("*").with_recursive(false))
            .unwrap()
            .map(|r| r.unwrap().relative_path)
            .collect();
        assert_eq!(shallow, vec!["notes", "readme.md"]);

        let err = fx
            .manager
            .find_files(FindRequest::new("*").in_directory("readme.md"))
            .unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::NotADirectory));
        assert_eq!(
            fx.log
                .query(&LogQuery::new().with_operation(Operation::Find))
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_find_logged_once_when_dropped_early() {
        let fx = fixture();
        touch(fx.dir.path(), "a.txt", "");
        touch(fx.dir.path(), "b.txt", "");
        let finds = || {
            fx.log
                .query(&LogQuery::new().with_operation(Operation::Find))
                .unwrap()
        };

        let mut found = fx.manager.find_files(FindRequest::new("*.txt")).unwrap();
        assert_eq!(found.next().unwrap().unwrap().relative_path, "a.txt");
        assert!(finds().is_empty());

        drop(found);
        let entries = finds();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_success());
    }

    #[test]
    fn test_find_traversal_error_is_logged() {
        let fx = fixture();
        touch(fx.dir.path(), "a.txt", "");
        touch(fx.dir.path(), "b.txt", "");

        let mut found = fx.manager.find_files(FindRequest::new("*.txt")).unwrap();
        assert!(found.next().unwrap().is_ok());
        // The listing is already read; the remaining entry vanishes under it.
        fs::remove_dir_all(fx.dir.path()).unwrap();
        let rest: Vec<_> = found.collect();
        assert_eq!(rest.len(), 1);
        assert!(rest[0].as_ref().unwrap_err().is_not_found());

        let entries = fx
            .log
            .query(&LogQuery::new().with_operation(Operation::Find))
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].error_type(), Some(ErrorKind::FileOperation));
        assert!(
            entries[0]
                .error_message()
                .unwrap()
                .starts_with("1 items failed during search (1 matched)")
        );
    }

    #[tokio::test]
    async fn test_workspace_info() {
        let fx = fixture();
        touch(fx.dir.path(), "a.txt", "12345");
        touch(fx.dir.path(), "sub/deep/b.txt", "123");

        let info = fx.manager.get_workspace_info(None).await.unwrap();
        assert_eq!(info.name, "demo");
        assert_eq!(info.total_files, 2);
        assert_eq!(info.total_directories, 2);
        assert_eq!(info.total_size_bytes, 8);
        assert_eq!(info.total_size_human, "8 B");
        assert_eq!(info.max_depth, 3);
    }

    #[tokio::test]
    async fn test_cleanup_removes_nested_empty_directories() {
        let fx = fixture();
        fs::create_dir_all(fx.dir.path().join("a/b/c")).unwrap();
        touch(fx.dir.path(), "keep/file.txt", "x");
        fs::create_dir(fx.dir.path().join("keep/empty")).unwrap();

        let removed = fx
            .manager
            .cleanup_empty_directories(CleanupRequest::default())
            .await
            .unwrap();
        assert_eq!(removed, vec!["a", "a/b", "a/b/c", "keep/empty"]);
        assert!(fx.dir.path().join("keep/file.txt").exists());
        assert!(fx.dir.path().exists());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_start_directory() {
        let fx = fixture();
        fs::create_dir_all(fx.dir.path().join("start/empty")).unwrap();
        let removed = fx
            .manager
            .cleanup_empty_directories(CleanupRequest::new("start"))
            .await
            .unwrap();
        assert_eq!(removed, vec!["start/empty"]);
        assert!(fx.dir.path().join("start").is_dir());
    }

    #[tokio::test]
    async fn test_operations_fail_after_root_removed() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("ws");
        fs::create_dir(&root).unwrap();
        let manager = WorkspaceManager::open(
            WorkspaceName::new("gone").unwrap(),
            &root,
            AccessPolicy::default(),
            Arc::new(OperationLog::in_memory(10)),
        )
        .unwrap();
        fs::remove_dir_all(&root).unwrap();

        let err = manager.list_directory(ListRequest::new(".")).await.unwrap_err();
        assert!(err.is_not_found());
        let err = manager
            .files()
            .write(WriteRequest::new("a.txt", "x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = manager
            .create_directory(MkdirRequest::new("a/b"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!root.exists());
    }
}
