//! Single-file operations.
//!
//! Every public method resolves its path, runs the filesystem work on the
//! blocking pool, and records exactly one operation log entry whether it
//! succeeds or fails.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use enclave_core::{FileOpKind, FsError, FsResult, Operation};
use tempfile::NamedTempFile;

use crate::dirs::{create_dirs_below, ensure_root};
use crate::locks::PathLocks;
use crate::path::{PathResolver, ResolvedPath};
use crate::policy::AccessPolicy;
use crate::record::FileRecord;
use crate::recorder::OperationRecorder;
use crate::request::{AppendRequest, ExistsRequest, ReadRequest, StatRequest, WriteRequest};
use crate::task::run_blocking;

/// Mode for newly created files.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Reads, writes and inspects individual files in one workspace.
#[derive(Debug, Clone)]
pub struct FileHandler {
    resolver: PathResolver,
    policy: AccessPolicy,
    recorder: OperationRecorder,
    locks: Arc<PathLocks>,
}

impl FileHandler {
    /// Create a handler rooted at `root`.
    ///
    /// The resolver honours `policy.follow_external_symlinks()`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is missing or not a directory.
    pub fn open(
        root: impl AsRef<Path>,
        policy: AccessPolicy,
        recorder: OperationRecorder,
    ) -> FsResult<Self> {
        let resolver =
            PathResolver::new(root)?.with_external_symlinks(policy.follow_external_symlinks());
        Ok(Self {
            resolver,
            policy,
            recorder,
            locks: Arc::new(PathLocks::new()),
        })
    }

    /// Share an existing lock table instead of the handler's own.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<PathLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Path resolver for this workspace.
    #[must_use]
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Access policy in force.
    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Operation recorder.
    #[must_use]
    pub fn recorder(&self) -> &OperationRecorder {
        &self.recorder
    }

    /// Per-path write locks.
    #[must_use]
    pub fn locks(&self) -> &Arc<PathLocks> {
        &self.locks
    }

    /// Read a file as text, decoded as UTF-8 unless the request names
    /// another encoding.
    ///
    /// # Errors
    ///
    /// - `FileOperation(NotFound)` if the file does not exist.
    /// - `FileOperation(IsADirectory)` for directories.
    /// - [`FsError::FileSize`] if the file exceeds the size limit.
    /// - [`FsError::Encoding`] if the content is malformed for the
    ///   requested encoding.
    /// - Resolution errors from [`PathResolver::resolve`].
    pub async fn read(&self, request: ReadRequest) -> FsResult<String> {
        let event = self
            .recorder
            .event(Operation::Read, &request.path, request.caller.as_ref());
        let result = async {
            let bytes = self.read_raw(&request).await?;
            request
                .encoding
                .unwrap_or_default()
                .decode(&request.path, bytes)
        }
        .await;
        self.recorder.finish(event, result)
    }

    /// Read a file as raw bytes.
    ///
    /// # Errors
    ///
    /// Same as [`FileHandler::read`] except that encoding is not checked.
    pub async fn read_bytes(&self, request: ReadRequest) -> FsResult<Vec<u8>> {
        let event = self
            .recorder
            .event(Operation::Read, &request.path, request.caller.as_ref());
        let result = self.read_raw(&request).await;
        self.recorder.finish(event, result)
    }

    async fn read_raw(&self, request: &ReadRequest) -> FsResult<Vec<u8>> {
        request.validate()?;
        let resolved = self.resolver.resolve(&request.path)?;
        let display = request.path.clone();
        let limit = self.policy.max_file_size();
        let absolute = resolved.absolute().to_path_buf();
        run_blocking(&request.path, move || read_limited(&absolute, &display, limit)).await
    }

    /// Create or replace a file atomically.
    ///
    /// Content goes to a temporary file in the target directory which is
    /// then renamed over the target, so readers see either the old or the
    /// new content. Concurrent writers of the same path are serialized.
    /// A symlink at the target is replaced, never written through.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidFileType`] if the extension is not allowed.
    /// - [`FsError::FileSize`] if the content exceeds the limit after
    ///   encoding.
    /// - [`FsError::Encoding`] if the content cannot be stored in the
    ///   requested encoding.
    /// - `FileOperation(AlreadyExists)` if the file exists and
    ///   `overwrite` is false.
    /// - `FileOperation(NotFound)` if the parent is missing and parent
    ///   creation is disabled.
    /// - `FileOperation(IsADirectory)` if the target is a directory.
    pub async fn write(&self, request: WriteRequest) -> FsResult<FileRecord> {
        let event = self
            .recorder
            .event(Operation::Write, &request.path, request.caller.as_ref());
        let result = self.write_inner(request).await;
        self.recorder.finish(event, result)
    }

    async fn write_inner(&self, request: WriteRequest) -> FsResult<FileRecord> {
        request.validate()?;
        let WriteRequest {
            path,
            content,
            overwrite,
            encoding,
            ..
        } = request;
        let content = match encoding {
            Some(encoding) => encoding.encode(&path, content)?,
            None => content,
        };
        self.policy.check_size(&path, content.len() as u64)?;
        // The final component is not followed, so the checked name is the
        // name that gets written.
        let resolved = self.resolver.resolve_entry(&path)?;
        self.policy.check_extension(resolved.relative())?;

        let _guard = self.locks.lock(resolved.absolute()).await;
        let root = self.resolver.root().to_path_buf();
        let create_parents = self.policy.create_parents();
        let display = path.clone();
        run_blocking(&path, move || {
            write_atomic(
                &root,
                resolved.absolute(),
                &display,
                &content,
                overwrite,
                create_parents,
            )?;
            record_for(&resolved, &display)
        })
        .await
    }

    /// Append to an existing file.
    ///
    /// Never creates the file. Appends to the same path are serialized so
    /// concurrent payloads never interleave. A symlink inside the workspace
    /// is appended through; the returned record still describes the path
    /// the caller named.
    ///
    /// # Errors
    ///
    /// - `FileOperation(NotFound)` if the file does not exist.
    /// - [`FsError::FileSize`] if the resulting size would exceed the limit;
    ///   nothing is written in that case.
    /// - [`FsError::InvalidFileType`] if the extension of the path, or of
    ///   the file a symlink points to, is not allowed.
    /// - [`FsError::Encoding`] if the content cannot be stored in the
    ///   requested encoding.
    pub async fn append(&self, request: AppendRequest) -> FsResult<FileRecord> {
        let event = self
            .recorder
            .event(Operation::Append, &request.path, request.caller.as_ref());
        let result = self.append_inner(request).await;
        self.recorder.finish(event, result)
    }

    async fn append_inner(&self, request: AppendRequest) -> FsResult<FileRecord> {
        request.validate()?;
        let AppendRequest {
            path,
            content,
            encoding,
            ..
        } = request;
        let content = match encoding {
            Some(encoding) => encoding.encode(&path, content)?,
            None => content,
        };
        let entry = self.resolver.resolve_entry(&path)?;
        let target = self.resolver.resolve(&path)?;
        self.policy.check_extension(entry.relative())?;
        self.policy.check_extension(target.relative())?;

        let _guard = self.locks.lock(target.absolute()).await;
        let root = self.resolver.root().to_path_buf();
        let policy = self.policy.clone();
        let display = path.clone();
        run_blocking(&path, move || {
            ensure_root(&root, &display)?;
            append_checked(target.absolute(), &display, &content, &policy)?;
            let meta = fs::metadata(target.absolute()).map_err(|e| FsError::io(&display, &e))?;
            Ok(FileRecord::from_metadata(entry.name(), entry.relative(), &meta))
        })
        .await
    }

    /// Whether `path` exists.
    ///
    /// A missing path, or one that runs through a regular file, is `false`.
    ///
    /// # Errors
    ///
    /// Returns resolution errors ([`FsError::Security`],
    /// [`FsError::PathValidation`]) and unexpected I/O failures.
    pub async fn exists(&self, request: ExistsRequest) -> FsResult<bool> {
        let event = self
            .recorder
            .event(Operation::Exists, &request.path, request.caller.as_ref());
        let result = async {
            request.validate()?;
            let resolved = match self.resolver.resolve(&request.path) {
                Ok(resolved) => resolved,
                Err(e) if e.file_op_kind() == Some(FileOpKind::NotADirectory) => return Ok(false),
                Err(e) => return Err(e),
            };
            let path = request.path.clone();
            run_blocking(&request.path, move || {
                match fs::symlink_metadata(resolved.absolute()) {
                    Ok(_) => Ok(true),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(FsError::io(&path, &e)),
                }
            })
            .await
        }
        .await;
        self.recorder.finish(event, result)
    }

    /// Metadata for one entry. A symlink is reported as itself.
    ///
    /// # Errors
    ///
    /// Returns `FileOperation(NotFound)` if the entry does not exist, or a
    /// resolution error.
    pub async fn info(&self, request: StatRequest) -> FsResult<FileRecord> {
        let event = self
            .recorder
            .event(Operation::Stat, &request.path, request.caller.as_ref());
        let result = async {
            request.validate()?;
            let resolved = self.resolver.resolve_entry(&request.path)?;
            let path = request.path.clone();
            let root_name = self.recorder.workspace().to_owned();
            run_blocking(&request.path, move || {
                let mut record = record_for(&resolved, &path)?;
                if resolved.is_root() {
                    record.name = root_name;
                }
                Ok(record)
            })
            .await
        }
        .await;
        self.recorder.finish(event, result)
    }
}

/// Build a fresh record for `resolved` without following a final symlink.
///
/// # Errors
///
/// Returns `FileOperation(NotFound)` if the entry is gone.
pub fn record_for(resolved: &ResolvedPath, display: &str) -> FsResult<FileRecord> {
    let meta = fs::symlink_metadata(resolved.absolute()).map_err(|e| FsError::io(display, &e))?;
    Ok(FileRecord::from_metadata(
        resolved.name(),
        resolved.relative(),
        &meta,
    ))
}

fn read_limited(absolute: &Path, display: &str, limit: u64) -> FsResult<Vec<u8>> {
    let file = File::open(absolute).map_err(|e| FsError::io(display, &e))?;
    let meta = file.metadata().map_err(|e| FsError::io(display, &e))?;
    ensure_not_dir(&meta, display)?;
    if meta.len() > limit {
        return Err(FsError::FileSize {
            path: display.to_owned(),
            size: meta.len(),
            limit,
        });
    }

    // The file may grow between stat and read; never buffer past the limit.
    let mut buf = Vec::with_capacity(usize::try_from(meta.len()).unwrap_or(0));
    file.take(limit.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|e| FsError::io(display, &e))?;
    let read = buf.len() as u64;
    if read > limit {
        return Err(FsError::FileSize {
            path: display.to_owned(),
            size: read,
            limit,
        });
    }
    Ok(buf)
}

fn ensure_not_dir(meta: &Metadata, display: &str) -> FsResult<()> {
    if meta.is_dir() {
        return Err(FsError::file_op(
            display,
            FileOpKind::IsADirectory,
            "expected a file, found a directory",
        ));
    }
    Ok(())
}

/// Ensure the parent of `absolute` is a directory, creating it if allowed.
///
/// Fails if the workspace `root` has been removed; missing parents are
/// created one level at a time below it, never the root itself.
///
/// # Errors
///
/// Returns `FileOperation(NotFound)` if the root is gone, or the parent is
/// missing and `create_parents` is false, or `FileOperation(NotADirectory)`
/// if the parent is not a directory.
pub fn prepare_parent(
    root: &Path,
    absolute: &Path,
    display: &str,
    create_parents: bool,
) -> FsResult<()> {
    ensure_root(root, display)?;
    let Some(parent) = absolute.parent() else {
        return Err(FsError::validation(display, "path has no parent directory"));
    };
    match fs::metadata(parent) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(FsError::file_op(
            display,
            FileOpKind::NotADirectory,
            "parent is not a directory",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if !create_parents {
                return Err(FsError::file_op(
                    display,
                    FileOpKind::NotFound,
                    "parent directory does not exist",
                ));
            }
            create_dirs_below(root, parent, display)
        },
        Err(e) => Err(FsError::io(display, &e)),
    }
}

fn write_atomic(
    root: &Path,
    absolute: &Path,
    display: &str,
    content: &[u8],
    overwrite: bool,
    create_parents: bool,
) -> FsResult<()> {
    prepare_parent(root, absolute, display, create_parents)?;

    // lstat: a symlink at the target is replaced by the rename below.
    let existing = match fs::symlink_metadata(absolute) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(FsError::io(display, &e)),
    };
    if let Some(meta) = &existing {
        ensure_not_dir(meta, display)?;
        if !overwrite {
            return Err(FsError::already_exists(display));
        }
    }
    let existing = existing.filter(|meta| !meta.file_type().is_symlink());

    let parent = absolute.parent().unwrap_or(absolute);
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| FsError::io(display, &e))?;
    tmp.write_all(content)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| FsError::io(display, &e))?;

    match &existing {
        Some(meta) => tmp
            .as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| FsError::io(display, &e))?,
        None => set_new_file_mode(tmp.as_file(), display)?,
    }

    let persisted = if overwrite {
        tmp.persist(absolute)
    } else {
        tmp.persist_noclobber(absolute)
    };
    persisted.map_err(|e| FsError::io(display, &e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_new_file_mode(file: &File, display: &str) -> FsResult<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(NEW_FILE_MODE))
        .map_err(|e| FsError::io(display, &e))
}

#[cfg(not(unix))]
fn set_new_file_mode(_file: &File, _display: &str) -> FsResult<()> {
    Ok(())
}

fn append_checked(
    absolute: &Path,
    display: &str,
    content: &[u8],
    policy: &AccessPolicy,
) -> FsResult<()> {
    let meta = fs::metadata(absolute).map_err(|e| FsError::io(display, &e))?;
    ensure_not_dir(&meta, display)?;
    policy.check_size(display, meta.len().saturating_add(content.len() as u64))?;

    let mut file = OpenOptions::new()
        .append(true)
        .open(absolute)
        .map_err(|e| FsError::io(display, &e))?;
    file.write_all(content)
        .and_then(|()| file.sync_data())
        .map_err(|e| FsError::io(display, &e))
}
