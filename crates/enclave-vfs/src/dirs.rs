//! Directory creation bounded by a live workspace root.
//!
//! These run inside blocking tasks, after the path lock is held. The root
//! may have been deleted since the path was resolved, so every helper
//! re-checks it and creates directories one level at a time below it. The
//! root itself is never created.

use std::fs;
use std::io;
use std::path::Path;

use enclave_core::{FileOpKind, FsError, FsResult};

/// Fail unless `root` is still a directory.
///
/// # Errors
///
/// Returns `FileOperation(NotFound)` if the root is gone, or
/// `FileOperation(NotADirectory)` if something else replaced it.
pub fn ensure_root(root: &Path, display: &str) -> FsResult<()> {
    match fs::symlink_metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(FsError::file_op(
            display,
            FileOpKind::NotADirectory,
            "workspace root is no longer a directory",
        )),
        Err(_) => Err(FsError::file_op(
            display,
            FileOpKind::NotFound,
            "workspace root no longer exists",
        )),
    }
}

/// Create every missing directory from `root` down to `target`.
///
/// Targets outside `root` (only reachable through an allowed external
/// symlink) are anchored at their deepest existing ancestor instead.
///
/// # Errors
///
/// - `FileOperation(NotFound)` if the root disappears, before or during
///   creation.
/// - `FileOperation(NotADirectory)` if a component is a file.
/// - [`FsError::Security`] if a component became a symlink after the path
///   was resolved.
pub fn create_dirs_below(root: &Path, target: &Path, display: &str) -> FsResult<()> {
    ensure_root(root, display)?;
    let anchor = if target.starts_with(root) {
        root
    } else {
        target
            .ancestors()
            .find(|a| a.is_dir())
            .ok_or_else(|| FsError::file_op(display, FileOpKind::NotFound, "no existing ancestor"))?
    };
    let Ok(rest) = target.strip_prefix(anchor) else {
        return Err(FsError::file_op(
            display,
            FileOpKind::Other,
            "target is not below its anchor",
        ));
    };

    let mut current = anchor.to_path_buf();
    for component in rest.components() {
        current.push(component);
        match fs::create_dir(&current) {
            Ok(()) => {},
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                require_real_directory(&current, display)?;
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // The level above vanished; report a deleted root as such.
                ensure_root(root, display)?;
                return Err(FsError::io(display, &e));
            },
            Err(e) => return Err(FsError::io(display, &e)),
        }
    }
    Ok(())
}

fn require_real_directory(path: &Path, display: &str) -> FsResult<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| FsError::io(display, &e))?;
    if meta.file_type().is_symlink() {
        return Err(FsError::security(
            display,
            "path component was replaced by a symlink",
        ));
    }
    if !meta.is_dir() {
        return Err(FsError::file_op(
            display,
            FileOpKind::NotADirectory,
            "a path component is not a directory",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_core::ErrorKind;

    #[test]
    fn test_creates_nested_levels() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        create_dirs_below(&root, &root.join("a/b/c"), "a/b/c").unwrap();
        assert!(root.join("a/b/c").is_dir());

        // Existing levels are fine.
        create_dirs_below(&root, &root.join("a/b/d"), "a/b/d").unwrap();
        assert!(root.join("a/b/d").is_dir());
    }

    #[test]
    fn test_never_recreates_a_deleted_root() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().canonicalize().unwrap().join("ws");
        fs::create_dir(&root).unwrap();
        fs::remove_dir(&root).unwrap();

        let err = create_dirs_below(&root, &root.join("sub/deeper"), "sub/deeper").unwrap_err();
        assert!(err.is_not_found());
        assert!(!root.exists());
    }

    #[test]
    fn test_file_component_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("file"), "x").unwrap();

        let err = create_dirs_below(&root, &root.join("file/sub"), "file/sub").unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::NotADirectory));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_component_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        let err = create_dirs_below(&root, &root.join("link/sub"), "link/sub").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Security);
        assert!(!outside.path().join("sub").exists());
    }
}
