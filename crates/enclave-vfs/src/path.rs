//! Workspace path resolution and containment.
//!
//! Resolution runs in two phases. The lexical phase rejects malformed and
//! escaping input without touching the filesystem. The filesystem phase
//! walks the remaining components from the canonical root, following
//! symlinks one component at a time and checking each target against the
//! root, so no path outside the workspace is ever opened, created or
//! reported on.

use std::io;
use std::path::{Path, PathBuf};

use enclave_core::{FileOpKind, FsError, FsResult};

/// Longest accepted relative path, in bytes.
pub const MAX_PATH_BYTES: usize = 4096;

/// Longest accepted single path component, in bytes.
pub const MAX_COMPONENT_BYTES: usize = 255;

/// Lexically normalize a caller-supplied relative path into components.
///
/// Backslashes are treated as separators; empty and `.` segments are
/// dropped; `..` pops the previous component. Pure: no filesystem access.
///
/// # Errors
///
/// - [`FsError::PathValidation`] for NUL bytes or over-long paths/components.
/// - [`FsError::Security`] for absolute paths, drive prefixes, or a `..`
///   that would climb above the root.
pub fn normalize(raw: &str) -> FsResult<Vec<String>> {
    if raw.contains('\0') {
        return Err(FsError::validation(
            raw.replace('\0', "\\0"),
            "path contains a NUL byte",
        ));
    }
    if raw.len() > MAX_PATH_BYTES {
        return Err(FsError::validation(
            truncate_for_display(raw),
            format!("path exceeds {MAX_PATH_BYTES} bytes"),
        ));
    }

    let unified = raw.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(FsError::security(raw, "absolute paths are not allowed"));
    }
    if has_drive_prefix(&unified) {
        return Err(FsError::security(raw, "drive-prefixed paths are not allowed"));
    }

    let mut components: Vec<String> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if components.pop().is_none() {
                    return Err(FsError::security(
                        raw,
                        "path traverses above the workspace root",
                    ));
                }
            },
            name => {
                if name.len() > MAX_COMPONENT_BYTES {
                    return Err(FsError::validation(
                        truncate_for_display(raw),
                        format!("path component exceeds {MAX_COMPONENT_BYTES} bytes"),
                    ));
                }
                components.push(name.to_owned());
            },
        }
    }
    Ok(components)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn truncate_for_display(raw: &str) -> String {
    let mut end = raw.len().min(64);
    while !raw.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    format!("{}...", &raw[..end])
}

/// A path proven to lie inside a workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    /// Host path to operate on.
    #[must_use]
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Normalized `/`-separated path relative to the root; `.` for the root.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Whether this is the workspace root itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative == "."
    }

    /// Final component name, or `.` for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(".")
    }

    /// Relative path of a child entry named `name`.
    #[must_use]
    pub fn child_relative(&self, name: &str) -> String {
        join_relative(&self.relative, name)
    }
}

/// Join a relative parent (`.` for the root) and a child name.
#[must_use]
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent == "." || parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

/// Resolves caller-supplied relative paths against one workspace root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    follow_external_symlinks: bool,
}

impl PathResolver {
    /// Create a resolver for `root`, canonicalizing it once.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::FileOperation`] if the root does not exist or is
    /// not a directory.
    pub fn new(root: impl AsRef<Path>) -> FsResult<Self> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|e| FsError::io(root.display().to_string(), &e))?;
        if !canonical.is_dir() {
            return Err(FsError::file_op(
                root.display().to_string(),
                FileOpKind::NotADirectory,
                "workspace root is not a directory",
            ));
        }
        Ok(Self {
            root: canonical,
            follow_external_symlinks: false,
        })
    }

    /// Allow symlinks whose targets lie outside the root.
    #[must_use]
    pub fn with_external_symlinks(mut self, allow: bool) -> Self {
        self.follow_external_symlinks = allow;
        self
    }

    /// Canonical workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative`, following symlinks in every component.
    ///
    /// Missing trailing components are allowed (for create operations);
    /// they are appended to the deepest existing, verified ancestor.
    ///
    /// # Errors
    ///
    /// - [`FsError::PathValidation`] / [`FsError::Security`] from [`normalize`].
    /// - [`FsError::Security`] if a symlink resolves outside the root or dangles.
    /// - [`FsError::FileOperation`] if the root no longer exists or an
    ///   intermediate component is not a directory.
    pub fn resolve(&self, relative: &str) -> FsResult<ResolvedPath> {
        self.walk(relative, true)
    }

    /// Resolve `relative` without following a symlink in the final
    /// component, so the link itself can be inspected, moved or deleted.
    ///
    /// # Errors
    ///
    /// Same as [`PathResolver::resolve`].
    pub fn resolve_entry(&self, relative: &str) -> FsResult<ResolvedPath> {
        self.walk(relative, false)
    }

    fn walk(&self, raw: &str, follow_final: bool) -> FsResult<ResolvedPath> {
        let components = normalize(raw)?;
        self.check_root(raw)?;

        let mut current = self.root.clone();
        let mut logical: Vec<&str> = Vec::with_capacity(components.len());
        let count = components.len();

        for (idx, name) in components.iter().enumerate() {
            let is_last = idx.saturating_add(1) == count;
            let candidate = current.join(name);
            logical.push(name);

            let meta = match std::fs::symlink_metadata(&candidate) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Nothing below a missing component can be a symlink.
                    current = candidate;
                    for rest in &components[idx.saturating_add(1)..] {
                        current.push(rest);
                        logical.push(rest);
                    }
                    break;
                },
                Err(e) => return Err(FsError::io(logical.join("/"), &e)),
            };

            if !meta.file_type().is_symlink() || (is_last && !follow_final) {
                current = candidate;
                continue;
            }

            current = self.follow_symlink(raw, &candidate)?;
        }

        let relative = match current.strip_prefix(&self.root) {
            Ok(inside) => relative_string(inside),
            // Only reachable with follow_external_symlinks.
            Err(_) => relative_string(Path::new(&logical.join("/"))),
        };

        Ok(ResolvedPath {
            absolute: current,
            relative,
        })
    }

    fn follow_symlink(&self, raw: &str, link: &Path) -> FsResult<PathBuf> {
        let target = match std::fs::canonicalize(link) {
            Ok(target) => target,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FsError::security(
                    raw,
                    "path passes through a dangling symlink",
                ));
            },
            Err(e) => {
                return Err(FsError::security(
                    raw,
                    format!("symlink cannot be resolved: {e}"),
                ));
            },
        };

        if !target.starts_with(&self.root) && !self.follow_external_symlinks {
            tracing::warn!(
                root = %self.root.display(),
                path = raw,
                "symlink resolves outside workspace root"
            );
            return Err(FsError::security(
                raw,
                "symlink resolves outside the workspace root",
            ));
        }
        Ok(target)
    }

    fn check_root(&self, raw: &str) -> FsResult<()> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(FsError::file_op(
                raw,
                FileOpKind::NotADirectory,
                "workspace root is no longer a directory",
            )),
            Err(_) => Err(FsError::file_op(
                raw,
                FileOpKind::NotFound,
                "workspace root no longer exists",
            )),
        }
    }
}

fn relative_string(path: &Path) -> String {
    let joined = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() { ".".to_owned() } else { joined }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_core::ErrorKind;

    fn sandbox() -> (tempfile::TempDir, PathResolver) {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path()).unwrap();
        (dir, resolver)
    }

    #[test]
    fn test_normalize_collapses_segments() {
        assert_eq!(normalize("a/./b//c/").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(normalize("a/b/../c").unwrap(), vec!["a", "c"]);
        assert_eq!(normalize(r"a\b").unwrap(), vec!["a", "b"]);
        assert!(normalize("").unwrap().is_empty());
        assert!(normalize(".").unwrap().is_empty());
        assert!(normalize("a/..").unwrap().is_empty());
    }

    #[test]
    fn test_normalize_rejects_escapes() {
        for p in [
            "..",
            "../etc/passwd",
            "a/../../b",
            "a/b/../../../c",
            "/etc/passwd",
            r"\\server\share",
            r"..\..\windows",
            "C:/Windows",
            "c:secret",
        ] {
            let err = normalize(p).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Security, "{p}");
        }
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert_eq!(
            normalize("bad\0name").unwrap_err().kind(),
            ErrorKind::PathValidation
        );
        assert_eq!(
            normalize(&"a/".repeat(3000)).unwrap_err().kind(),
            ErrorKind::PathValidation
        );
        assert_eq!(
            normalize(&"x".repeat(300)).unwrap_err().kind(),
            ErrorKind::PathValidation
        );
    }

    #[test]
    fn test_resolve_root() {
        let (_dir, resolver) = sandbox();
        for p in ["", ".", "./", "a/.."] {
            let resolved = resolver.resolve(p).unwrap();
            assert!(resolved.is_root(), "{p}");
            assert_eq!(resolved.absolute(), resolver.root());
        }
    }

    #[test]
    fn test_resolve_missing_components() {
        let (_dir, resolver) = sandbox();
        let resolved = resolver.resolve("notes/todo.txt").unwrap();
        assert_eq!(resolved.relative(), "notes/todo.txt");
        assert_eq!(resolved.name(), "todo.txt");
        assert_eq!(resolved.absolute(), resolver.root().join("notes/todo.txt"));
    }

    #[test]
    fn test_resolve_through_file_is_not_a_directory() {
        let (dir, resolver) = sandbox();
        std::fs::write(dir.path().join("file.txt"), "x").unwrap();
        let err = resolver.resolve("file.txt/child").unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::NotADirectory));
    }

    #[test]
    fn test_resolve_fails_after_root_removed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ws");
        std::fs::create_dir(&root).unwrap();
        let resolver = PathResolver::new(&root).unwrap();
        std::fs::remove_dir(&root).unwrap();
        assert!(resolver.resolve("a.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = PathResolver::new(dir.path().join("missing")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    mod symlinks {
        use super::*;
        use std::os::unix::fs::symlink;

        #[test]
        fn test_internal_symlink_followed() {
            let (dir, resolver) = sandbox();
            std::fs::create_dir(dir.path().join("real")).unwrap();
            symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

            let resolved = resolver.resolve("alias/file.txt").unwrap();
            assert_eq!(resolved.relative(), "real/file.txt");
        }

        #[test]
        fn test_escaping_symlink_rejected() {
            let (dir, resolver) = sandbox();
            let outside = tempfile::tempdir().unwrap();
            std::fs::write(outside.path().join("secret.txt"), "s").unwrap();
            symlink(outside.path(), dir.path().join("escape")).unwrap();

            for p in ["escape", "escape/secret.txt", "escape/new.txt"] {
                let err = resolver.resolve(p).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Security, "{p}");
            }
        }

        #[test]
        fn test_escaping_symlink_allowed_with_opt_in() {
            let (dir, resolver) = sandbox();
            let outside = tempfile::tempdir().unwrap();
            symlink(outside.path(), dir.path().join("shared")).unwrap();

            let resolver = resolver.with_external_symlinks(true);
            let resolved = resolver.resolve("shared/data.txt").unwrap();
            assert_eq!(resolved.relative(), "shared/data.txt");
            assert!(resolved.absolute().starts_with(outside.path().canonicalize().unwrap()));
        }

        #[test]
        fn test_resolve_entry_does_not_follow_final_link() {
            let (dir, resolver) = sandbox();
            let outside = tempfile::tempdir().unwrap();
            symlink(outside.path(), dir.path().join("escape")).unwrap();

            let entry = resolver.resolve_entry("escape").unwrap();
            assert_eq!(entry.absolute(), resolver.root().join("escape"));
            // Passing through it is still an escape.
            assert_eq!(
                resolver.resolve_entry("escape/x").unwrap_err().kind(),
                ErrorKind::Security
            );
        }

        #[test]
        fn test_dangling_symlink_rejected() {
            let (dir, resolver) = sandbox();
            symlink(dir.path().join("nowhere"), dir.path().join("dangling")).unwrap();
            assert_eq!(
                resolver.resolve("dangling").unwrap_err().kind(),
                ErrorKind::Security
            );
        }

        #[test]
        fn test_symlinked_root_is_canonicalized() {
            let dir = tempfile::tempdir().unwrap();
            let real = dir.path().join("real-root");
            std::fs::create_dir(&real).unwrap();
            let link = dir.path().join("link-root");
            symlink(&real, &link).unwrap();

            let resolver = PathResolver::new(&link).unwrap();
            assert_eq!(resolver.root(), real.canonicalize().unwrap());
            assert!(resolver.resolve("inside.txt").is_ok());
        }
    }
}
