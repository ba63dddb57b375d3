//! Lazy glob search over a workspace subtree.

use std::path::{Path, PathBuf};

use enclave_audit::{OperationEvent, OperationOutcome};
use enclave_core::{ErrorKind, FileOpKind, FsError, FsResult};
use enclave_vfs::{EntryType, FileRecord, OperationRecorder};
use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;
use walkdir::WalkDir;

/// Compiled glob and how to apply it.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    matcher: GlobMatcher,
    match_path: bool,
}

impl Pattern {
    /// Compile `pattern`. Patterns containing `/` match relative paths
    /// with `*` confined to one component; others match entry names.
    pub(crate) fn compile(pattern: &str, case_insensitive: bool) -> FsResult<Self> {
        let match_path = pattern.contains('/');
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .literal_separator(match_path)
            .backslash_escape(true)
            .build()
            .map_err(|e| FsError::validation(pattern, format!("invalid glob pattern: {e}")))?;
        Ok(Self {
            matcher: glob.compile_matcher(),
            match_path,
        })
    }

    fn is_match(&self, name: &str, relative_to_start: &str) -> bool {
        if self.match_path {
            self.matcher.is_match(relative_to_start)
        } else {
            self.matcher.is_match(name)
        }
    }
}

/// Iterator over entries matching a [`FindRequest`](crate::FindRequest).
///
/// Entries are produced on demand in file-name order per directory.
/// Symlinks are reported but never descended; a symlink whose target lies
/// outside the workspace root (or dangles) is skipped. Traversal errors
/// are yielded as `Err` items and the walk continues.
///
/// The search is logged once, when the walk is exhausted or the iterator
/// is dropped. The entry fails with the first item error's kind if any
/// item failed.
pub struct FindFiles {
    walker: walkdir::IntoIter,
    pattern: Pattern,
    root: PathBuf,
    start: PathBuf,
    entry_types: Option<Vec<EntryType>>,
    include_hidden: bool,
    follow_external_symlinks: bool,
    audit: Option<FindAudit>,
}

/// Pending log entry and the item outcomes seen so far.
struct FindAudit {
    recorder: OperationRecorder,
    event: Option<OperationEvent>,
    matched: usize,
    failed: usize,
    first_error: Option<(ErrorKind, String)>,
}

impl FindAudit {
    fn observe(&mut self, item: &FsResult<FileRecord>) {
        match item {
            Ok(_) => self.matched = self.matched.saturating_add(1),
            Err(err) => {
                self.failed = self.failed.saturating_add(1);
                if self.first_error.is_none() {
                    self.first_error = Some((err.kind(), err.to_string()));
                }
            },
        }
    }

    fn finish(&mut self) {
        let Some(event) = self.event.take() else {
            return;
        };
        let outcome = match &self.first_error {
            None => OperationOutcome::success(),
            Some((kind, message)) => OperationOutcome::failure(
                *kind,
                format!(
                    "{} items failed during search ({} matched); first: {message}",
                    self.failed, self.matched
                ),
            ),
        };
        self.recorder.record(event.with_outcome(outcome));
    }
}

impl std::fmt::Debug for FindFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindFiles")
            .field("start", &self.start)
            .field("entry_types", &self.entry_types)
            .field("include_hidden", &self.include_hidden)
            .finish_non_exhaustive()
    }
}

/// Options resolved by the manager before the walk starts.
pub(crate) struct FindScope {
    pub(crate) root: PathBuf,
    pub(crate) start: PathBuf,
    pub(crate) max_depth: usize,
    pub(crate) entry_types: Option<Vec<EntryType>>,
    pub(crate) include_hidden: bool,
    pub(crate) follow_external_symlinks: bool,
}

impl FindFiles {
    pub(crate) fn new(pattern: Pattern, scope: FindScope) -> Self {
        let walker = WalkDir::new(&scope.start)
            .follow_links(false)
            .min_depth(1)
            .max_depth(scope.max_depth)
            .sort_by_file_name()
            .into_iter();
        Self {
            walker,
            pattern,
            root: scope.root,
            start: scope.start,
            entry_types: scope.entry_types,
            include_hidden: scope.include_hidden,
            follow_external_symlinks: scope.follow_external_symlinks,
            audit: None,
        }
    }

    /// Record `event` through `recorder` once the walk ends.
    pub(crate) fn logged(mut self, recorder: OperationRecorder, event: OperationEvent) -> Self {
        self.audit = Some(FindAudit {
            recorder,
            event: Some(event),
            matched: 0,
            failed: 0,
            first_error: None,
        });
        self
    }

    fn relative_to(base: &Path, path: &Path) -> String {
        path.strip_prefix(base)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn symlink_escapes(&self, path: &Path) -> bool {
        match std::fs::canonicalize(path) {
            Ok(target) => !self.follow_external_symlinks && !target.starts_with(&self.root),
            Err(_) => true,
        }
    }

    fn type_allowed(&self, entry_type: EntryType) -> bool {
        self.entry_types
            .as_ref()
            .is_none_or(|types| types.contains(&entry_type))
    }
}

impl Iterator for FindFiles {
    type Item = FsResult<FileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.next_match();
        if let Some(audit) = self.audit.as_mut() {
            match &item {
                Some(item) => audit.observe(item),
                None => audit.finish(),
            }
        }
        item
    }
}

impl Drop for FindFiles {
    fn drop(&mut self) {
        if let Some(audit) = self.audit.as_mut() {
            audit.finish();
        }
    }
}

impl FindFiles {
    fn next_match(&mut self) -> Option<FsResult<FileRecord>> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(String::new, |p| Self::relative_to(&self.root, p));
                    let err = match e.io_error() {
                        Some(io) => FsError::io(&path, io),
                        None => FsError::file_op(&path, FileOpKind::Other, e.to_string()),
                    };
                    return Some(Err(err));
                },
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.include_hidden && name.starts_with('.') {
                if entry.file_type().is_dir() {
                    self.walker.skip_current_dir();
                }
                continue;
            }

            // Containment is re-checked for every visited entry.
            if entry.path_is_symlink() && self.symlink_escapes(entry.path()) {
                debug!(
                    path = %Self::relative_to(&self.root, entry.path()),
                    "skipping symlink that leaves the workspace"
                );
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    let path = Self::relative_to(&self.root, entry.path());
                    let err = match e.io_error() {
                        Some(io) => FsError::io(&path, io),
                        None => FsError::file_op(&path, FileOpKind::Other, e.to_string()),
                    };
                    return Some(Err(err));
                },
            };

            let entry_type = EntryType::from_metadata(&metadata);
            if !self.type_allowed(entry_type) {
                continue;
            }

            let from_start = Self::relative_to(&self.start, entry.path());
            if !self.pattern.is_match(&name, &from_start) {
                continue;
            }

            let relative = Self::relative_to(&self.root, entry.path());
            return Some(Ok(FileRecord::from_metadata(name, relative, &metadata)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(root: &Path, pattern: &str, hidden: bool) -> Vec<String> {
        let root = root.canonicalize().unwrap();
        let scope = FindScope {
            root: root.clone(),
            start: root,
            max_depth: 10,
            entry_types: None,
            include_hidden: hidden,
            follow_external_symlinks: false,
        };
        FindFiles::new(Pattern::compile(pattern, false).unwrap(), scope)
            .map(|r| r.unwrap().relative_path)
            .collect()
    }

    #[test]
    fn test_name_and_path_patterns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/nested/mod.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        assert_eq!(find(dir.path(), "*.rs", false), vec!["src/lib.rs", "src/nested/mod.rs"]);
        assert_eq!(find(dir.path(), "src/*.rs", false), vec!["src/lib.rs"]);
        assert_eq!(find(dir.path(), "src/**/*.rs", false), vec![
            "src/lib.rs",
            "src/nested/mod.rs"
        ]);
    }

    #[test]
    fn test_hidden_entries_skipped_by_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config"), "").unwrap();
        std::fs::write(dir.path().join("config"), "").unwrap();

        assert_eq!(find(dir.path(), "config", false), vec!["config"]);
        assert_eq!(find(dir.path(), "config", true), vec![".git/config", "config"]);
    }

    #[test]
    fn test_case_insensitive() {
        let pattern = Pattern::compile("*.TXT", true).unwrap();
        assert!(pattern.is_match("notes.txt", "notes.txt"));
        let pattern = Pattern::compile("*.TXT", false).unwrap();
        assert!(!pattern.is_match("notes.txt", "notes.txt"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Pattern::compile("a[", false).unwrap_err();
        assert_eq!(err.kind(), enclave_core::ErrorKind::PathValidation);
    }

    #[cfg(unix)]
    #[test]
    fn test_escaping_symlink_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("leak.txt"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("outside")).unwrap();
        std::fs::write(dir.path().join("inside.txt"), "").unwrap();
        std::os::unix::fs::symlink(dir.path().join("inside.txt"), dir.path().join("alias.txt"))
            .unwrap();

        assert_eq!(find(dir.path(), "*.txt", false), vec!["alias.txt", "inside.txt"]);
    }
}
