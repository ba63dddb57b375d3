//! Request structs for directory-level operations.

use enclave_core::{CallerId, FsError, FsResult};
use enclave_vfs::{EntryType, normalize, require_file_path};

/// Longest accepted glob pattern, in bytes.
const MAX_PATTERN_BYTES: usize = 1024;

/// Request for [`WorkspaceManager::list_directory`](crate::WorkspaceManager::list_directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Directory to list; `.` for the root.
    pub path: String,
    /// Descend into subdirectories (pre-order, bounded by the max depth).
    pub recursive: bool,
    /// Include names starting with `.`; hidden directories are not
    /// descended otherwise.
    pub include_hidden: bool,
    /// Only return these entry types. Directories are still descended.
    pub entry_types: Option<Vec<EntryType>>,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl ListRequest {
    /// List `path`, non-recursively, without hidden entries.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
            include_hidden: false,
            entry_types: None,
            caller: None,
        }
    }

    /// Set recursion.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Include hidden entries.
    #[must_use]
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Restrict returned entry types.
    #[must_use]
    pub fn with_entry_types(mut self, types: Vec<EntryType>) -> Self {
        self.entry_types = Some(types);
        self
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// # Errors
    ///
    /// Returns the lexical path error, if any.
    pub fn validate(&self) -> FsResult<()> {
        validate_entry_types(self.entry_types.as_deref())?;
        normalize(&self.path).map(|_| ())
    }
}

/// Request for [`WorkspaceManager::create_directory`](crate::WorkspaceManager::create_directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkdirRequest {
    /// Directory to create.
    pub path: String,
    /// Create missing ancestors too.
    pub create_parents: bool,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl MkdirRequest {
    /// Create `path` and any missing ancestors.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            create_parents: true,
            caller: None,
        }
    }

    /// Set whether missing ancestors are created.
    #[must_use]
    pub fn with_create_parents(mut self, create: bool) -> Self {
        self.create_parents = create;
        self
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// # Errors
    ///
    /// Returns the lexical path error, if any.
    pub fn validate(&self) -> FsResult<()> {
        normalize(&self.path).map(|_| ())
    }
}

/// Request for [`WorkspaceManager::move_item`](crate::WorkspaceManager::move_item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// Item to move.
    pub source: String,
    /// New location.
    pub destination: String,
    /// Replace an existing destination.
    pub overwrite: bool,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl MoveRequest {
    /// Move `source` to `destination` without overwriting.
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            overwrite: false,
            caller: None,
        }
    }

    /// Allow replacing an existing destination.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`FsError::PathValidation`] if either end is the root, or
    /// the lexical error of either path.
    pub fn validate(&self) -> FsResult<()> {
        require_file_path(&self.source)?;
        require_file_path(&self.destination)
    }
}

/// Request for [`WorkspaceManager::copy_item`](crate::WorkspaceManager::copy_item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    /// File or directory to copy.
    pub source: String,
    /// Copy location.
    pub destination: String,
    /// Replace existing files at the destination.
    pub overwrite: bool,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl CopyRequest {
    /// Copy `source` to `destination` without overwriting.
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            overwrite: false,
            caller: None,
        }
    }

    /// Allow replacing existing files.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`FsError::PathValidation`] if either end is the root, or
    /// the lexical error of either path.
    pub fn validate(&self) -> FsResult<()> {
        require_file_path(&self.source)?;
        require_file_path(&self.destination)
    }
}

/// Request for [`WorkspaceManager::delete_item`](crate::WorkspaceManager::delete_item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Item to delete.
    pub path: String,
    /// Remove non-empty directories with their contents.
    pub recursive: bool,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl DeleteRequest {
    /// Delete `path`; directories must be empty.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
            caller: None,
        }
    }

    /// Set recursion.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`FsError::PathValidation`] for the workspace root.
    pub fn validate(&self) -> FsResult<()> {
        if normalize(&self.path)?.is_empty() {
            return Err(FsError::validation(
                &self.path,
                "the workspace root cannot be deleted",
            ));
        }
        Ok(())
    }
}

/// Request for [`WorkspaceManager::find_files`](crate::WorkspaceManager::find_files).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRequest {
    /// Glob pattern. Matched against the entry name, or against the path
    /// relative to `path` when it contains `/`.
    pub pattern: String,
    /// Directory to search from; `.` for the root.
    pub path: String,
    /// Search below the starting directory's direct children.
    pub recursive: bool,
    /// Only yield these entry types.
    pub entry_types: Option<Vec<EntryType>>,
    /// Include hidden entries and descend hidden directories.
    pub include_hidden: bool,
    /// Match case-insensitively.
    pub case_insensitive: bool,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl FindRequest {
    /// Recursively search the whole workspace for `pattern`.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            path: ".".to_owned(),
            recursive: true,
            entry_types: None,
            include_hidden: false,
            case_insensitive: false,
            caller: None,
        }
    }

    /// Search from `path` instead of the root.
    #[must_use]
    pub fn in_directory(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set recursion.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Restrict yielded entry types.
    #[must_use]
    pub fn with_entry_types(mut self, types: Vec<EntryType>) -> Self {
        self.entry_types = Some(types);
        self
    }

    /// Include hidden entries.
    #[must_use]
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Match case-insensitively.
    #[must_use]
    pub fn with_case_insensitive(mut self, insensitive: bool) -> Self {
        self.case_insensitive = insensitive;
        self
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`FsError::PathValidation`] for an empty or over-long
    /// pattern, or the lexical error of the search path.
    pub fn validate(&self) -> FsResult<()> {
        if self.pattern.trim().is_empty() {
            return Err(FsError::validation(&self.pattern, "pattern must not be empty"));
        }
        if self.pattern.len() > MAX_PATTERN_BYTES {
            return Err(FsError::validation(
                "<pattern>",
                format!("pattern exceeds {MAX_PATTERN_BYTES} bytes"),
            ));
        }
        if self.pattern.contains('\0') {
            return Err(FsError::validation("<pattern>", "pattern contains a NUL byte"));
        }
        validate_entry_types(self.entry_types.as_deref())?;
        normalize(&self.path).map(|_| ())
    }
}

/// Request for [`WorkspaceManager::cleanup_empty_directories`](crate::WorkspaceManager::cleanup_empty_directories).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupRequest {
    /// Directory whose empty descendants are removed; `.` for the root.
    pub path: String,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl Default for CleanupRequest {
    fn default() -> Self {
        Self::new(".")
    }
}

impl CleanupRequest {
    /// Clean up below `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            caller: None,
        }
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// # Errors
    ///
    /// Returns the lexical path error, if any.
    pub fn validate(&self) -> FsResult<()> {
        normalize(&self.path).map(|_| ())
    }
}

fn validate_entry_types(types: Option<&[EntryType]>) -> FsResult<()> {
    if types.is_some_and(<[EntryType]>::is_empty) {
        return Err(FsError::validation(
            "entry_types",
            "entry type filter must name at least one type",
        ));
    }
    Ok(())
}
