//! Per-workspace access policy.

use enclave_core::{FsError, FsResult};

use crate::record::extension_of;

/// Default content size limit (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_485_760;

/// Limits applied to file content operations in one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    max_file_size: u64,
    allowed_extensions: Vec<String>,
    create_parents: bool,
    follow_external_symlinks: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: Vec::new(),
            create_parents: true,
            follow_external_symlinks: false,
        }
    }
}

impl AccessPolicy {
    /// Create the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content size limit in bytes.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Restrict writable extensions. An empty list allows everything.
    ///
    /// Entries are normalized to lowercase with a leading dot.
    #[must_use]
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| e.len() > 1)
            .collect();
        self
    }

    /// Whether writes create missing parent directories.
    #[must_use]
    pub fn with_create_parents(mut self, create: bool) -> Self {
        self.create_parents = create;
        self
    }

    /// Whether symlinks may resolve outside the workspace root.
    #[must_use]
    pub fn with_external_symlinks(mut self, allow: bool) -> Self {
        self.follow_external_symlinks = allow;
        self
    }

    /// Content size limit in bytes.
    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Normalized allow-list; empty means unrestricted.
    #[must_use]
    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Whether writes create missing parent directories.
    #[must_use]
    pub fn create_parents(&self) -> bool {
        self.create_parents
    }

    /// Whether symlinks may resolve outside the workspace root.
    #[must_use]
    pub fn follow_external_symlinks(&self) -> bool {
        self.follow_external_symlinks
    }

    /// Check that the extension of `relative` is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidFileType`] if an allow-list is set and the
    /// extension (or lack of one) is not on it.
    pub fn check_extension(&self, relative: &str) -> FsResult<()> {
        if self.allowed_extensions.is_empty() {
            return Ok(());
        }
        let name = relative.rsplit('/').next().unwrap_or(relative);
        let extension = extension_of(name).unwrap_or_default();
        if self.allowed_extensions.iter().any(|a| *a == extension) {
            return Ok(());
        }
        Err(FsError::InvalidFileType {
            path: relative.to_owned(),
            extension,
            allowed: self.allowed_extensions.clone(),
        })
    }

    /// Check that `size` bytes fit under the limit.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::FileSize`] if `size` exceeds the limit.
    pub fn check_size(&self, relative: &str, size: u64) -> FsResult<()> {
        if size > self.max_file_size {
            return Err(FsError::FileSize {
                path: relative.to_owned(),
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }
}

fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().to_ascii_lowercase();
    if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{trimmed}")
    }
}
