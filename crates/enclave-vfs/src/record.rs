//! File and directory metadata records.

use std::fs::Metadata;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (not followed).
    Symlink,
    /// Socket, FIFO, device or anything else.
    Other,
}

impl EntryType {
    /// Classify a metadata value obtained without following symlinks.
    #[must_use]
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Directory
        } else if ft.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata snapshot for one workspace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Final path component.
    pub name: String,
    /// Path relative to the workspace root, `/`-separated.
    pub relative_path: String,
    /// Entry kind.
    pub entry_type: EntryType,
    /// Size in bytes; 0 for directories.
    pub size_bytes: u64,
    /// Last modification time, if the platform reports one.
    pub modified_at: Option<DateTime<Utc>>,
    /// Whether the name starts with `.`.
    pub is_hidden: bool,
    /// Unix permission bits as an octal string (e.g. `"644"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    /// Lowercase extension with leading dot; files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl FileRecord {
    /// Build a record from metadata obtained without following symlinks.
    #[must_use]
    pub fn from_metadata(
        name: impl Into<String>,
        relative_path: impl Into<String>,
        meta: &Metadata,
    ) -> Self {
        let name = name.into();
        let entry_type = EntryType::from_metadata(meta);
        let size_bytes = match entry_type {
            EntryType::Directory => 0,
            _ => meta.len(),
        };
        let extension = match entry_type {
            EntryType::File => extension_of(&name),
            _ => None,
        };

        Self {
            is_hidden: name.starts_with('.'),
            name,
            relative_path: relative_path.into(),
            entry_type,
            size_bytes,
            modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            permissions: permissions_of(meta),
            extension,
        }
    }

    /// Whether this is a regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    /// Whether this is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Lowercase extension of `name` with a leading dot.
///
/// Dotfiles without a further dot (`.bashrc`) and trailing dots have none.
#[must_use]
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

#[cfg(unix)]
fn permissions_of(meta: &Metadata) -> Option<String> {
    use std::os::unix::fs::PermissionsExt;
    Some(format!("{:o}", meta.permissions().mode() & 0o777))
}

#[cfg(not(unix))]
fn permissions_of(_meta: &Metadata) -> Option<String> {
    None
}
