//! Result types for bulk and aggregate operations.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use enclave_core::{ErrorKind, FsError};
use serde::{Deserialize, Serialize};

/// One failed item inside a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    /// Workspace-relative path of the item.
    pub path: String,
    /// Classified error kind.
    pub error_type: ErrorKind,
    /// Error message.
    pub message: String,
}

impl ItemError {
    /// Capture `error` for the item at `path`.
    pub fn new(path: impl Into<String>, error: &FsError) -> Self {
        Self {
            path: path.into(),
            error_type: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of [`WorkspaceManager::copy_item`](crate::WorkspaceManager::copy_item).
///
/// Directory copies are best-effort: items that fail are listed in
/// `errors` and the rest are still copied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    /// Files and directories written below the destination.
    pub items_copied: usize,
    /// Total file bytes written.
    pub bytes_copied: u64,
    /// Items that could not be copied.
    pub errors: Vec<ItemError>,
}

impl CopyReport {
    /// Whether every item was copied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Aggregate statistics for one workspace, computed by a full traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    /// Workspace name.
    pub name: String,
    /// Canonical root directory.
    pub root_path: PathBuf,
    /// When the root directory was created, if the platform reports it.
    pub created_at: Option<DateTime<Utc>>,
    /// Regular files.
    pub total_files: u64,
    /// Directories below the root.
    pub total_directories: u64,
    /// Symbolic links (not followed).
    pub total_symlinks: u64,
    /// Sum of regular file sizes.
    pub total_size_bytes: u64,
    /// `total_size_bytes` for humans, e.g. `"1.5 MB"`.
    pub total_size_human: String,
    /// Deepest entry below the root; 0 for an empty workspace.
    pub max_depth: usize,
}

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary units and one decimal place.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    let mut whole = bytes;
    let mut remainder: u64 = 0;
    let mut unit: usize = 0;
    while whole >= 1024 && unit.saturating_add(1) < UNITS.len() {
        remainder = whole.checked_rem(1024).unwrap_or(0);
        whole = whole.checked_div(1024).unwrap_or(0);
        unit = unit.saturating_add(1);
    }
    if unit == 0 {
        return format!("{bytes} B");
    }
    let tenths = remainder.saturating_mul(10).checked_div(1024).unwrap_or(0);
    format!("{whole}.{tenths} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(10_485_760), "10.0 MB");
        assert_eq!(format_size(u64::MAX), "16777215.9 TB");
    }

    #[test]
    fn test_item_error_captures_kind() {
        let err = FsError::not_found("a/b.txt");
        let item = ItemError::new("a/b.txt", &err);
        assert_eq!(item.error_type, ErrorKind::FileOperation);
        assert!(item.message.contains("a/b.txt"));
    }

    #[test]
    fn test_copy_report_complete() {
        let mut report = CopyReport::default();
        assert!(report.is_complete());
        report
            .errors
            .push(ItemError::new("x", &FsError::not_found("x")));
        assert!(!report.is_complete());
    }
}
