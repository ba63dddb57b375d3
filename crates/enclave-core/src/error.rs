//! Error taxonomy for workspace file operations.
//!
//! Every failure is classified into exactly one [`ErrorKind`] before it
//! leaves an operation boundary. Callers branch on the kind; the message is
//! for humans.

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error classification recorded in the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed path or request.
    PathValidation,
    /// Attempted escape from the workspace root.
    Security,
    /// Underlying filesystem failure.
    FileOperation,
    /// Content exceeds the configured maximum.
    FileSize,
    /// Content could not be decoded or encoded as requested.
    Encoding,
    /// Extension not permitted by policy.
    InvalidFileType,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 6] = [
        Self::PathValidation,
        Self::Security,
        Self::FileOperation,
        Self::FileSize,
        Self::Encoding,
        Self::InvalidFileType,
    ];

    /// Stable snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PathValidation => "path_validation",
            Self::Security => "security",
            Self::FileOperation => "file_operation",
            Self::FileSize => "file_size",
            Self::Encoding => "encoding",
            Self::InvalidFileType => "invalid_file_type",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refinement of [`ErrorKind::FileOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOpKind {
    /// Target (or move/copy source) does not exist.
    NotFound,
    /// Destination already exists and overwrite was not requested.
    AlreadyExists,
    /// Directory is not empty.
    NotEmpty,
    /// Expected a directory, found something else.
    NotADirectory,
    /// Expected a file, found a directory.
    IsADirectory,
    /// Operating system denied access.
    PermissionDenied,
    /// Any other filesystem failure.
    Other,
}

impl FileOpKind {
    /// Classify an I/O error.
    #[must_use]
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            io::ErrorKind::DirectoryNotEmpty => Self::NotEmpty,
            io::ErrorKind::NotADirectory => Self::NotADirectory,
            io::ErrorKind::IsADirectory => Self::IsADirectory,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FileOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::NotEmpty => "directory not empty",
            Self::NotADirectory => "not a directory",
            Self::IsADirectory => "is a directory",
            Self::PermissionDenied => "permission denied",
            Self::Other => "filesystem error",
        };
        f.write_str(s)
    }
}

/// Errors returned by workspace file operations.
///
/// Paths carried in errors are always workspace-relative; absolute host
/// paths never leave the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// Malformed path syntax or invalid request field.
    #[error("invalid path '{path}': {reason}")]
    PathValidation {
        /// Offending path or field value.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Resolved path escapes the workspace root.
    #[error("security violation for '{path}': {reason}")]
    Security {
        /// Offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Filesystem failure.
    #[error("{kind} '{path}': {message}")]
    FileOperation {
        /// Path the operation failed on.
        path: String,
        /// Refined failure kind.
        kind: FileOpKind,
        /// Detail message.
        message: String,
    },

    /// Content exceeds the configured limit.
    #[error("'{path}' would be {size} bytes, exceeding the {limit} byte limit")]
    FileSize {
        /// Target path.
        path: String,
        /// Size the content would have.
        size: u64,
        /// Configured maximum.
        limit: u64,
    },

    /// Content cannot be decoded or encoded in the requested encoding.
    #[error("'{path}' cannot be converted as {encoding}: {message}")]
    Encoding {
        /// Target path.
        path: String,
        /// Encoding name, e.g. `UTF-8`.
        encoding: String,
        /// Decoder or encoder detail.
        message: String,
    },

    /// Extension not allowed by the workspace policy.
    #[error("extension '{extension}' of '{path}' is not allowed (allowed: {})", .allowed.join(", "))]
    InvalidFileType {
        /// Target path.
        path: String,
        /// Rejected extension (lowercase, with leading dot, or empty).
        extension: String,
        /// Extensions that would have been accepted.
        allowed: Vec<String>,
    },
}

impl FsError {
    /// Construct a [`FsError::PathValidation`].
    pub fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathValidation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Construct a [`FsError::Security`].
    pub fn security(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Security {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Construct a [`FsError::FileOperation`].
    pub fn file_op(path: impl Into<String>, kind: FileOpKind, message: impl Into<String>) -> Self {
        Self::FileOperation {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `NotFound` file operation error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::file_op(path, FileOpKind::NotFound, "no such file or directory")
    }

    /// Shorthand for an `AlreadyExists` file operation error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::file_op(path, FileOpKind::AlreadyExists, "destination already exists")
    }

    /// Classify an I/O error raised while operating on `path`.
    ///
    /// `path` should be the workspace-relative form; the I/O message is kept
    /// but host paths are not added.
    pub fn io(path: impl AsRef<Path>, err: &io::Error) -> Self {
        let kind = FileOpKind::from_io(err);
        let message = match err.kind() {
            io::ErrorKind::InvalidData => format!("invalid data: {err}"),
            _ => err.to_string(),
        };
        Self::FileOperation {
            path: path.as_ref().display().to_string(),
            kind,
            message,
        }
    }

    /// The coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathValidation { .. } => ErrorKind::PathValidation,
            Self::Security { .. } => ErrorKind::Security,
            Self::FileOperation { .. } => ErrorKind::FileOperation,
            Self::FileSize { .. } => ErrorKind::FileSize,
            Self::Encoding { .. } => ErrorKind::Encoding,
            Self::InvalidFileType { .. } => ErrorKind::InvalidFileType,
        }
    }

    /// The refined file operation kind, if this is a file operation error.
    #[must_use]
    pub fn file_op_kind(&self) -> Option<FileOpKind> {
        match self {
            Self::FileOperation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether this is a `FileOperation(NotFound)` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.file_op_kind() == Some(FileOpKind::NotFound)
    }
}

/// Result type for workspace file operations.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        let fs_err = FsError::io("notes/todo.txt", &err);
        assert!(fs_err.is_not_found());
        assert_eq!(fs_err.kind(), ErrorKind::FileOperation);

        let err = io::Error::from(io::ErrorKind::DirectoryNotEmpty);
        assert_eq!(
            FsError::io("notes", &err).file_op_kind(),
            Some(FileOpKind::NotEmpty)
        );

        let err = io::Error::other("disk on fire");
        assert_eq!(
            FsError::io("x", &err).file_op_kind(),
            Some(FileOpKind::Other)
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            FsError::security("../x", "escapes root").kind(),
            ErrorKind::Security
        );
        assert_eq!(
            FsError::validation("a\0b", "contains NUL").kind(),
            ErrorKind::PathValidation
        );
        let err = FsError::FileSize {
            path: "big.bin".into(),
            size: 11,
            limit: 10,
        };
        assert_eq!(err.kind(), ErrorKind::FileSize);
        assert!(err.to_string().contains("11 bytes"));
    }

    #[test]
    fn test_invalid_file_type_message_lists_allowed() {
        let err = FsError::InvalidFileType {
            path: "run.sh".into(),
            extension: ".sh".into(),
            allowed: vec![".txt".into(), ".md".into()],
        };
        assert_eq!(
            err.to_string(),
            "extension '.sh' of 'run.sh' is not allowed (allowed: .txt, .md)"
        );
    }

    #[test]
    fn test_error_kind_serde_names() {
        let json = serde_json::to_string(&ErrorKind::InvalidFileType).unwrap();
        assert_eq!(json, "\"invalid_file_type\"");
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.as_str());
        }
    }
}
