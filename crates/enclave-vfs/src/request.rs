//! Request structs for single-file operations.
//!
//! Each request is validated eagerly with `validate()` before any path is
//! resolved. Validation here is structural only; containment is enforced by
//! [`PathResolver`](crate::PathResolver).

use enclave_core::{CallerId, FsError, FsResult};

use crate::path::normalize;
use crate::text::TextEncoding;

/// A request that targets one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRequest {
    /// Workspace-relative path.
    pub path: String,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

/// Request for [`FileHandler::exists`](crate::FileHandler::exists).
pub type ExistsRequest = PathRequest;
/// Request for [`FileHandler::info`](crate::FileHandler::info).
pub type StatRequest = PathRequest;

impl PathRequest {
    /// Create a request for `path`.
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

    /// Check the path is syntactically valid.
    ///
    /// # Errors
    ///
    /// Returns the lexical error from [`normalize`].
    pub fn validate(&self) -> FsResult<()> {
        normalize(&self.path).map(|_| ())
    }
}

/// Request for [`FileHandler::read`](crate::FileHandler::read) and
/// [`FileHandler::read_bytes`](crate::FileHandler::read_bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    /// Workspace-relative file path.
    pub path: String,
    /// Encoding to decode with; UTF-8 when unset. Ignored by `read_bytes`.
    pub encoding: Option<TextEncoding>,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl ReadRequest {
    /// Create a UTF-8 read of `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            encoding: None,
            caller: None,
        }
    }

    /// Decode with `encoding` instead of UTF-8.
    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Check the path is syntactically valid.
    ///
    /// # Errors
    ///
    /// Returns the lexical error from [`normalize`].
    pub fn validate(&self) -> FsResult<()> {
        normalize(&self.path).map(|_| ())
    }
}

/// Request for [`FileHandler::write`](crate::FileHandler::write).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Workspace-relative file path.
    pub path: String,
    /// Complete new content.
    pub content: Vec<u8>,
    /// Replace an existing file. When `false` an existing file is an error.
    pub overwrite: bool,
    /// Store `content` (UTF-8 text) in this encoding. Unset writes the
    /// bytes as given.
    pub encoding: Option<TextEncoding>,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl WriteRequest {
    /// Create an overwriting write of `content` to `path`.
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            overwrite: true,
            encoding: None,
            caller: None,
        }
    }

    /// Transcode the text content to `encoding` before writing.
    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Set whether an existing file may be replaced.
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

    /// Check the path names a file below the root.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::PathValidation`] for the root or malformed paths.
    pub fn validate(&self) -> FsResult<()> {
        require_file_path(&self.path)
    }

    /// Content length in bytes, before any transcoding.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    /// Whether the content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Request for [`FileHandler::append`](crate::FileHandler::append).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRequest {
    /// Workspace-relative path of an existing file.
    pub path: String,
    /// Bytes to append.
    pub content: Vec<u8>,
    /// Store `content` (UTF-8 text) in this encoding. Unset appends the
    /// bytes as given.
    pub encoding: Option<TextEncoding>,
    /// Caller the operation is attributed to.
    pub caller: Option<CallerId>,
}

impl AppendRequest {
    /// Create an append of `content` to `path`.
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            encoding: None,
            caller: None,
        }
    }

    /// Transcode the text content to `encoding` before appending.
    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Attribute the request to `caller`.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<CallerId>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Check the path names a file below the root.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::PathValidation`] for the root or malformed paths.
    pub fn validate(&self) -> FsResult<()> {
        require_file_path(&self.path)
    }
}

/// Shared check for operations that need a non-root target.
///
/// # Errors
///
/// Returns the lexical error from [`normalize`], or
/// [`FsError::PathValidation`] if the path is the root.
pub fn require_file_path(path: &str) -> FsResult<()> {
    if normalize(path)?.is_empty() {
        return Err(FsError::validation(path, "a file path below the workspace root is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_core::ErrorKind;

    #[test]
    fn test_write_request_defaults() {
        let req = WriteRequest::new("notes/todo.txt", "buy milk");
        assert!(req.overwrite);
        assert_eq!(req.len(), 8);
        assert!(req.caller.is_none());
        req.validate().unwrap();
    }

    #[test]
    fn test_root_is_not_a_file_path() {
        for p in ["", ".", "a/.."] {
            let err = WriteRequest::new(p, "x").validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PathValidation, "{p}");
            assert!(AppendRequest::new(p, "x").validate().is_err());
        }
        PathRequest::new(".").validate().unwrap();
    }

    #[test]
    fn test_escape_reported_before_dispatch() {
        let err = ReadRequest::new("../secret").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Security);
    }

    #[test]
    fn test_with_caller() {
        let req = AppendRequest::new("log.txt", "x").with_caller("agent-7");
        assert_eq!(req.caller, Some(CallerId::new("agent-7")));
    }
}
