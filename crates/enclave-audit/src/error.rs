//! Operation log error types.

use thiserror::Error;

/// Errors that can occur while recording or querying the operation log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Storage error (poisoned lock, backend failure).
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// IO error from a persistent backend.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for operation log operations.
pub type AuditResult<T> = Result<T, AuditError>;
