//! Blocking filesystem work off the async runtime.

use enclave_core::{FileOpKind, FsError, FsResult};

/// Run `f` on the blocking pool.
///
/// A panicked or cancelled task surfaces as `FileOperation(Other)` against
/// `path` rather than propagating the panic.
///
/// # Errors
///
/// Returns whatever `f` returns, or a `FileOperation` error if the task
/// did not complete.
pub async fn run_blocking<T, F>(path: &str, f: F) -> FsResult<T>
where
    F: FnOnce() -> FsResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(FsError::file_op(
            path,
            FileOpKind::Other,
            format!("filesystem task failed: {e}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_result_passes_through() {
        assert_eq!(run_blocking("x", || Ok(3)).await.unwrap(), 3);
        let err = run_blocking::<(), _>("x", || Err(FsError::not_found("x")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let err = run_blocking::<(), _>("boom.txt", || panic!("boom"))
            .await
            .unwrap_err();
        assert_eq!(err.file_op_kind(), Some(FileOpKind::Other));
    }
}
