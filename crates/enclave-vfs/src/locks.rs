//! Per-path write serialization.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Above this many entries, idle locks are pruned on acquisition.
const PRUNE_THRESHOLD: usize = 1024;

/// Async mutexes keyed by resolved absolute path.
///
/// Writers and appenders of the same file hold the path's lock for the
/// duration of the filesystem call; different paths never contend.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PathLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `path`, waiting for any current holder.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune();
        }
        // Clone the Arc and drop the shard guard before awaiting.
        let mutex = Arc::clone(
            self.locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        mutex.lock_owned().await
    }

    /// Number of tracked paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no paths are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drop entries no task holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_path_serializes() {
        let locks = Arc::new(PathLocks::new());
        let guard = locks.lock(Path::new("/ws/a.txt")).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(Path::new("/ws/a.txt")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_paths_do_not_contend() {
        let locks = PathLocks::new();
        let _a = locks.lock(Path::new("/ws/a.txt")).await;
        let _b = locks.lock(Path::new("/ws/b.txt")).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let locks = PathLocks::new();
        let held = locks.lock(Path::new("/ws/held")).await;
        drop(locks.lock(Path::new("/ws/idle")).await);

        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
