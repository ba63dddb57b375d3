//! Operation log storage backends.
//!
//! Both backends keep the retained window in memory so queries never touch
//! disk. [`JsonlLogStorage`] additionally appends every entry to a file, one
//! JSON object per line, and reloads it on open.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{debug, warn};

use crate::entry::OperationLogEntry;
use crate::error::{AuditError, AuditResult};

/// Storage backend for the operation log.
///
/// Implementations must be thread-safe. Callers serialize `store` calls;
/// `entries` must return a consistent snapshot even while a store runs.
pub trait LogStorage: Send + Sync {
    /// Store an entry, evicting the oldest entries beyond retention.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    fn store(&self, entry: &OperationLogEntry) -> AuditResult<()>;

    /// Snapshot of retained entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn entries(&self) -> AuditResult<Vec<OperationLogEntry>>;

    /// The most recently stored entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn last(&self) -> AuditResult<Option<OperationLogEntry>>;

    /// Number of retained entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn count(&self) -> AuditResult<usize>;

    /// Flush pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to flush.
    fn flush(&self) -> AuditResult<()>;
}

fn lock_err<E: std::fmt::Display>(e: E) -> AuditError {
    AuditError::StorageError(e.to_string())
}

/// In-memory ring buffer with FIFO eviction.
pub struct MemoryLogStorage {
    entries: RwLock<VecDeque<OperationLogEntry>>,
    max_entries: usize,
}

impl MemoryLogStorage {
    /// Create a buffer retaining at most `max_entries` entries (minimum 1).
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries.min(1024))),
            max_entries,
        }
    }

    /// Configured retention.
    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl LogStorage for MemoryLogStorage {
    fn store(&self, entry: &OperationLogEntry) -> AuditResult<()> {
        let mut entries = self.entries.write().map_err(lock_err)?;
        entries.push_back(entry.clone());
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
        Ok(())
    }

    fn entries(&self) -> AuditResult<Vec<OperationLogEntry>> {
        let entries = self.entries.read().map_err(lock_err)?;
        Ok(entries.iter().cloned().collect())
    }

    fn last(&self) -> AuditResult<Option<OperationLogEntry>> {
        let entries = self.entries.read().map_err(lock_err)?;
        Ok(entries.back().cloned())
    }

    fn count(&self) -> AuditResult<usize> {
        Ok(self.entries.read().map_err(lock_err)?.len())
    }

    fn flush(&self) -> AuditResult<()> {
        Ok(())
    }
}

struct JsonlWriter {
    file: File,
    /// Lines currently in the file, including evicted ones.
    lines: usize,
}

/// JSON-lines file backend.
///
/// The file is compacted to the retained window once it holds twice the
/// retention, by rewriting it to a temporary sibling and renaming over it.
pub struct JsonlLogStorage {
    path: PathBuf,
    window: MemoryLogStorage,
    writer: Mutex<JsonlWriter>,
}

impl JsonlLogStorage {
    /// Open (or create) the log file at `path`, loading its newest entries.
    ///
    /// Lines that fail to parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be
    /// created or read.
    pub fn open(path: impl AsRef<Path>, max_entries: usize) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let window = MemoryLogStorage::new(max_entries);
        let mut lines: usize = 0;
        match File::open(&path) {
            Ok(file) => {
                for (idx, line) in BufReader::new(file).lines().enumerate() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    lines = lines.saturating_add(1);
                    match serde_json::from_str::<OperationLogEntry>(&line) {
                        Ok(entry) => window.store(&entry)?,
                        Err(e) => {
                            warn!(
                                path = %path.display(),
                                line = idx.saturating_add(1),
                                error = %e,
                                "skipping corrupt operation log line"
                            );
                        },
                    }
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => return Err(e.into()),
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), lines, "opened operation log");

        Ok(Self {
            path,
            window,
            writer: Mutex::new(JsonlWriter { file, lines }),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn compact(&self, writer: &mut JsonlWriter) -> AuditResult<()> {
        let entries = self.window.entries()?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for entry in &entries {
            serde_json::to_writer(&mut tmp, entry)?;
            tmp.write_all(b"\n")?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AuditError::IoError(e.error))?;

        writer.file = OpenOptions::new().append(true).open(&self.path)?;
        writer.lines = entries.len();
        debug!(path = %self.path.display(), kept = entries.len(), "compacted operation log");
        Ok(())
    }
}

impl LogStorage for JsonlLogStorage {
    fn store(&self, entry: &OperationLogEntry) -> AuditResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().map_err(lock_err)?;
        writer.file.write_all(&line)?;
        writer.lines = writer.lines.saturating_add(1);
        self.window.store(entry)?;

        if writer.lines > self.window.max_entries().saturating_mul(2) {
            self.compact(&mut writer)?;
        }
        Ok(())
    }

    fn entries(&self) -> AuditResult<Vec<OperationLogEntry>> {
        self.window.entries()
    }

    fn last(&self) -> AuditResult<Option<OperationLogEntry>> {
        self.window.last()
    }

    fn count(&self) -> AuditResult<usize> {
        self.window.count()
    }

    fn flush(&self) -> AuditResult<()> {
        let mut writer = self.writer.lock().map_err(lock_err)?;
        writer.file.flush()?;
        writer.file.sync_data()?;
        Ok(())
    }
}
