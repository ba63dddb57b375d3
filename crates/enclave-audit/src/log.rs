//! Operation log - main interface for recording and querying entries.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use enclave_core::{EntryId, ErrorKind, Timestamp};
use tracing::debug;

use crate::entry::{OperationEvent, OperationLogEntry};
use crate::error::{AuditError, AuditResult};
use crate::query::LogQuery;
use crate::storage::{JsonlLogStorage, LogStorage, MemoryLogStorage};

/// Default retention when none is configured.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Sequencing state guarded by the single-writer lock.
struct WriterState {
    next_sequence: u64,
    last_timestamp: Option<Timestamp>,
}

/// Append-only ledger of every attempted workspace operation.
///
/// Appends are serialized through one writer lock so sequence numbers and
/// timestamps are strictly ordered; queries read a snapshot from storage
/// and never block on each other.
pub struct OperationLog {
    storage: Box<dyn LogStorage>,
    writer: Mutex<WriterState>,
}

impl OperationLog {
    /// Create a log over a custom storage backend.
    ///
    /// Sequencing resumes after the newest entry already in `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn with_storage(storage: Box<dyn LogStorage>) -> AuditResult<Self> {
        let last = storage.last()?;
        let state = WriterState {
            next_sequence: last.as_ref().map_or(1, |e| e.sequence.saturating_add(1)),
            last_timestamp: last.map(|e| e.timestamp),
        };
        Ok(Self {
            storage,
            writer: Mutex::new(state),
        })
    }

    /// Create an in-memory log retaining at most `max_entries` entries.
    #[must_use]
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            storage: Box::new(MemoryLogStorage::new(max_entries)),
            writer: Mutex::new(WriterState {
                next_sequence: 1,
                last_timestamp: None,
            }),
        }
    }

    /// Open a JSON-lines persisted log at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn open(path: impl AsRef<Path>, max_entries: usize) -> AuditResult<Self> {
        let storage = JsonlLogStorage::open(path, max_entries)?;
        Self::with_storage(Box::new(storage))
    }

    /// Append an entry for `event` and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be stored. The sequence number
    /// is not consumed in that case.
    pub fn record(&self, event: OperationEvent) -> AuditResult<OperationLogEntry> {
        let mut state = self
            .writer
            .lock()
            .map_err(|e| AuditError::StorageError(e.to_string()))?;

        let now = Timestamp::now();
        let timestamp = state.last_timestamp.map_or(now, |last| last.max(now));

        let entry = OperationLogEntry {
            id: EntryId::new(),
            sequence: state.next_sequence,
            timestamp,
            caller_id: event.caller_id,
            operation: event.operation,
            workspace: event.workspace,
            relative_path: event.relative_path,
            destination_path: event.destination_path,
            outcome: event.outcome,
        };

        self.storage.store(&entry)?;

        state.next_sequence = state.next_sequence.saturating_add(1);
        state.last_timestamp = Some(timestamp);

        debug!(
            sequence = entry.sequence,
            operation = %entry.operation,
            workspace = %entry.workspace,
            path = %entry.relative_path,
            success = entry.is_success(),
            "recorded operation"
        );

        Ok(entry)
    }

    /// Entries matching `query`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn query(&self, query: &LogQuery) -> AuditResult<Vec<OperationLogEntry>> {
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(self
            .storage
            .entries()?
            .into_iter()
            .rev()
            .filter(|e| query.matches(e))
            .take(limit)
            .collect())
    }

    /// The `n` most recent entries, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn recent(&self, n: usize) -> AuditResult<Vec<OperationLogEntry>> {
        self.query(&LogQuery::new().with_limit(n))
    }

    /// Count of failures per error kind over the retained entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn error_summary(&self) -> AuditResult<BTreeMap<ErrorKind, usize>> {
        let mut summary = BTreeMap::new();
        for kind in self.storage.entries()?.iter().filter_map(OperationLogEntry::error_type) {
            let count = summary.entry(kind).or_insert(0usize);
            *count = count.saturating_add(1);
        }
        Ok(summary)
    }

    /// Number of retained entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn count(&self) -> AuditResult<usize> {
        self.storage.count()
    }

    /// Flush the storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to flush.
    pub fn flush(&self) -> AuditResult<()> {
        self.storage.flush()
    }
}

impl std::fmt::Debug for OperationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationLog")
            .field("entries", &self.storage.count().unwrap_or(0))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::OperationOutcome;
    use enclave_core::{CallerId, FsError, Operation};
    use std::sync::Arc;

    fn event(op: Operation, path: &str) -> OperationEvent {
        OperationEvent::new(op, "demo", path)
    }

    #[test]
    fn test_sequence_and_timestamp_monotonic() {
        let log = OperationLog::in_memory(100);
        let a = log.record(event(Operation::Write, "a.txt")).unwrap();
        let b = log.record(event(Operation::Read, "a.txt")).unwrap();
        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert!(b.timestamp >= a.timestamp);
    }

    #[test]
    fn test_query_most_recent_first_with_filters() {
        let log = OperationLog::in_memory(100);
        log.record(event(Operation::Write, "a.txt").with_caller(Some("alice".into())))
            .unwrap();
        log.record(
            event(Operation::Read, "missing.txt")
                .with_caller(Some("bob".into()))
                .with_outcome(OperationOutcome::from(&FsError::not_found("missing.txt"))),
        )
        .unwrap();
        log.record(event(Operation::List, ".").with_caller(Some("alice".into())))
            .unwrap();

        let all = log.query(&LogQuery::new()).unwrap();
        let seqs: Vec<u64> = all.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![3, 2, 1]);

        let alice = log.query(&LogQuery::new().with_caller("alice")).unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|e| e.caller_id == Some(CallerId::from("alice"))));

        let failures = log.query(&LogQuery::new().with_success(false)).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].relative_path, "missing.txt");

        let limited = log.query(&LogQuery::new().with_limit(1)).unwrap();
        assert_eq!(limited[0].sequence, 3);
    }

    #[test]
    fn test_query_time_range() {
        let log = OperationLog::in_memory(100);
        let first = log.record(event(Operation::Write, "a.txt")).unwrap();
        let later = log.query(&LogQuery::new().with_since(first.timestamp.0)).unwrap();
        assert_eq!(later.len(), 1);

        let before = log
            .query(&LogQuery::new().with_until(first.timestamp.0))
            .unwrap();
        assert!(before.is_empty());
    }

    #[test]
    fn test_error_summary() {
        let log = OperationLog::in_memory(100);
        let security = FsError::security("../x", "escapes workspace root");
        for _ in 0..2 {
            log.record(event(Operation::Read, "../x").with_outcome((&security).into()))
                .unwrap();
        }
        log.record(
            event(Operation::Read, "gone.txt")
                .with_outcome(OperationOutcome::from(&FsError::not_found("gone.txt"))),
        )
        .unwrap();
        log.record(event(Operation::Write, "ok.txt")).unwrap();

        let summary = log.error_summary().unwrap();
        assert_eq!(summary.get(&ErrorKind::Security), Some(&2));
        assert_eq!(summary.get(&ErrorKind::FileOperation), Some(&1));
        assert_eq!(summary.len(), 2);
    }

    #[test]
    fn test_retention_drops_oldest() {
        let log = OperationLog::in_memory(2);
        for i in 0..4 {
            log.record(event(Operation::Read, &format!("{i}.txt"))).unwrap();
        }
        assert_eq!(log.count().unwrap(), 2);
        let seqs: Vec<u64> = log
            .query(&LogQuery::new())
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(seqs, vec![4, 3]);
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let log = Arc::new(OperationLog::in_memory(10_000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.record(event(Operation::Append, &format!("t{t}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let entries = log.query(&LogQuery::new()).unwrap();
        assert_eq!(entries.len(), 400);
        let mut seqs: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), 400);
        // Most-recent-first ordering is strict on sequence.
        assert!(entries.windows(2).all(|w| w[0].sequence > w[1].sequence));
        assert!(entries.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_persisted_log_resumes_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operations.jsonl");
        {
            let log = OperationLog::open(&path, 100).unwrap();
            log.record(event(Operation::Write, "a.txt")).unwrap();
            log.record(event(Operation::Write, "b.txt")).unwrap();
            log.flush().unwrap();
        }
        let log = OperationLog::open(&path, 100).unwrap();
        let next = log.record(event(Operation::Read, "a.txt")).unwrap();
        assert_eq!(next.sequence, 3);
        assert_eq!(log.count().unwrap(), 3);
    }
}
