//! Concurrent operations on the same workspace.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use enclave_audit::LogQuery;
use enclave_core::Operation;
use enclave_vfs::{AppendRequest, ReadRequest, WriteRequest};
use enclave_workspace::{CopyRequest, ListRequest, MkdirRequest};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_keep_both_payloads() {
    let h = Harness::new().await;
    h.ws
        .files()
        .write(WriteRequest::new("log.txt", ""))
        .await
        .unwrap();

    let a = {
        let ws = Arc::clone(&h.ws);
        tokio::spawn(async move {
            ws.files()
                .append(AppendRequest::new("log.txt", "first payload\n"))
                .await
        })
    };
    let b = {
        let ws = Arc::clone(&h.ws);
        tokio::spawn(async move {
            ws.files()
                .append(AppendRequest::new("log.txt", "second payload\n"))
                .await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let text = h
        .ws
        .files()
        .read(ReadRequest::new("log.txt"))
        .await
        .unwrap();
    assert!(text.contains("first payload\n"));
    assert!(text.contains("second payload\n"));
    assert_eq!(text.len(), "first payload\nsecond payload\n".len());

    let appends = h
        .log
        .query(&LogQuery::new().with_operation(Operation::Append))
        .unwrap();
    assert_eq!(appends.len(), 2);
    assert!(appends.iter().all(|e| e.is_success()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_appends_are_not_interleaved() {
    let h = Harness::new().await;
    h.ws
        .files()
        .write(WriteRequest::new("lines.txt", ""))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let ws = Arc::clone(&h.ws);
        tasks.push(tokio::spawn(async move {
            let line = format!("{}\n", format!("{i:02}").repeat(32));
            ws.files()
                .append(AppendRequest::new("lines.txt", line))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let text = h
        .ws
        .files()
        .read(ReadRequest::new("lines.txt"))
        .await
        .unwrap();
    let mut lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 16);
    lines.sort_unstable();
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("{i:02}").repeat(32));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_leave_one_complete_version() {
    let h = Harness::new().await;
    let payloads: Vec<String> = (0..8).map(|i| format!("version-{i}-").repeat(64)).collect();

    let mut tasks = Vec::new();
    for payload in payloads.clone() {
        let ws = Arc::clone(&h.ws);
        tasks.push(tokio::spawn(async move {
            ws.files()
                .write(WriteRequest::new("shared.txt", payload))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let text = h
        .ws
        .files()
        .read(ReadRequest::new("shared.txt"))
        .await
        .unwrap();
    assert!(payloads.contains(&text));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mkdir_of_same_path() {
    let h = Harness::new().await;
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let ws = Arc::clone(&h.ws);
        tasks.push(tokio::spawn(async move {
            ws.create_directory(MkdirRequest::new("deep/er/path")).await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_dir());
    }

    let listed = h
        .ws
        .list_directory(ListRequest::new(".").with_recursive(true))
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_log_sequences_are_unique_under_load() {
    let h = Harness::new().await;
    let mut tasks = Vec::new();
    for i in 0..32 {
        let ws = Arc::clone(&h.ws);
        tasks.push(tokio::spawn(async move {
            ws.files()
                .write(WriteRequest::new(format!("f{i}.txt"), "x"))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let entries = h.log.query(&LogQuery::new()).unwrap();
    let mut sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
    let total = sequences.len();
    sequences.dedup();
    assert_eq!(sequences.len(), total);
    // Most recent first: strictly decreasing sequence and non-increasing time.
    for pair in entries.windows(2) {
        assert!(pair[0].sequence > pair[1].sequence);
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_write_queued_during_workspace_delete_fails_cleanly() {
    let h = Harness::new().await;
    let root = h.ws.root().to_path_buf();

    // Park the write on its path lock, then remove the workspace under it.
    let guard = h.ws.files().locks().lock(&root.join("sub/a.txt")).await;
    let write = {
        let ws = Arc::clone(&h.ws);
        tokio::spawn(async move {
            ws.files()
                .write(WriteRequest::new("sub/a.txt", "x"))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.registry.delete("demo", None).await.unwrap();
    drop(guard);

    let err = write.await.unwrap().unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert!(!root.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_copy_queued_during_workspace_delete_fails_cleanly() {
    let h = Harness::new().await;
    h.ws
        .files()
        .write(WriteRequest::new("a.txt", "x"))
        .await
        .unwrap();
    let root = h.ws.root().to_path_buf();

    let guard = h.ws.files().locks().lock(&root.join("deep/b.txt")).await;
    let copy = {
        let ws = Arc::clone(&h.ws);
        tokio::spawn(async move { ws.copy_item(CopyRequest::new("a.txt", "deep/b.txt")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.registry.delete("demo", None).await.unwrap();
    drop(guard);

    let err = copy.await.unwrap().unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert!(!root.exists());
}
