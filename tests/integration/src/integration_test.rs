//! End-to-end runs of the reconciler against the file store.

use prmd_store::{FileStore, ResourceId};
use prmd_sync::{Reconciler, RunInput, RunOutcome, SyncConfig};
use prmd_text::normalize;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn count(body: &str, block: &str) -> usize {
    normalize(body).matches(&normalize(block)).count()
}

#[tokio::test]
async fn test_repeated_runs_keep_single_block() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("PR.md"), "## Summary\r\nMoves config loading.\r\n").unwrap();

    let store = FileStore::with_root(dir.path());
    let config = SyncConfig::new("<!-- bot -->\n**Preview:** pending").with_backoff_base_ms(1);
    let input = RunInput::new("PR.md");
    let reconciler = Reconciler::new(&store, &config);

    let first = reconciler.run(&input).await.unwrap();
    assert_eq!(first.outcome, RunOutcome::Updated);

    for _ in 0..3 {
        let again = reconciler.run(&input).await.unwrap();
        assert_eq!(again.outcome, RunOutcome::AlreadyPresent);
    }

    let body = fs::read_to_string(dir.path().join("PR.md")).unwrap();
    assert_eq!(
        body,
        "## Summary\r\nMoves config loading.\n\n<!-- bot -->\n**Preview:** pending"
    );
    assert_eq!(count(&body, &config.block), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_each_land_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("PR.md");
    fs::write(&path, "Shared description").unwrap();

    let store = Arc::new(FileStore::with_root(dir.path()));
    let blocks: Vec<String> = (0..4)
        .map(|i| format!("**Bot {i}:** status ok"))
        .collect();

    let handles: Vec<_> = blocks
        .iter()
        .cloned()
        .map(|block| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let config = SyncConfig::new(block)
                    .with_max_retries(10)
                    .with_backoff_base_ms(1);
                Reconciler::new(store.as_ref(), &config)
                    .run(&RunInput::new(ResourceId::new("PR.md")))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let body = fs::read_to_string(&path).unwrap();
    assert!(body.starts_with("Shared description"));
    for block in &blocks {
        assert_eq!(count(&body, block), 1, "block {block:?} in {body:?}");
    }
}
