//! Integration tests for range downloads against an in-memory node

use crate::support::{block_body, MockRpc};
use block_archive_downloader::downloader::{RunPhase, Scheduler, SchedulerError};
use block_archive_downloader::rpc::RpcError;
use block_archive_downloader::store::{RecordStore, StoreError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> Arc<RecordStore> {
    Arc::new(RecordStore::open(dir.path()).unwrap())
}

#[tokio::test]
async fn test_every_block_is_stored() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::healthy(3));

    let report = Scheduler::new(rpc.clone(), store.clone())
        .run(100, 5, 3)
        .await
        .unwrap();

    assert_eq!(report.phase, RunPhase::Done);
    assert!(report.is_complete());
    assert_eq!(report.statistics.succeeded, 5);
    assert_eq!(report.statistics.skipped, 0);
    assert_eq!(report.statistics.total_transactions, 15);
    assert_eq!(rpc.full_fetches(), 5);

    for block in 100..105 {
        assert!(store.exists_and_valid(block), "block {block} missing");
        let record = store.load(block).unwrap();
        assert_eq!(record.jsonrpc, "2.0");
        assert_eq!(record.id, 1);
        assert_eq!(record.result, block_body(block, 3));
    }
    assert!(!store.exists_and_valid(105));
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    Scheduler::new(Arc::new(MockRpc::healthy(2)), store.clone())
        .run(500, 10, 4)
        .await
        .unwrap();

    let rpc = Arc::new(MockRpc::healthy(2));
    let report = Scheduler::new(rpc.clone(), store.clone())
        .run(500, 10, 4)
        .await
        .unwrap();

    assert_eq!(rpc.calls(), 0);
    assert_eq!(report.statistics.succeeded, 10);
    assert_eq!(report.statistics.skipped, 10);
    assert_eq!(report.statistics.total_transactions, 20);
    assert!(report.preflight.is_none());

    let rpc = Arc::new(MockRpc::healthy(2));
    let report = Scheduler::new(rpc.clone(), store)
        .with_preflight(false)
        .run(500, 10, 4)
        .await
        .unwrap();
    assert_eq!(rpc.calls(), 0);
    assert_eq!(report.statistics.skipped, 10);
    assert!(report.preflight.is_none());
}

#[tokio::test]
async fn test_truncated_file_is_refetched() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    for block in 10..13 {
        store.save(block, &block_body(block, 1)).unwrap();
    }
    let path = store.path_for(11);
    let contents = std::fs::read(&path).unwrap();
    std::fs::write(&path, &contents[..contents.len() / 2]).unwrap();
    assert!(!store.exists_and_valid(11));

    let rpc = Arc::new(MockRpc::healthy(4));
    let report = Scheduler::new(rpc.clone(), store.clone())
        .run(10, 3, 2)
        .await
        .unwrap();

    assert_eq!(rpc.full_fetches(), 1);
    assert_eq!(rpc.attempts(11), 1);
    assert_eq!(report.statistics.skipped, 2);
    assert_eq!(report.statistics.total_transactions, 1 + 4 + 1);
    assert_eq!(store.read_tx_count(11).unwrap(), 4);
}

#[tokio::test]
async fn test_foreign_record_is_refetched() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    std::fs::write(
        store.path_for(42),
        json!({"jsonrpc": "2.0", "id": 1, "result": {"number": "0x2b"}}).to_string(),
    )
    .unwrap();

    let rpc = Arc::new(MockRpc::healthy(0));
    let report = Scheduler::new(rpc.clone(), store.clone())
        .run(42, 1, 1)
        .await
        .unwrap();

    assert_eq!(rpc.attempts(42), 1);
    assert_eq!(report.statistics.skipped, 0);
    assert!(store.exists_and_valid(42));
}

#[tokio::test]
async fn test_null_block_recovered_on_retry() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::new(|block, attempt| {
        if block == 101 && attempt == 1 {
            Ok(Value::Null)
        } else {
            Ok(block_body(block, 1))
        }
    }));

    let report = Scheduler::new(rpc.clone(), store.clone())
        .run(100, 3, 3)
        .await
        .unwrap();

    assert_eq!(report.statistics.succeeded, 3);
    assert_eq!(report.statistics.failed(), 0);
    assert_eq!(report.first_pass_failures, 1);
    assert_eq!(report.recovered_on_retry, 1);
    assert_eq!(rpc.attempts(101), 2);
    assert_eq!(rpc.attempts(100), 1);
    assert!(store.exists_and_valid(101));
}

#[tokio::test]
async fn test_persistent_failure_is_retried_once() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::new(|block, _| {
        if block == 101 {
            Err(RpcError::Remote(json!({"code": -32000, "message": "header not found"})))
        } else {
            Ok(block_body(block, 2))
        }
    }));

    let report = Scheduler::new(rpc.clone(), store.clone())
        .run(100, 3, 3)
        .await
        .unwrap();

    assert_eq!(report.phase, RunPhase::Done);
    assert!(!report.is_complete());
    assert_eq!(report.statistics.succeeded, 2);
    assert_eq!(report.statistics.failed_blocks(), vec![101]);
    assert_eq!(report.statistics.failures[0].kind, "rpc");
    assert_eq!(report.recovered_on_retry, 0);
    assert_eq!(rpc.attempts(101), 2);
    assert!(!store.path_for(101).exists());
}

#[tokio::test]
async fn test_wrong_blocks_are_failures_not_successes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::new(|_, _| {
        Ok(json!({"number": "0x1", "transactions": [1, 2]}))
    }));

    let report = Scheduler::new(rpc.clone(), store.clone())
        .with_preflight(false)
        .run(100, 3, 3)
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.statistics.succeeded, 0);
    assert_eq!(report.statistics.failed(), 3);
    assert_eq!(report.first_pass_failures, 3);
    assert!(report
        .statistics
        .failures
        .iter()
        .all(|f| f.kind == "invalid_block"));
    assert_eq!(rpc.attempts(100), 2);
    assert!(store.stored_blocks().unwrap().is_empty());
}

#[tokio::test]
async fn test_interrupted_run_resumes_after_stored_blocks() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    for block in 0..4 {
        store.save(block, &block_body(block, 2)).unwrap();
    }
    store.save(6, &block_body(6, 2)).unwrap();
    std::fs::write(store.blocks_dir().join(".bdf-k1ll3d.tmp"), "{\"jsonrpc\":").unwrap();

    let rpc = Arc::new(MockRpc::healthy(1));
    let report = Scheduler::new(rpc.clone(), store.clone())
        .run(0, 8, 3)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert!(report.preflight.is_some());
    assert_eq!(report.statistics.skipped, 5);
    assert_eq!(report.statistics.total_transactions, 5 * 2 + 3);
    assert_eq!(rpc.full_fetches(), 3);
    for block in [4, 5, 7] {
        assert_eq!(rpc.attempts(block), 1);
    }
    assert!(!store.blocks_dir().join(".bdf-k1ll3d.tmp").exists());
    assert_eq!(store.stored_blocks().unwrap(), (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_transaction_totals_and_average() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::new(|block, _| {
        Ok(block_body(block, if block == 0 { 5 } else { 7 }))
    }));

    let report = Scheduler::new(rpc, store).run(0, 2, 2).await.unwrap();

    assert_eq!(report.statistics.total_transactions, 12);
    assert_eq!(report.statistics.average_transactions(), 6.0);
}

#[tokio::test]
async fn test_unreachable_node_aborts_before_dispatch() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::healthy(1).with_tip(None));

    let report = Scheduler::new(rpc.clone(), store.clone())
        .run(100, 10, 4)
        .await
        .unwrap();

    assert!(report.is_aborted());
    assert_eq!(rpc.calls(), 1);
    assert_eq!(rpc.full_fetches(), 0);
    assert_eq!(report.statistics.processed(), 0);
    assert!(store.stored_blocks().unwrap().is_empty());
    let preflight = report.preflight.unwrap();
    assert!(preflight.latest_block.is_none());
    assert!(preflight.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_null_start_block_aborts() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::new(|block, attempt| {
        if attempt == 0 {
            Ok(Value::Null)
        } else {
            Ok(block_body(block, 1))
        }
    }));

    let report = Scheduler::new(rpc.clone(), store)
        .run(7, 3, 2)
        .await
        .unwrap();

    assert_eq!(report.phase, RunPhase::Aborted);
    assert_eq!(rpc.calls(), 2);
    assert_eq!(rpc.full_fetches(), 0);
}

#[tokio::test]
async fn test_in_flight_fetches_bounded_by_concurrency() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::healthy(0).with_delay(Duration::from_millis(5)));

    let report = Scheduler::new(rpc.clone(), store)
        .with_preflight(false)
        .run(1_000, 40, 4)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert!(rpc.max_in_flight() <= 4, "saw {}", rpc.max_in_flight());
    assert!(rpc.max_in_flight() > 1);
}

#[tokio::test]
async fn test_retry_pass_only_adds_successes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    // Even blocks fail on their first attempt, block 7 always fails
    let rpc = Arc::new(MockRpc::new(|block, attempt| {
        if block == 7 || (block % 2 == 0 && attempt == 1) {
            Err(RpcError::Transport("connection reset".into()))
        } else {
            Ok(block_body(block, 1))
        }
    }));

    let report = Scheduler::new(rpc.clone(), store)
        .with_retry_concurrency(2)
        .run(0, 10, 5)
        .await
        .unwrap();

    assert_eq!(report.first_pass_failures, 6);
    assert_eq!(report.recovered_on_retry, 5);
    assert_eq!(report.statistics.succeeded, 9);
    assert_eq!(
        report.statistics.succeeded,
        report.requested - report.first_pass_failures + report.recovered_on_retry
    );
    assert_eq!(report.statistics.failed_blocks(), vec![7]);
    assert_eq!(report.statistics.failures[0].kind, "transport");
    for block in 0..10 {
        assert!(rpc.attempts(block) <= 2);
    }
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rpc = Arc::new(MockRpc::healthy(1));
    let scheduler = Scheduler::new(rpc.clone(), store);

    assert!(matches!(
        scheduler.run(100, 0, 4).await,
        Err(SchedulerError::InvalidRange(_))
    ));
    assert!(matches!(
        scheduler.run(u64::MAX, 2, 4).await,
        Err(SchedulerError::InvalidRange(_))
    ));
    assert!(matches!(
        scheduler.run(100, 5, 0).await,
        Err(SchedulerError::InvalidConcurrency)
    ));
    assert_eq!(rpc.calls(), 0);
}

#[tokio::test]
async fn test_locked_store_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let _held = store.lock().unwrap();

    let result = Scheduler::new(Arc::new(MockRpc::healthy(1)), store)
        .with_preflight(false)
        .run(0, 3, 2)
        .await;

    assert!(matches!(
        result,
        Err(SchedulerError::Store(StoreError::Locked { .. }))
    ));
}

#[tokio::test]
async fn test_run_report_serializes() {
    let dir = TempDir::new().unwrap();
    let report = Scheduler::new(Arc::new(MockRpc::healthy(1)), open_store(&dir))
        .run(3, 2, 2)
        .await
        .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["phase"], "done");
    assert_eq!(value["requested"], 2);
    assert_eq!(value["statistics"]["succeeded"], 2);
    assert_eq!(value["preflight"]["latest_block"], 20_000_000);
}
