//! Tests for submitting pending downloads to the SDK

mod common;

use common::{pending_download, sdk_transfer, wait_until, Harness};
use futures::StreamExt;
use nimbus_transfers::{
    AppData, CompletedTransferState, PendingTransferState, TransferEvent, TransferStage,
};
use std::time::Duration;

async fn next_non_empty(stream: &mut futures::stream::BoxStream<'static, usize>) -> usize {
    loop {
        let count = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting for a batch")
            .expect("stream ended");
        if count > 0 {
            return count;
        }
    }
}

#[tokio::test]
async fn test_pending_downloads_are_started_and_marked_scanned() {
    let harness = Harness::new();
    let first = harness.nodes.add_file(1, "a.txt", 10);
    let second = harness.nodes.add_file(2, "b.txt", 20);
    harness.sdk.script(
        first.clone(),
        vec![
            Ok(TransferEvent::Start {
                transfer: sdk_transfer(11, "a.txt", 10, 0),
            }),
            Ok(TransferEvent::Update {
                transfer: sdk_transfer(11, "a.txt", 10, 5),
            }),
            Ok(TransferEvent::Finish {
                transfer: sdk_transfer(11, "a.txt", 10, 10),
                error: None,
            }),
        ],
    );
    harness.sdk.script(
        second.clone(),
        vec![
            Ok(TransferEvent::Start {
                transfer: sdk_transfer(12, "b.txt", 20, 0),
            }),
            Ok(TransferEvent::Update {
                transfer: sdk_transfer(12, "b.txt", 20, 1),
            }),
        ],
    );
    harness.pending.seed(pending_download(1, first, vec![]));
    harness.pending.seed(pending_download(2, second, vec![]));

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 2);

    let pending = harness.pending.clone();
    assert!(
        wait_until(|| pending
            .all()
            .iter()
            .all(|p| p.state == PendingTransferState::SdkScanned))
        .await
    );
    assert_eq!(harness.pending.get(1).unwrap().started_files, 1);
    assert_eq!(harness.pending.get(1).unwrap().already_transferred, 0);

    let active = harness.active.all();
    assert_eq!(active.len(), 2);
    let finished = active.iter().find(|t| t.tag == 11).unwrap();
    assert!(finished.is_finished);
    assert_eq!(finished.transferred_bytes, 10);
    assert!(harness.completed.all().is_empty());
    assert_eq!(harness.sdk.requests.lock().len(), 2);
}

#[tokio::test]
async fn test_already_transferred_file_counts_as_started_and_transferred() {
    let harness = Harness::new();
    let node = harness.nodes.add_file(1, "done.bin", 100);
    let mut transfer = sdk_transfer(21, "done.bin", 100, 100);
    transfer.is_already_transferred = true;
    harness.sdk.script(
        node.clone(),
        vec![
            Ok(TransferEvent::Start {
                transfer: transfer.clone(),
            }),
            Ok(TransferEvent::Finish {
                transfer,
                error: None,
            }),
        ],
    );
    harness.pending.seed(pending_download(1, node, vec![]));

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 1);

    let pending = harness.pending.clone();
    assert!(wait_until(|| pending.get(1).unwrap().state == PendingTransferState::SdkScanned).await);
    let scanned = harness.pending.get(1).unwrap();
    assert_eq!(scanned.started_files, 1);
    assert_eq!(scanned.already_transferred, 1);
}

#[tokio::test]
async fn test_folder_is_scanned_once_files_start_transferring() {
    let harness = Harness::new();
    let node = harness.nodes.add_folder(5, "photos");
    let mut folder = sdk_transfer(30, "photos", 0, 0);
    folder.is_folder = true;
    folder.is_finished = false;
    harness.sdk.script(
        node.clone(),
        vec![
            Ok(TransferEvent::Start {
                transfer: folder.clone(),
            }),
            Ok(TransferEvent::FolderUpdate {
                transfer: folder.clone(),
                stage: TransferStage::Scan,
                folder_count: 1,
                created_folder_count: 0,
                file_count: 0,
            }),
            Ok(TransferEvent::FolderUpdate {
                transfer: folder,
                stage: TransferStage::TransferringFiles,
                folder_count: 1,
                created_folder_count: 1,
                file_count: 3,
            }),
        ],
    );
    harness.pending.seed(pending_download(1, node, vec![]));

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 1);

    let pending = harness.pending.clone();
    assert!(wait_until(|| pending.get(1).unwrap().state == PendingTransferState::SdkScanned).await);
    assert_eq!(harness.pending.get(1).unwrap().started_files, 3);
}

#[tokio::test]
async fn test_missing_node_fails_and_records_failed_transfer() {
    let harness = Harness::new();
    let mut pending = pending_download(
        1,
        nimbus_transfers::NodeId::CloudDrive { handle: 404 },
        vec![],
    );
    pending.file_name = Some("gone.txt".to_string());
    harness.pending.seed(pending);

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 1);

    let completed = harness.completed.clone();
    assert!(wait_until(|| completed.all().len() == 1).await);
    assert_eq!(
        harness.pending.get(1).unwrap().state,
        PendingTransferState::ErrorStarting
    );
    let record = &harness.completed.all()[0];
    assert_eq!(record.state, CompletedTransferState::Failed);
    assert_eq!(record.file_name, "gone.txt");
    assert!(record.error.as_deref().unwrap().contains("Node does not exist"));
    assert!(harness.sdk.requests.lock().is_empty());
}

#[tokio::test]
async fn test_preview_download_failure_is_not_recorded() {
    let harness = Harness::new();
    harness.pending.seed(pending_download(
        1,
        nimbus_transfers::NodeId::CloudDrive { handle: 404 },
        vec![AppData::PreviewDownload],
    ));

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 1);

    let pending = harness.pending.clone();
    assert!(
        wait_until(|| pending.get(1).unwrap().state == PendingTransferState::ErrorStarting).await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.completed.all().is_empty());
}

#[tokio::test]
async fn test_node_lookup_error_fails_the_transfer() {
    let harness = Harness::new();
    let node = harness.nodes.add_file(3, "c.txt", 30);
    harness.nodes.fail_lookup(node.clone());
    harness.pending.seed(pending_download(1, node, vec![]));

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 1);

    let completed = harness.completed.clone();
    assert!(wait_until(|| completed.all().len() == 1).await);
    assert_eq!(
        harness.pending.get(1).unwrap().state,
        PendingTransferState::ErrorStarting
    );
}

#[tokio::test]
async fn test_sdk_error_before_scanning_fails_the_transfer() {
    let harness = Harness::new();
    let node = harness.nodes.add_file(1, "a.txt", 10);
    harness.sdk.script(
        node.clone(),
        vec![
            Ok(TransferEvent::Start {
                transfer: sdk_transfer(11, "a.txt", 10, 0),
            }),
            Err("quota exceeded".to_string()),
        ],
    );
    harness.pending.seed(pending_download(1, node, vec![]));

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 1);

    let completed = harness.completed.clone();
    assert!(wait_until(|| completed.all().len() == 1).await);
    assert_eq!(
        harness.pending.get(1).unwrap().state,
        PendingTransferState::ErrorStarting
    );
    let record = &harness.completed.all()[0];
    assert_eq!(record.file_name, "a.txt");
    assert_eq!(record.size, 10);
    assert!(record.error.as_deref().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_sdk_error_after_scanning_keeps_scanned_state() {
    let harness = Harness::new();
    let node = harness.nodes.add_file(1, "a.txt", 10);
    harness.sdk.script(
        node.clone(),
        vec![
            Ok(TransferEvent::Update {
                transfer: sdk_transfer(11, "a.txt", 10, 1),
            }),
            Err("connection reset".to_string()),
        ],
    );
    harness.pending.seed(pending_download(1, node, vec![]));

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 1);

    let pending = harness.pending.clone();
    assert!(wait_until(|| pending.get(1).unwrap().state == PendingTransferState::SdkScanned).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        harness.pending.get(1).unwrap().state,
        PendingTransferState::SdkScanned
    );
    assert!(harness.completed.all().is_empty());
}

#[tokio::test]
async fn test_failure_to_mark_scanning_fails_whole_batch() {
    let harness = Harness::new();
    let node = harness.nodes.add_file(1, "a.txt", 10);
    harness.pending.seed(pending_download(1, node, vec![]));
    *harness.pending.fail_state_updates.lock() = true;

    let mut started = harness.services.start_all_pending_downloads.execute();
    assert_eq!(next_non_empty(&mut started).await, 1);

    assert_eq!(harness.completed.all().len(), 1);
    assert!(harness.sdk.requests.lock().is_empty());
}

#[tokio::test]
async fn test_batches_are_conflated_while_a_batch_is_processed() {
    let harness = Harness::new();
    let batches = harness.pending.script_batches();
    let a = harness.nodes.add_file(1, "a", 1);
    let b = harness.nodes.add_file(2, "b", 1);
    let c = harness.nodes.add_file(3, "c", 1);

    let mut started = harness.services.start_all_pending_downloads.execute();

    batches
        .unbounded_send(Ok(vec![pending_download(1, a.clone(), vec![])]))
        .unwrap();
    assert_eq!(next_non_empty(&mut started).await, 1);

    // Two batches arrive before the consumer asks for the next one
    batches
        .unbounded_send(Ok(vec![
            pending_download(2, b.clone(), vec![]),
            pending_download(3, c.clone(), vec![]),
        ]))
        .unwrap();
    batches
        .unbounded_send(Ok(vec![
            pending_download(2, b, vec![]),
            pending_download(3, c, vec![]),
            pending_download(4, a, vec![]),
        ]))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(next_non_empty(&mut started).await, 3);
}

#[tokio::test]
async fn test_stale_batch_does_not_start_a_claimed_transfer_again() {
    let harness = Harness::new();
    let batches = harness.pending.script_batches();
    let node = harness.nodes.add_file(1, "a.txt", 10);
    harness.sdk.script(
        node.clone(),
        vec![Ok(TransferEvent::Start {
            transfer: sdk_transfer(11, "a.txt", 10, 0),
        })],
    );
    harness.pending.seed(pending_download(1, node.clone(), vec![]));

    let mut started = harness.services.start_all_pending_downloads.execute();
    batches
        .unbounded_send(Ok(vec![pending_download(1, node.clone(), vec![])]))
        .unwrap();
    assert_eq!(next_non_empty(&mut started).await, 1);
    assert_eq!(
        harness.pending.get(1).unwrap().state,
        PendingTransferState::SdkScanning
    );

    // Queried before the first batch was marked as scanning
    batches
        .unbounded_send(Ok(vec![pending_download(1, node, vec![])]))
        .unwrap();
    assert_eq!(next_non_empty(&mut started).await, 1);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(harness.sdk.requests.lock().len(), 1);
    assert!(harness.completed.all().is_empty());
}

#[tokio::test]
async fn test_stream_ends_after_children_once_upstream_completes() {
    let harness = Harness::new();
    let batches = harness.pending.script_batches();
    let node = harness.nodes.add_file(1, "a.txt", 10);
    harness.sdk.script(
        node.clone(),
        vec![Ok(TransferEvent::Finish {
            transfer: sdk_transfer(11, "a.txt", 10, 10),
            error: None,
        })],
    );
    harness.pending.seed(pending_download(1, node.clone(), vec![]));

    batches
        .unbounded_send(Ok(vec![pending_download(1, node, vec![])]))
        .unwrap();
    drop(batches);

    let counts: Vec<usize> = harness
        .services
        .start_all_pending_downloads
        .execute()
        .collect()
        .await;

    assert_eq!(counts, vec![1]);
    assert_eq!(
        harness.pending.get(1).unwrap().state,
        PendingTransferState::SdkScanned
    );
    assert_eq!(harness.active.all().len(), 1);
}

#[tokio::test]
async fn test_upstream_error_ends_the_stream() {
    let harness = Harness::new();
    let batches = harness.pending.script_batches();
    batches
        .unbounded_send(Err(nimbus_transfers::TransferError::Repository(
            "database locked".to_string(),
        )))
        .unwrap();

    let counts: Vec<usize> = harness
        .services
        .start_all_pending_downloads
        .execute()
        .collect()
        .await;

    assert!(counts.is_empty());
}
