// Shared helpers for store tests

#![allow(dead_code)]

use nimbus_store::{StoreConfig, TransferStore};
use nimbus_transfers::{
    ActiveTransfer, AppData, InsertPendingTransferRequest, NodeId, TransferType, UriPath,
};
use std::path::PathBuf;
use tempfile::NamedTempFile;

pub async fn create_test_db(path: &NamedTempFile) -> sea_orm::DatabaseConnection {
    sea_orm::Database::connect(&format!(
        "sqlite:{}?mode=rwc",
        path.path().to_str().unwrap().replace("\\", "/")
    ))
    .await
    .expect("Failed to connect to database")
}

pub async fn create_test_store(path: &NamedTempFile) -> TransferStore {
    let db = create_test_db(path).await;
    TransferStore::from_connection(db, &StoreConfig::default())
        .await
        .expect("Failed to run migrations")
}

pub fn download_request(handle: u64, app_data: Vec<AppData>) -> InsertPendingTransferRequest {
    InsertPendingTransferRequest {
        transfer_type: TransferType::Download,
        node_identifier: NodeId::CloudDrive { handle },
        uri_path: UriPath::Path(PathBuf::from("/downloads")),
        app_data,
        is_high_priority: false,
        file_name: Some(format!("file-{handle}")),
    }
}

pub fn active_transfer(tag: i32, transfer_type: TransferType) -> ActiveTransfer {
    ActiveTransfer {
        tag,
        transfer_type,
        file_name: format!("file-{tag}"),
        total_bytes: 100,
        transferred_bytes: 0,
        is_finished: false,
        is_folder: false,
        is_paused: false,
        is_already_transferred: false,
        is_cancelled: false,
        app_data: Vec::new(),
    }
}
