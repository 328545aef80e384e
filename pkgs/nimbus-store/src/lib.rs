//! Nimbus Store - SQLite persistence for transfer state
//!
//! Backs the repository traits of `nimbus-transfers` with Sea-ORM over SQLite.
//!
//! # Architecture
//!
//! - **PendingTransferStore**: transfers waiting to be handed to the SDK, with
//!   forward-only state updates
//! - **ActiveTransferStore**: snapshots of transfers the SDK is tracking
//! - **CompletedTransferStore**: transfer history, optionally capped
//! - **SettingsManager**: key-value settings, including feature flags
//!
//! Pending and active transfer stores each bump their own revision on write;
//! a monitor stream re-runs its query whenever its store's revision moves.
//!
//! # Database Schema
//!
//! - `pending_transfers`: requested transfers, state and started counts
//! - `active_transfers`: per-tag SDK transfer snapshots
//! - `completed_transfers`: finished, failed and cancelled transfers
//! - `settings`: key-value settings storage
//!
//! `node_identifier` and `app_data` columns hold JSON.

pub mod active_transfer_store;
pub mod changes;
pub mod completed_transfer_store;
pub mod entities;
pub mod error;
pub mod migration;
pub mod pending_transfer_store;
pub mod settings_manager;

use sea_orm::{Database, DatabaseConnection};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub use active_transfer_store::ActiveTransferStore;
pub use changes::ChangeNotifier;
pub use completed_transfer_store::CompletedTransferStore;
pub use error::{Result, StoreError};
pub use pending_transfer_store::PendingTransferStore;
pub use settings_manager::SettingsManager;

use migration::{Migrator, MigratorTrait};

/// Configuration for the persistence layer
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,

    /// Maximum number of history entries kept (default: 1000)
    pub completed_history_limit: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("nimbus-transfers.db"),
            completed_history_limit: Some(1000),
        }
    }
}

/// All stores over one connection; each monitored store has its own change notifier
#[derive(Clone)]
pub struct TransferStore {
    pub pending: Arc<PendingTransferStore>,
    pub active: Arc<ActiveTransferStore>,
    pub completed: Arc<CompletedTransferStore>,
    pub settings: Arc<SettingsManager>,
    db: DatabaseConnection,
}

impl TransferStore {
    /// Open (or create) the database at the configured path and run migrations
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let url = format!(
            "sqlite:{}?mode=rwc",
            config.db_path.to_string_lossy().replace('\\', "/")
        );
        let db = Database::connect(&url).await?;
        info!("Opened transfer database at {}", config.db_path.display());
        Self::from_connection(db, config).await
    }

    /// Use an existing connection; migrations are applied if needed
    pub async fn from_connection(db: DatabaseConnection, config: &StoreConfig) -> Result<Self> {
        Migrator::up(&db, None).await?;

        Ok(Self {
            pending: Arc::new(PendingTransferStore::new(db.clone(), ChangeNotifier::new())),
            active: Arc::new(ActiveTransferStore::new(db.clone(), ChangeNotifier::new())),
            completed: Arc::new(
                CompletedTransferStore::new(db.clone())
                    .with_history_limit(config.completed_history_limit),
            ),
            settings: Arc::new(SettingsManager::new(db.clone())),
            db,
        })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}
