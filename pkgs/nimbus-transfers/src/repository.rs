//! Collaborator seams: persisted transfer state, node lookup, file system and feature flags

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{
    ActiveTransfer, CompletedTransfer, InsertPendingTransferRequest, NodeId, PendingTransfer,
    PendingTransferState, TransferType, TypedNode,
};

/// Persisted pending transfers
#[async_trait]
pub trait PendingTransferRepository: Send + Sync {
    /// Current batch of pending transfers matching type and state, re-emitted on every change
    fn monitor_pending_transfers_by_type_and_state(
        &self,
        transfer_type: TransferType,
        state: PendingTransferState,
    ) -> BoxStream<'static, Result<Vec<PendingTransfer>>>;

    async fn insert_pending_transfers(
        &self,
        requests: Vec<InsertPendingTransferRequest>,
    ) -> Result<Vec<PendingTransfer>>;

    async fn get_pending_transfer(&self, id: i64) -> Result<Option<PendingTransfer>>;

    /// Move the given transfers to `state` and return the ids that moved.
    /// Rows whose stored state cannot move there stay untouched.
    async fn update_pending_transfer_state(
        &self,
        ids: &[i64],
        state: PendingTransferState,
    ) -> Result<Vec<i64>>;

    async fn update_pending_transfer_started_count(
        &self,
        id: i64,
        started_files: u32,
        already_transferred: u32,
    ) -> Result<()>;

    /// Remove transfers that reached a terminal state
    async fn delete_resolved_pending_transfers(&self) -> Result<u64>;
}

/// Records of transfers currently tracked by the SDK
#[async_trait]
pub trait ActiveTransferRepository: Send + Sync {
    async fn insert_or_update_active_transfer(&self, transfer: &ActiveTransfer) -> Result<()>;

    async fn get_active_transfers_by_type(
        &self,
        transfer_type: TransferType,
    ) -> Result<Vec<ActiveTransfer>>;

    fn monitor_active_transfers_by_type(
        &self,
        transfer_type: TransferType,
    ) -> BoxStream<'static, Result<Vec<ActiveTransfer>>>;

    async fn delete_finished_active_transfers(&self) -> Result<u64>;
}

/// Transfer history
#[async_trait]
pub trait CompletedTransferRepository: Send + Sync {
    async fn add_completed_transfer(&self, transfer: &CompletedTransfer) -> Result<i64>;

    async fn get_completed_transfers(&self, limit: Option<u64>) -> Result<Vec<CompletedTransfer>>;
}

/// Resolves node identifiers to nodes known by the SDK
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn get_node(&self, id: &NodeId) -> Result<Option<TypedNode>>;
}

/// Platform storage knowledge needed to pick a download destination
#[async_trait]
pub trait FileSystemRepository: Send + Sync {
    fn is_sd_card_path(&self, path: &Path) -> bool;

    fn is_sd_card_content_uri(&self, uri: &str) -> bool;

    fn is_external_storage_content_uri(&self, uri: &str) -> bool;

    async fn get_or_create_sd_card_transfers_cache_folder(&self) -> Result<Option<PathBuf>>;
}

/// Runtime feature switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    ChooseDownloadDestination,
}

impl Feature {
    pub fn key(&self) -> &'static str {
        match self {
            Feature::ChooseDownloadDestination => "feature.choose_download_destination",
        }
    }
}

#[async_trait]
pub trait FeatureFlagRepository: Send + Sync {
    async fn is_enabled(&self, feature: Feature) -> Result<bool>;
}
