//! Nimbus Transfers - pending transfer orchestration over an opaque transfer SDK
//!
//! The native SDK performs the actual transfers. This crate records what the
//! user asked for, hands it to the SDK, reconciles the persisted state with the
//! events the SDK reports, and aggregates progress for display.
//!
//! # Architecture
//!
//! - **types**: pending, active and completed transfer records, SDK events
//! - **totals**: per-type active transfer totals and the combined status
//! - **flow**: `StateFlow`, conflation and combine-latest stream helpers
//! - **repository** / **sdk**: the seams towards storage, platform and SDK
//! - **usecase**: one struct per operation, composed by [`TransferServices`]
//!
//! # Pending transfer lifecycle
//!
//! ```text
//! NotSentToSdk -> SdkScanning -> SdkScanned
//!            \              \-> ErrorStarting
//!             \-> ErrorStarting
//! ```
//!
//! A transfer that ends in `ErrorStarting` gets a failed history entry unless it
//! is a preview download.

pub mod error;
pub mod flow;
pub mod repository;
pub mod sdk;
pub mod totals;
pub mod types;
pub mod usecase;

use std::sync::Arc;

pub use error::{Result, TransferError};
pub use flow::StateFlow;
pub use repository::{
    ActiveTransferRepository, CompletedTransferRepository, Feature, FeatureFlagRepository,
    FileSystemRepository, NodeRepository, PendingTransferRepository,
};
pub use sdk::TransferSdk;
pub use totals::{
    ActiveTransferGroup, ActiveTransferTotals, OngoingTransfers, TransferFlags,
    TransfersStatusInfo,
};
pub use types::{
    ActiveTransfer, AppData, AppDataExt, CompletedTransfer, CompletedTransferState,
    InsertPendingTransferRequest, NodeId, NodeKind, PendingTransfer, PendingTransferState,
    Transfer, TransferEvent, TransferStage, TransferType, TypedNode, UriPath,
};
pub use usecase::*;

/// Collaborators the use-cases are built from
#[derive(Clone)]
pub struct TransferDependencies {
    pub pending_transfers: Arc<dyn PendingTransferRepository>,
    pub active_transfers: Arc<dyn ActiveTransferRepository>,
    pub completed_transfers: Arc<dyn CompletedTransferRepository>,
    pub nodes: Arc<dyn NodeRepository>,
    pub sdk: Arc<dyn TransferSdk>,
    pub file_system: Arc<dyn FileSystemRepository>,
    pub feature_flags: Arc<dyn FeatureFlagRepository>,
    pub transfer_flags: StateFlow<TransferFlags>,
}

/// The wired set of transfer use-cases
#[derive(Clone)]
pub struct TransferServices {
    pub add_pending_downloads: AddPendingDownloads,
    pub start_all_pending_downloads: StartAllPendingDownloads,
    pub monitor_transfers_status: MonitorTransfersStatus,
    pub monitor_ongoing_active_transfers: MonitorOngoingActiveTransfers,
    pub file_destination: GetFileDestinationAndAppDataForDownload,
    pub transfer_flags: StateFlow<TransferFlags>,
}

impl TransferServices {
    pub fn new(deps: TransferDependencies) -> Self {
        let file_destination = GetFileDestinationAndAppDataForDownload::new(
            deps.file_system.clone(),
            deps.feature_flags.clone(),
        );
        let start_all_pending_downloads = StartAllPendingDownloads::new(
            GetPendingTransfersByTypeAndState::new(deps.pending_transfers.clone()),
            GetTypedNodeFromPendingTransfer::new(deps.nodes.clone()),
            DownloadNode::new(deps.sdk.clone()),
            UpdatePendingTransferState::new(deps.pending_transfers.clone()),
            UpdatePendingTransferStartedCount::new(deps.pending_transfers.clone()),
            InsertOrUpdateActiveTransfer::new(deps.active_transfers.clone()),
            AddCompletedTransferFromFailedPendingTransfer::new(
                deps.completed_transfers.clone(),
                deps.nodes.clone(),
            ),
        );
        let monitor_ongoing_active_transfers = MonitorOngoingActiveTransfers::new(
            deps.active_transfers.clone(),
            deps.transfer_flags.clone(),
        );

        Self {
            add_pending_downloads: AddPendingDownloads::new(
                deps.pending_transfers.clone(),
                file_destination.clone(),
            ),
            start_all_pending_downloads,
            monitor_transfers_status: MonitorTransfersStatus::new(
                monitor_ongoing_active_transfers.clone(),
            ),
            monitor_ongoing_active_transfers,
            file_destination,
            transfer_flags: deps.transfer_flags,
        }
    }
}
