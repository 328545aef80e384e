//! Pending transfer state plumbing

use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::repository::{
    ActiveTransferRepository, CompletedTransferRepository, NodeRepository,
    PendingTransferRepository,
};
use crate::sdk::TransferSdk;
use crate::types::{
    ActiveTransfer, AppData, CompletedTransfer, InsertPendingTransferRequest, NodeId,
    PendingTransfer, PendingTransferState, Transfer, TransferEvent, TransferType, TypedNode,
    UriPath,
};
use crate::usecase::destination::GetFileDestinationAndAppDataForDownload;

/// Streams batches of pending transfers of one type and state
#[derive(Clone)]
pub struct GetPendingTransfersByTypeAndState {
    repository: Arc<dyn PendingTransferRepository>,
}

impl GetPendingTransfersByTypeAndState {
    pub fn new(repository: Arc<dyn PendingTransferRepository>) -> Self {
        Self { repository }
    }

    pub fn execute(
        &self,
        transfer_type: TransferType,
        state: PendingTransferState,
    ) -> BoxStream<'static, Result<Vec<PendingTransfer>>> {
        self.repository
            .monitor_pending_transfers_by_type_and_state(transfer_type, state)
    }
}

#[derive(Clone)]
pub struct GetTypedNodeFromPendingTransfer {
    nodes: Arc<dyn NodeRepository>,
}

impl GetTypedNodeFromPendingTransfer {
    pub fn new(nodes: Arc<dyn NodeRepository>) -> Self {
        Self { nodes }
    }

    pub async fn execute(&self, pending: &PendingTransfer) -> Result<Option<TypedNode>> {
        self.nodes.get_node(&pending.node_identifier).await
    }
}

/// Hands a node to the SDK and returns its transfer events
#[derive(Clone)]
pub struct DownloadNode {
    sdk: Arc<dyn TransferSdk>,
}

impl DownloadNode {
    pub fn new(sdk: Arc<dyn TransferSdk>) -> Self {
        Self { sdk }
    }

    pub fn execute(
        &self,
        node: &TypedNode,
        destination: &UriPath,
        app_data: &[AppData],
        is_high_priority: bool,
    ) -> BoxStream<'static, Result<TransferEvent>> {
        debug!(
            "Downloading {} into {} (high priority: {})",
            node.id, destination, is_high_priority
        );
        self.sdk
            .download_node(node, destination, app_data, is_high_priority)
    }
}

/// Moves pending transfers forward through their lifecycle
#[derive(Clone)]
pub struct UpdatePendingTransferState {
    repository: Arc<dyn PendingTransferRepository>,
}

impl UpdatePendingTransferState {
    pub fn new(repository: Arc<dyn PendingTransferRepository>) -> Self {
        Self { repository }
    }

    /// Returns the ids of the transfers that actually moved
    pub async fn execute(
        &self,
        pending_transfers: &[PendingTransfer],
        state: PendingTransferState,
    ) -> Result<Vec<i64>> {
        let ids: Vec<i64> = pending_transfers
            .iter()
            .filter(|pending| {
                let allowed = pending.state.can_transition_to(state);
                if !allowed {
                    warn!(
                        "Ignoring state change of pending transfer {}: {:?} -> {:?}",
                        pending.id, pending.state, state
                    );
                }
                allowed
            })
            .map(|pending| pending.id)
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.repository
            .update_pending_transfer_state(&ids, state)
            .await
    }
}

#[derive(Clone)]
pub struct UpdatePendingTransferStartedCount {
    repository: Arc<dyn PendingTransferRepository>,
}

impl UpdatePendingTransferStartedCount {
    pub fn new(repository: Arc<dyn PendingTransferRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        pending: &PendingTransfer,
        started_files: u32,
        already_transferred: u32,
    ) -> Result<()> {
        self.repository
            .update_pending_transfer_started_count(pending.id, started_files, already_transferred)
            .await
    }
}

#[derive(Clone)]
pub struct InsertOrUpdateActiveTransfer {
    repository: Arc<dyn ActiveTransferRepository>,
}

impl InsertOrUpdateActiveTransfer {
    pub fn new(repository: Arc<dyn ActiveTransferRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, transfer: &Transfer) -> Result<()> {
        self.repository
            .insert_or_update_active_transfer(&ActiveTransfer::from(transfer))
            .await
    }
}

/// Records a failed history entry for a pending transfer the SDK never accepted
#[derive(Clone)]
pub struct AddCompletedTransferFromFailedPendingTransfer {
    completed: Arc<dyn CompletedTransferRepository>,
    nodes: Arc<dyn NodeRepository>,
}

impl AddCompletedTransferFromFailedPendingTransfer {
    pub fn new(
        completed: Arc<dyn CompletedTransferRepository>,
        nodes: Arc<dyn NodeRepository>,
    ) -> Self {
        Self { completed, nodes }
    }

    pub async fn execute(&self, pending: &PendingTransfer, error: &str) -> Result<i64> {
        // The node may be the reason for the failure, so its size is best effort
        let node = self
            .nodes
            .get_node(&pending.node_identifier)
            .await
            .ok()
            .flatten();
        let mut record = CompletedTransfer::from_failed_pending_transfer(
            pending,
            node.as_ref().map(TypedNode::size).unwrap_or_default(),
            error,
        );
        if pending.file_name.is_none() {
            if let Some(node) = node {
                record.file_name = node.name;
            }
        }
        self.completed.add_completed_transfer(&record).await
    }
}

/// A user request to download one or more nodes into a destination
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub nodes: Vec<(NodeId, Option<String>)>,
    pub destination: UriPath,
    pub app_data: Vec<AppData>,
    pub is_high_priority: bool,
}

/// Records download requests as pending transfers for the orchestrator to pick up
#[derive(Clone)]
pub struct AddPendingDownloads {
    repository: Arc<dyn PendingTransferRepository>,
    destination: GetFileDestinationAndAppDataForDownload,
}

impl AddPendingDownloads {
    pub fn new(
        repository: Arc<dyn PendingTransferRepository>,
        destination: GetFileDestinationAndAppDataForDownload,
    ) -> Self {
        Self {
            repository,
            destination,
        }
    }

    pub async fn execute(&self, request: DownloadRequest) -> Result<Vec<PendingTransfer>> {
        let resolved = self.destination.execute(&request.destination).await?;
        let mut app_data = request.app_data;
        app_data.extend(resolved.app_data);

        let requests = request
            .nodes
            .into_iter()
            .map(|(node_identifier, file_name)| InsertPendingTransferRequest {
                transfer_type: TransferType::Download,
                node_identifier,
                uri_path: resolved.destination.clone(),
                app_data: app_data.clone(),
                is_high_priority: request.is_high_priority,
                file_name,
            })
            .collect::<Vec<_>>();

        let inserted = self.repository.insert_pending_transfers(requests).await?;
        info!(
            "Added {} pending downloads into {}",
            inserted.len(),
            resolved.destination
        );
        Ok(inserted)
    }
}
