//! Submits pending downloads to the SDK and reconciles their state

use futures::stream::{self, BoxStream, StreamExt};
use std::slice;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransferError};
use crate::flow::conflate;
use crate::types::{
    PendingTransfer, PendingTransferState, TransferEvent, TransferStage, TransferType,
};
use crate::usecase::pending::{
    AddCompletedTransferFromFailedPendingTransfer, DownloadNode,
    GetPendingTransfersByTypeAndState, GetTypedNodeFromPendingTransfer,
    InsertOrUpdateActiveTransfer, UpdatePendingTransferStartedCount, UpdatePendingTransferState,
};

/// Starts every pending download not yet sent to the SDK.
///
/// Batches are conflated: a batch emitted while the previous one is still being
/// submitted replaces any batch that was waiting.
#[derive(Clone)]
pub struct StartAllPendingDownloads {
    get_pending_transfers: GetPendingTransfersByTypeAndState,
    get_typed_node: GetTypedNodeFromPendingTransfer,
    download_node: DownloadNode,
    update_state: UpdatePendingTransferState,
    update_started_count: UpdatePendingTransferStartedCount,
    insert_or_update_active_transfer: InsertOrUpdateActiveTransfer,
    add_failed_completed_transfer: AddCompletedTransferFromFailedPendingTransfer,
}

impl StartAllPendingDownloads {
    pub fn new(
        get_pending_transfers: GetPendingTransfersByTypeAndState,
        get_typed_node: GetTypedNodeFromPendingTransfer,
        download_node: DownloadNode,
        update_state: UpdatePendingTransferState,
        update_started_count: UpdatePendingTransferStartedCount,
        insert_or_update_active_transfer: InsertOrUpdateActiveTransfer,
        add_failed_completed_transfer: AddCompletedTransferFromFailedPendingTransfer,
    ) -> Self {
        Self {
            get_pending_transfers,
            get_typed_node,
            download_node,
            update_state,
            update_started_count,
            insert_or_update_active_transfer,
            add_failed_completed_transfer,
        }
    }

    /// Yields the size of every processed batch.
    ///
    /// Downloads run on child tasks owned by the returned stream: dropping the
    /// stream aborts them, while upstream completion waits for them to finish.
    pub fn execute(&self) -> BoxStream<'static, usize> {
        let batches = conflate(self.get_pending_transfers.execute(
            TransferType::Download,
            PendingTransferState::NotSentToSdk,
        ))
        .boxed();

        stream::unfold(
            (batches, JoinSet::new(), self.clone()),
            |(mut batches, mut tasks, this)| async move {
                let batch = match batches.next().await {
                    Some(Ok(batch)) => batch,
                    Some(Err(e)) => {
                        error!("Failed to monitor pending downloads: {}", e);
                        Self::drain(&mut tasks).await;
                        return None;
                    }
                    None => {
                        Self::drain(&mut tasks).await;
                        return None;
                    }
                };
                while tasks.try_join_next().is_some() {}

                let count = this.start_batch(batch, &mut tasks).await;
                Some((count, (batches, tasks, this)))
            },
        )
        .boxed()
    }

    async fn drain(tasks: &mut JoinSet<()>) {
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!("Pending download task ended abnormally: {}", e);
            }
        }
    }

    async fn start_batch(&self, batch: Vec<PendingTransfer>, tasks: &mut JoinSet<()>) -> usize {
        let count = batch.len();
        if batch.is_empty() {
            return 0;
        }
        info!("Starting {} pending downloads", count);

        let claimed = match self
            .update_state
            .execute(&batch, PendingTransferState::SdkScanning)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                error!("Failed to mark pending downloads as scanning: {}", e);
                let reason = e.to_string();
                for pending in &batch {
                    self.handle_failure(pending, &reason).await;
                }
                return count;
            }
        };

        // A stale batch may carry transfers another batch already claimed
        let (claimed, skipped): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|pending| claimed.contains(&pending.id));
        if !skipped.is_empty() {
            debug!(
                "Skipping {} pending downloads already sent to the SDK",
                skipped.len()
            );
        }

        for mut pending in claimed {
            pending.state = PendingTransferState::SdkScanning;
            let this = self.clone();
            tasks.spawn(async move {
                this.start_download(pending).await;
            });
        }
        count
    }

    async fn start_download(&self, mut pending: PendingTransfer) {
        if let Err(e) = self.download(&mut pending).await {
            self.handle_failure(&pending, &e.to_string()).await;
        }
    }

    async fn download(&self, pending: &mut PendingTransfer) -> Result<()> {
        let node = self
            .get_typed_node
            .execute(pending)
            .await?
            .ok_or_else(|| TransferError::NodeDoesNotExist(pending.node_identifier.clone()))?;

        let mut events = self.download_node.execute(
            &node,
            &pending.uri_path,
            &pending.app_data,
            pending.is_high_priority,
        );
        while let Some(event) = events.next().await {
            self.handle_event(pending, &event?).await?;
        }
        Ok(())
    }

    async fn handle_event(
        &self,
        pending: &mut PendingTransfer,
        event: &TransferEvent,
    ) -> Result<()> {
        match event {
            TransferEvent::Start { transfer } => {
                self.insert_or_update_active_transfer.execute(transfer).await?;
            }
            TransferEvent::Update { transfer } => {
                self.mark_scanned(pending, 1, 0).await?;
                self.insert_or_update_active_transfer.execute(transfer).await?;
            }
            TransferEvent::Finish { transfer, .. } => {
                let already_transferred = u32::from(transfer.is_already_transferred);
                self.mark_scanned(pending, 1, already_transferred).await?;
                self.insert_or_update_active_transfer.execute(transfer).await?;
            }
            TransferEvent::FolderUpdate {
                stage: TransferStage::TransferringFiles,
                file_count,
                ..
            } => {
                let started = u32::try_from(*file_count).unwrap_or(u32::MAX);
                self.mark_scanned(pending, started, 0).await?;
            }
            TransferEvent::FolderUpdate { .. }
            | TransferEvent::TemporaryError { .. }
            | TransferEvent::Pause { .. } => {}
        }
        Ok(())
    }

    /// The SDK tracks the transfer from here on
    async fn mark_scanned(
        &self,
        pending: &mut PendingTransfer,
        started_files: u32,
        already_transferred: u32,
    ) -> Result<()> {
        if pending.state == PendingTransferState::SdkScanned {
            return Ok(());
        }
        self.update_state
            .execute(slice::from_ref(pending), PendingTransferState::SdkScanned)
            .await?;
        pending.state = PendingTransferState::SdkScanned;
        self.update_started_count
            .execute(pending, started_files, already_transferred)
            .await?;
        debug!(
            "Pending transfer {} scanned ({} started, {} already transferred)",
            pending.id, started_files, already_transferred
        );
        Ok(())
    }

    async fn handle_failure(&self, pending: &PendingTransfer, reason: &str) {
        if pending.state.is_terminal() {
            warn!(
                "Pending transfer {} failed after reaching the SDK: {}",
                pending.id, reason
            );
            return;
        }
        warn!("Pending transfer {} could not start: {}", pending.id, reason);

        if let Err(e) = self
            .update_state
            .execute(slice::from_ref(pending), PendingTransferState::ErrorStarting)
            .await
        {
            error!("Failed to mark pending transfer {} as failed: {}", pending.id, e);
        }
        if pending.is_preview_download() {
            return;
        }
        if let Err(e) = self
            .add_failed_completed_transfer
            .execute(pending, reason)
            .await
        {
            error!(
                "Failed to record failed transfer for pending transfer {}: {}",
                pending.id, e
            );
        }
    }
}
