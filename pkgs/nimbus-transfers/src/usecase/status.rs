//! Transfer status aggregation

use futures::future;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tracing::warn;

use crate::flow::{combine_latest, combine_latest2, StateFlow};
use crate::repository::ActiveTransferRepository;
use crate::totals::{ActiveTransferTotals, OngoingTransfers, TransferFlags, TransfersStatusInfo};
use crate::types::TransferType;

/// Follows the active transfers of one type together with the global transfer flags
#[derive(Clone)]
pub struct MonitorOngoingActiveTransfers {
    repository: Arc<dyn ActiveTransferRepository>,
    flags: StateFlow<TransferFlags>,
}

impl MonitorOngoingActiveTransfers {
    pub fn new(
        repository: Arc<dyn ActiveTransferRepository>,
        flags: StateFlow<TransferFlags>,
    ) -> Self {
        Self { repository, flags }
    }

    pub fn execute(&self, transfer_type: TransferType) -> BoxStream<'static, OngoingTransfers> {
        let totals = self
            .repository
            .monitor_active_transfers_by_type(transfer_type)
            .filter_map(move |result| {
                future::ready(match result {
                    Ok(transfers) => Some(ActiveTransferTotals::from_transfers(
                        transfer_type,
                        &transfers,
                    )),
                    Err(e) => {
                        warn!("Failed to read active {} transfers: {}", transfer_type.as_str(), e);
                        None
                    }
                })
            })
            .boxed();

        combine_latest2(totals, self.flags.subscribe())
            .map(|(totals, flags)| OngoingTransfers {
                paused: totals.all_paused() || flags.paused,
                transfers_over_quota: flags.transfers_over_quota,
                storage_over_quota: flags.storage_over_quota,
                totals,
            })
            .boxed()
    }
}

/// Combines every transfer type into one status snapshot
#[derive(Clone)]
pub struct MonitorTransfersStatus {
    ongoing: MonitorOngoingActiveTransfers,
}

impl MonitorTransfersStatus {
    pub fn new(ongoing: MonitorOngoingActiveTransfers) -> Self {
        Self { ongoing }
    }

    pub fn execute(&self) -> BoxStream<'static, TransfersStatusInfo> {
        let per_type = TransferType::ALL
            .into_iter()
            .map(|transfer_type| self.ongoing.execute(transfer_type))
            .collect();

        combine_latest(per_type)
            .map(|ongoing| TransfersStatusInfo::aggregate(&ongoing))
            .boxed()
    }
}
