//! Active transfer totals and the combined status projection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{ActiveTransfer, AppData, AppDataExt, TransferType};

/// Counters for one group of transfers started together
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActiveTransferGroup {
    pub group_id: i64,
    pub total_files: u32,
    pub finished_files: u32,
    pub completed_files: u32,
    pub already_transferred_files: u32,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub app_data: Vec<AppData>,
}

impl ActiveTransferGroup {
    pub fn pending_files(&self) -> u32 {
        self.total_files.saturating_sub(self.finished_files)
    }

    /// Groups tagged as preview or background work stay out of user facing counts
    pub fn is_non_counting(&self) -> bool {
        self.app_data.is_non_counting()
    }
}

/// Aggregated counters of the active transfers of one type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveTransferTotals {
    pub transfer_type: TransferType,
    pub total_transfers: u32,
    pub total_file_transfers: u32,
    pub paused_file_transfers: u32,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub total_finished_transfers: u32,
    pub total_finished_file_transfers: u32,
    pub total_completed_file_transfers: u32,
    pub total_already_transferred_files: u32,
    pub total_cancelled: u32,
    pub groups: Vec<ActiveTransferGroup>,
    /// Preview or background transfers that belong to no group
    pub ungrouped_non_counting: ActiveTransferGroup,
}

impl ActiveTransferTotals {
    pub fn empty(transfer_type: TransferType) -> Self {
        Self {
            transfer_type,
            total_transfers: 0,
            total_file_transfers: 0,
            paused_file_transfers: 0,
            total_bytes: 0,
            transferred_bytes: 0,
            total_finished_transfers: 0,
            total_finished_file_transfers: 0,
            total_completed_file_transfers: 0,
            total_already_transferred_files: 0,
            total_cancelled: 0,
            groups: Vec::new(),
            ungrouped_non_counting: ActiveTransferGroup::default(),
        }
    }

    /// Recompute totals from the active transfer records of `transfer_type`
    pub fn from_transfers(transfer_type: TransferType, transfers: &[ActiveTransfer]) -> Self {
        let mut totals = Self::empty(transfer_type);
        let mut groups: BTreeMap<i64, ActiveTransferGroup> = BTreeMap::new();

        for transfer in transfers
            .iter()
            .filter(|t| t.transfer_type == transfer_type)
        {
            totals.total_transfers += 1;
            if transfer.is_finished {
                totals.total_finished_transfers += 1;
            }
            if transfer.is_cancelled {
                totals.total_cancelled += 1;
            }
            // Folder records only carry scan state; bytes and files come from their children
            if transfer.is_folder {
                continue;
            }

            totals.total_file_transfers += 1;
            totals.total_bytes += transfer.total_bytes;
            totals.transferred_bytes += transfer.transferred_bytes;
            let completed = transfer.is_finished && !transfer.is_cancelled;
            if transfer.is_finished {
                totals.total_finished_file_transfers += 1;
            } else if transfer.is_paused {
                totals.paused_file_transfers += 1;
            }
            if completed {
                totals.total_completed_file_transfers += 1;
            }
            if transfer.is_already_transferred {
                totals.total_already_transferred_files += 1;
            }

            let group = match transfer.app_data.transfer_group() {
                Some(group_id) => groups.entry(group_id).or_insert_with(|| ActiveTransferGroup {
                    group_id,
                    app_data: transfer
                        .app_data
                        .iter()
                        .filter(|d| !matches!(d, AppData::TransferGroup { .. }))
                        .cloned()
                        .collect(),
                    ..Default::default()
                }),
                None if transfer.app_data.is_non_counting() => &mut totals.ungrouped_non_counting,
                None => continue,
            };
            group.total_files += 1;
            group.total_bytes += transfer.total_bytes;
            group.transferred_bytes += transfer.transferred_bytes;
            if transfer.is_finished {
                group.finished_files += 1;
            }
            if completed {
                group.completed_files += 1;
            }
            if transfer.is_already_transferred {
                group.already_transferred_files += 1;
            }
        }

        totals.groups = groups.into_values().collect();
        totals
    }

    pub fn pending_file_transfers(&self) -> u32 {
        self.total_file_transfers
            .saturating_sub(self.total_finished_file_transfers)
    }

    pub fn has_ongoing_transfers(&self) -> bool {
        self.total_transfers > 0
    }

    /// All unfinished file transfers are paused
    pub fn all_paused(&self) -> bool {
        let pending = self.pending_file_transfers();
        pending > 0 && self.paused_file_transfers >= pending
    }

    fn non_counting_groups(&self) -> impl Iterator<Item = &ActiveTransferGroup> {
        self.groups
            .iter()
            .filter(|g| g.is_non_counting())
            .chain(std::iter::once(&self.ungrouped_non_counting))
    }

    /// Total bytes excluding non-counting groups
    pub fn counting_total_bytes(&self) -> u64 {
        let excluded: u64 = self.non_counting_groups().map(|g| g.total_bytes).sum();
        self.total_bytes.saturating_sub(excluded)
    }

    /// Transferred bytes excluding non-counting groups
    pub fn counting_transferred_bytes(&self) -> u64 {
        let excluded: u64 = self.non_counting_groups().map(|g| g.transferred_bytes).sum();
        self.transferred_bytes.saturating_sub(excluded)
    }

    /// Pending files excluding non-counting groups
    pub fn counting_pending_files(&self) -> u32 {
        let excluded: u32 = self.non_counting_groups().map(|g| g.pending_files()).sum();
        self.pending_file_transfers().saturating_sub(excluded)
    }
}

/// Latest state of the ongoing transfers of one type
#[derive(Debug, Clone, PartialEq)]
pub struct OngoingTransfers {
    pub totals: ActiveTransferTotals,
    pub paused: bool,
    pub transfers_over_quota: bool,
    pub storage_over_quota: bool,
}

/// Account wide switches that affect every transfer type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferFlags {
    pub paused: bool,
    pub transfers_over_quota: bool,
    pub storage_over_quota: bool,
}

/// Combined status of every transfer type, ready for display
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransfersStatusInfo {
    pub total_size_to_transfer: u64,
    pub total_size_transferred: u64,
    pub pending_uploads: u32,
    pub pending_downloads: u32,
    pub paused: bool,
    pub transfers_over_quota: bool,
    pub storage_over_quota: bool,
}

impl TransfersStatusInfo {
    /// Fold the latest snapshot of each transfer type into one status
    pub fn aggregate<'a>(ongoing: impl IntoIterator<Item = &'a OngoingTransfers>) -> Self {
        let mut info = TransfersStatusInfo::default();
        let mut any_active = false;
        let mut all_active_paused = true;

        for entry in ongoing {
            let totals = &entry.totals;
            info.total_size_to_transfer += totals.counting_total_bytes();
            info.total_size_transferred += totals.counting_transferred_bytes();
            if totals.transfer_type.is_download() {
                info.pending_downloads += totals.counting_pending_files();
            } else {
                info.pending_uploads += totals.counting_pending_files();
            }
            if totals.has_ongoing_transfers() {
                any_active = true;
                all_active_paused &= entry.paused;
            }
            info.transfers_over_quota |= entry.transfers_over_quota;
            info.storage_over_quota |= entry.storage_over_quota;
        }

        info.paused = any_active && all_active_paused;
        info
    }
}
