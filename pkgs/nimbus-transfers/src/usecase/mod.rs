//! Transfer use-cases

pub mod destination;
pub mod pending;
pub mod start_downloads;
pub mod status;

pub use destination::{FileDestination, GetFileDestinationAndAppDataForDownload};
pub use pending::{
    AddCompletedTransferFromFailedPendingTransfer, AddPendingDownloads, DownloadNode,
    DownloadRequest, GetPendingTransfersByTypeAndState, GetTypedNodeFromPendingTransfer,
    InsertOrUpdateActiveTransfer, UpdatePendingTransferStartedCount, UpdatePendingTransferState,
};
pub use start_downloads::StartAllPendingDownloads;
pub use status::{MonitorOngoingActiveTransfers, MonitorTransfersStatus};
