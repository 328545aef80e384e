//! Transfer domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Kind of transfer as tracked by the SDK
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransferType {
    Download,
    GeneralUpload,
    ChatUpload,
    CameraUpload,
}

impl TransferType {
    /// Every transfer type, in the order monitors subscribe to them
    pub const ALL: [TransferType; 4] = [
        TransferType::Download,
        TransferType::GeneralUpload,
        TransferType::ChatUpload,
        TransferType::CameraUpload,
    ];

    pub fn is_download(&self) -> bool {
        matches!(self, TransferType::Download)
    }

    pub fn is_upload(&self) -> bool {
        !self.is_download()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferType::Download => "download",
            TransferType::GeneralUpload => "general_upload",
            TransferType::ChatUpload => "chat_upload",
            TransferType::CameraUpload => "camera_upload",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        TransferType::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Identifier of a node the SDK knows how to transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind")]
pub enum NodeId {
    CloudDrive { handle: u64 },
    FileLink { url: String },
    FolderLink { handle: u64 },
    ChatFile {
        chat_id: u64,
        message_id: u64,
        message_index: u32,
    },
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::CloudDrive { handle } => write!(f, "cloud:{handle}"),
            NodeId::FileLink { url } => write!(f, "link:{url}"),
            NodeId::FolderLink { handle } => write!(f, "folder-link:{handle}"),
            NodeId::ChatFile {
                chat_id,
                message_id,
                message_index,
            } => write!(f, "chat:{chat_id}/{message_id}/{message_index}"),
        }
    }
}

/// Resolved node ready to be handed to the SDK
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypedNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeKind {
    File { size: u64 },
    Folder,
}

impl TypedNode {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder)
    }

    pub fn size(&self) -> u64 {
        match self.kind {
            NodeKind::File { size } => size,
            NodeKind::Folder => 0,
        }
    }
}

/// Destination of a transfer - supports both filesystem paths and URIs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UriPath {
    Url(Url),      // content:// style URIs handed over by the platform
    Path(PathBuf), // regular filesystem paths
}

impl UriPath {
    /// Parse a user supplied destination, treating anything with a scheme as a URI
    pub fn parse(value: &str) -> Self {
        match Url::parse(value) {
            Ok(url) if url.scheme().len() > 1 && url.scheme() != "file" => UriPath::Url(url),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(UriPath::Path)
                .unwrap_or(UriPath::Url(url)),
            _ => UriPath::Path(PathBuf::from(value)),
        }
    }

    pub fn is_content_uri(&self) -> bool {
        matches!(self, UriPath::Url(url) if url.scheme() == "content")
    }

    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            UriPath::Path(path) => Some(path),
            UriPath::Url(_) => None,
        }
    }
}

impl fmt::Display for UriPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriPath::Url(url) => write!(f, "{url}"),
            UriPath::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Semantic markers attached to a transfer that alter its post-processing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum AppData {
    ChatUpload { pending_message_id: i64 },
    VoiceClip,
    CameraUpload,
    /// The SDK writes into `target_path`; the file is moved to `final_target_uri` afterwards
    SdCardDownload {
        target_path: String,
        final_target_uri: String,
    },
    PreviewDownload,
    OfflineDownload,
    BackgroundTransfer,
    TransferGroup { group_id: i64 },
    OriginalContentUri { uri: String },
}

impl AppData {
    /// Whether transfers carrying this marker stay out of user facing pending counts
    pub fn excludes_from_pending_counts(&self) -> bool {
        matches!(self, AppData::PreviewDownload | AppData::BackgroundTransfer)
    }
}

/// Helpers over a transfer's app data list
pub trait AppDataExt {
    fn is_preview_download(&self) -> bool;
    fn is_non_counting(&self) -> bool;
    fn transfer_group(&self) -> Option<i64>;
}

impl AppDataExt for [AppData] {
    fn is_preview_download(&self) -> bool {
        self.iter().any(|data| matches!(data, AppData::PreviewDownload))
    }

    fn is_non_counting(&self) -> bool {
        self.iter().any(AppData::excludes_from_pending_counts)
    }

    fn transfer_group(&self) -> Option<i64> {
        self.iter().find_map(|data| match data {
            AppData::TransferGroup { group_id } => Some(*group_id),
            _ => None,
        })
    }
}

/// Lifecycle of a pending transfer before the SDK owns it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PendingTransferState {
    NotSentToSdk,
    SdkScanning,
    SdkScanned,
    ErrorStarting,
}

impl PendingTransferState {
    /// States only move forward; `SdkScanned` and `ErrorStarting` are terminal
    pub fn can_transition_to(&self, next: PendingTransferState) -> bool {
        use PendingTransferState::*;
        matches!(
            (self, next),
            (NotSentToSdk, SdkScanning)
                | (NotSentToSdk, ErrorStarting)
                | (SdkScanning, SdkScanned)
                | (SdkScanning, ErrorStarting)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PendingTransferState::SdkScanned | PendingTransferState::ErrorStarting
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PendingTransferState::NotSentToSdk => "not_sent_to_sdk",
            PendingTransferState::SdkScanning => "sdk_scanning",
            PendingTransferState::SdkScanned => "sdk_scanned",
            PendingTransferState::ErrorStarting => "error_starting",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        use PendingTransferState::*;
        [NotSentToSdk, SdkScanning, SdkScanned, ErrorStarting]
            .into_iter()
            .find(|s| s.as_str() == value)
    }
}

/// A transfer requested by the user but not yet submitted to the SDK
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingTransfer {
    pub id: i64,
    pub transfer_type: TransferType,
    pub node_identifier: NodeId,
    pub uri_path: UriPath,
    pub app_data: Vec<AppData>,
    pub is_high_priority: bool,
    pub state: PendingTransferState,
    pub file_name: Option<String>,
    pub started_files: u32,
    pub already_transferred: u32,
}

impl PendingTransfer {
    pub fn is_preview_download(&self) -> bool {
        self.app_data.is_preview_download()
    }
}

/// Request to record a new pending transfer
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPendingTransferRequest {
    pub transfer_type: TransferType,
    pub node_identifier: NodeId,
    pub uri_path: UriPath,
    pub app_data: Vec<AppData>,
    pub is_high_priority: bool,
    pub file_name: Option<String>,
}

/// Snapshot of a transfer as reported by the SDK
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transfer {
    pub tag: i32,
    pub transfer_type: TransferType,
    pub file_name: String,
    pub local_path: String,
    pub node_handle: Option<u64>,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub is_finished: bool,
    pub is_folder: bool,
    pub is_paused: bool,
    pub is_already_transferred: bool,
    pub is_cancelled: bool,
    pub app_data: Vec<AppData>,
}

/// Stage reported while the SDK scans a folder transfer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransferStage {
    None,
    Scan,
    CreateTree,
    TransferringFiles,
}

/// Lifecycle events emitted by the SDK wrapper for one transfer
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Start {
        transfer: Transfer,
    },
    Update {
        transfer: Transfer,
    },
    Finish {
        transfer: Transfer,
        error: Option<String>,
    },
    FolderUpdate {
        transfer: Transfer,
        stage: TransferStage,
        folder_count: u64,
        created_folder_count: u64,
        file_count: u64,
    },
    TemporaryError {
        transfer: Transfer,
        error: String,
    },
    Pause {
        transfer: Transfer,
        paused: bool,
    },
}

impl TransferEvent {
    pub fn transfer(&self) -> &Transfer {
        match self {
            TransferEvent::Start { transfer }
            | TransferEvent::Update { transfer }
            | TransferEvent::Finish { transfer, .. }
            | TransferEvent::FolderUpdate { transfer, .. }
            | TransferEvent::TemporaryError { transfer, .. }
            | TransferEvent::Pause { transfer, .. } => transfer,
        }
    }
}

/// Active transfer record kept while the SDK tracks a transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveTransfer {
    pub tag: i32,
    pub transfer_type: TransferType,
    pub file_name: String,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub is_finished: bool,
    pub is_folder: bool,
    pub is_paused: bool,
    pub is_already_transferred: bool,
    pub is_cancelled: bool,
    pub app_data: Vec<AppData>,
}

impl From<&Transfer> for ActiveTransfer {
    fn from(transfer: &Transfer) -> Self {
        Self {
            tag: transfer.tag,
            transfer_type: transfer.transfer_type,
            file_name: transfer.file_name.clone(),
            total_bytes: transfer.total_bytes,
            transferred_bytes: transfer.transferred_bytes,
            is_finished: transfer.is_finished,
            is_folder: transfer.is_folder,
            is_paused: transfer.is_paused,
            is_already_transferred: transfer.is_already_transferred,
            is_cancelled: transfer.is_cancelled,
            app_data: transfer.app_data.clone(),
        }
    }
}

/// Final state of a transfer in the history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompletedTransferState {
    Completed,
    Failed,
    Cancelled,
}

impl CompletedTransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletedTransferState::Completed => "completed",
            CompletedTransferState::Failed => "failed",
            CompletedTransferState::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        use CompletedTransferState::*;
        [Completed, Failed, Cancelled]
            .into_iter()
            .find(|s| s.as_str() == value)
    }
}

/// Transfer history record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedTransfer {
    pub id: Option<i64>,
    pub file_name: String,
    pub transfer_type: TransferType,
    pub state: CompletedTransferState,
    pub size: u64,
    pub node_identifier: NodeId,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    pub app_data: Vec<AppData>,
}

impl CompletedTransfer {
    /// Build the failed history entry for a pending transfer that never reached the SDK
    pub fn from_failed_pending_transfer(
        pending: &PendingTransfer,
        size: u64,
        error: &str,
    ) -> Self {
        Self {
            id: None,
            file_name: pending
                .file_name
                .clone()
                .unwrap_or_else(|| pending.node_identifier.to_string()),
            transfer_type: pending.transfer_type,
            state: CompletedTransferState::Failed,
            size,
            node_identifier: pending.node_identifier.clone(),
            path: pending.uri_path.to_string(),
            timestamp: Utc::now(),
            error: Some(error.to_string()),
            app_data: pending.app_data.clone(),
        }
    }
}
