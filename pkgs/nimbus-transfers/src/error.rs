//! Error types for transfer operations

use thiserror::Error;

use crate::types::{NodeId, PendingTransferState};

/// Errors that can occur while orchestrating transfers
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Node does not exist: {0}")]
    NodeDoesNotExist(NodeId),
    #[error("No cache folder available for destination: {0}")]
    CacheFolderUnavailable(String),
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        from: PendingTransferState,
        to: PendingTransferState,
    },
    #[error("SDK error: {0}")]
    Sdk(String),
    #[error("Repository error: {0}")]
    Repository(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used across the transfer use-cases
pub type Result<T> = std::result::Result<T, TransferError>;
