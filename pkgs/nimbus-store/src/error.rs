//! Error types for the transfer store

use nimbus_transfers::TransferError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid value '{value}' in column {column}")]
    InvalidValue { column: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub(crate) fn invalid(column: &'static str, value: impl Into<String>) -> Self {
        StoreError::InvalidValue {
            column,
            value: value.into(),
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(err) => TransferError::Serialization(err),
            other => TransferError::Repository(other.to_string()),
        }
    }
}
