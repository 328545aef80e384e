//! Error types for push handling

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("Unknown push type: {0:?}")]
    UnknownPushType(Option<String>),
    #[error("Missing push field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for push field {field}: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("No stored credentials to log in with")]
    NoCredentials,
    #[error("Login failed: {0}")]
    Login(String),
    #[error("Chat engine is not initialized")]
    ChatNotInitialized,
    #[error("SDK error: {0}")]
    Sdk(String),
}

pub type Result<T> = std::result::Result<T, PushError>;
