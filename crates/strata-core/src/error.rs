use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Write conflict on '{model}' id {id}: row changed since it was read")]
    Conflict { model: String, id: String },

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StrataError>;

// Custom Error Types:
//
// Strata supports custom error types through the `#[from] anyhow::Error`
// variant. Any error implementing `std::error::Error + Send + Sync + 'static`
// can be converted to `StrataError::Other`.
//
// For better control, implement `From<YourError> for StrataError` directly.
