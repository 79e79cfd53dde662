//! Error types for the state store.

use thiserror::Error;

/// Errors that can occur while writing the persisted record.
///
/// Loading never fails; see [`crate::StateStore::load`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
