use crate::storage::StorageError;
use thiserror::Error;

/// Top-level error type surfaced to record producers.
///
/// Delivery failures and timeouts never show up here; they are absorbed by the
/// storage and failover collaborators.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
