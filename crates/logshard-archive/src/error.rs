//! Archival Error Types
//!
//! Everything here is surfaced to the operator through the per-month
//! report entries; the pipeline itself never aborts a run because one
//! month failed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Storage error: {0}")]
    Store(#[from] logshard_store::StoreError),

    #[error("Cold storage error: {0}")]
    ColdStorage(#[from] object_store::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Shard error: {0}")]
    Shard(#[from] logshard_core::Error),
}
