//! Storage Error Types
//!
//! ## Error Categories
//!
//! ### Shard Errors
//! - `ShardNotFound`: a maintenance operation targeted a shard the catalog
//!   does not know (absence on the *read* path is not an error - it maps
//!   to an empty result at the query boundary)
//! - `InvalidShardName`: a name from outside the process failed validation
//!   before being spliced into SQL
//!
//! ### Guard Errors
//! - `ConfirmationRequired` / `InvalidRange`: range deletion rejected
//!   before touching anything
//!
//! ### Infrastructure
//! - `Database`, `Migration`, `Serialization`: passthrough from sqlx and
//!   serde_json
//!
//! Ingestion-path callers log these and drop the record; maintenance-path
//! callers fold them into per-item report entries.

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Shard not found: {0}")]
    ShardNotFound(String),

    #[error("Invalid shard name: {0}")]
    InvalidShardName(String),

    #[error("Range deletion requires the fixed confirmation token")]
    ConfirmationRequired,

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid archive state: {0}")]
    InvalidArchiveState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(e.to_string())
    }
}

impl From<logshard_core::Error> for StoreError {
    fn from(e: logshard_core::Error) -> Self {
        match e {
            logshard_core::Error::InvalidShardName(name) => StoreError::InvalidShardName(name),
        }
    }
}
