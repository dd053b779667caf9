//! Core Error Types
//!
//! The only fallible operation at this layer is interpreting a shard name
//! that came from outside (the catalog, an operator, a cold-storage
//! listing). Parsing and shard *derivation* are total functions and never
//! appear here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid shard name: {0}")]
    InvalidShardName(String),
}
