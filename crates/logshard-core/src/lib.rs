//! Logshard Core Types
//!
//! This crate holds the pure, storage-independent pieces of logshard - the
//! parts every other crate agrees on:
//!
//! 1. **LogRecord**: the structured form of one ingested connection-log event
//! 2. **Parser**: best-effort extraction of traffic fields from free-text
//!    router messages
//! 3. **Shard Resolver**: the one and only mapping from a timestamp to the
//!    per-day shard (table) that stores it
//!
//! ## Why a Separate Crate?
//!
//! Every component in the pipeline - the UDP listener, the storage engine,
//! the archival job, the deletion job - must derive shard names and compare
//! them *identically*. Two slightly different implementations of
//! `shard_id()` would silently send ingestion and archival to different
//! tables, which is why the resolver lives here exactly once and everything
//! else depends on it.
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────────┐   raw text    ┌──────────┐  ParsedLog   ┌──────────────┐
//! │ UDP message │ ────────────► │  parser  │ ───────────► │ NewLogRecord │
//! └─────────────┘               └──────────┘              └──────┬───────┘
//!                                                                │ insert
//!                               ┌──────────┐   shard name        ▼
//!                               │  shard   │ ────────────► logs_YYYYMMDD
//!                               │ resolver │
//!                               └──────────┘
//! ```

pub mod error;
pub mod parser;
pub mod record;
pub mod shard;

pub use error::{Error, Result};
pub use parser::{parse, ParsedLog, MAX_MESSAGE_BYTES};
pub use record::{LogRecord, NewLogRecord};
pub use shard::{
    shard_date, shard_for, shard_id, shard_is_older_than, shard_year_month, SHARD_PREFIX,
};
