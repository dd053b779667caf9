//! Logshard Storage Engine
//!
//! This crate implements the time-sharded storage layer: one SQLite table
//! per calendar day of log records, plus the catalog that tracks every
//! shard's schema version and storage format.
//!
//! ## What Does This Do?
//!
//! - **Shard lifecycle**: lazily creates a day's table on first write,
//!   applies additive schema migrations, and caches existence so the hot
//!   ingestion path skips the catalog round trip
//! - **Row storage**: append-only inserts with shard-local monotonic ids
//! - **Reads**: per-day queries with substring filtering and offset
//!   pagination, plus per-day aggregate statistics
//! - **Compaction**: rebuilds a legacy shard into the space-optimized
//!   layout and reclaims file space
//! - **Retention**: operator-confirmed range deletion of shards
//!
//! ## Why SQLite?
//!
//! The engine runs embedded in the ingestion daemon:
//! - **Zero configuration**: no separate database server to supervise
//! - **ACID transactions**: shard rebuilds and drops stay atomic
//! - **WAL mode**: concurrent readers while the listener writes
//! - **In-memory databases**: fast, isolated tests
//!
//! ## Shard Layout
//!
//! ```text
//! shard_catalog            logs_20240101          logs_20240102
//! ┌───────────────────┐    ┌───────────────┐      ┌───────────────┐
//! │ shard             │    │ id (PK, auto) │      │ id (PK, auto) │
//! │ schema_version    │    │ timestamp     │      │ timestamp     │
//! │ storage_format    │    │ source_ip ... │      │ source_ip ... │
//! │ created_at        │    │ user          │      │ user          │
//! └───────────────────┘    │ message       │      │ message       │
//!         ▲                │ received_at   │      │ received_at   │
//!         │ one row each   └───────────────┘      └───────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! [`LogStore`] is `Send + Sync` and is shared as `Arc<LogStore>`; the
//! SQLx pool handles concurrent access. [`ShardManager`] layers the
//! existence cache on top and serializes first-time creation so a burst of
//! writers at midnight performs exactly one underlying create.

pub mod archive_runs;
pub mod compact;
pub mod delete;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod store;

pub use archive_runs::{ArchiveRun, ArchiveState};
pub use compact::{CompactionEntry, CompactionOutcome, CompactionReport, CompactionStatus, SizeDelta};
pub use delete::{DeleteEntry, DeleteReport, DeleteStatus, DELETE_CONFIRMATION};
pub use error::{Result, StoreError};
pub use lifecycle::{ShardManager, SHARD_SCHEMA_VERSION};
pub use query::{CountEntry, DayStats, QueryFilter};
pub use store::{LogStore, ShardCatalogEntry, StorageFormat};
