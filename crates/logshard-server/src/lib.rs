//! Logshard Ingestion Daemon
//!
//! The always-on process: a UDP listener feeding the storage engine, a
//! liveness signal for the status endpoint, and the recurring archival
//! schedule. The HTTP reporting surface is an external collaborator; it
//! consumes the store's read API and this crate's [`IngestLiveness`], and
//! contributes nothing to the storage engine itself.
//!
//! ## Scheduling Model
//!
//! One receiver task owns the socket and does nothing but accept
//! datagrams; each datagram is handed to its own spawned task for
//! parse -> ensure-shard -> insert, so a storage stall blocks that one
//! record, never the feed.

pub mod config;
pub mod listener;
pub mod liveness;
pub mod scheduler;

pub use config::ServerConfig;
pub use listener::IngestListener;
pub use liveness::IngestLiveness;
pub use scheduler::ArchiveScheduler;
