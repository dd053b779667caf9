//! Logshard Archival Pipeline
//!
//! Primary storage only stays bounded because old shards eventually leave
//! it. This crate moves them: every shard older than the retention cutoff
//! is serialized with its month-mates into one compressed JSON artifact in
//! cold storage, described by a human-readable metadata sidecar, and only
//! then dropped from the database.
//!
//! ## Two-Phase Commit
//!
//! The ordering is copy-then-delete, never the reverse:
//!
//! ```text
//! Pending ──copy artifact──► Copied ──write sidecar──► MetadataWritten ──drop shards──► Dropped
//! ```
//!
//! The state is persisted per month group (in the same database the shards
//! live in), so a crash anywhere in the sequence resumes where it stopped -
//! an artifact that already landed in cold storage is never copied twice.
//! A failure in one month group aborts only that group; sibling months
//! archive independently.
//!
//! ## Cold-Storage Layout
//!
//! One prefix per `(year, month)`:
//!
//! ```text
//! 2024/01/logs_202401.json.gz   all of January's rows, gzip level 9
//! 2024/01/metadata.json         ArchiveMetadata sidecar
//! 2024/02/...
//! ```
//!
//! The store behind that layout is an [`object_store::ObjectStore`]: a
//! local directory in the default deployment, a bucket when the archives
//! should leave the box, an in-memory store in tests.

pub mod archiver;
pub mod error;
pub mod metadata;

pub use archiver::{ArchiveReport, Archiver, MonthEntry, MonthStatus};
pub use error::{ArchiveError, Result};
pub use metadata::{artifact_path, metadata_path, ArchiveMetadata};
