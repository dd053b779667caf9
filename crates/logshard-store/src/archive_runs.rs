//! Persisted Archival State
//!
//! The archival job is a two-phase copy-then-delete; a crash between the
//! phases must be resumable without re-copying data that already landed in
//! cold storage. Each `(year, month)` group therefore persists its
//! position in the sequence here, in the same database the shards live in:
//!
//! ```text
//! Pending ──► Copied ──► MetadataWritten ──► Dropped
//! ```
//!
//! The archival crate walks this machine; this module only stores it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::error::{Result, StoreError};
use crate::store::LogStore;

/// Position of one month group in the archival sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveState {
    /// Nothing durable has happened yet.
    Pending,
    /// The compressed artifact is durably in cold storage.
    Copied,
    /// The metadata sidecar is written; shards may now be dropped.
    MetadataWritten,
    /// Constituent shards are gone; the run is complete.
    Dropped,
}

impl ArchiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveState::Pending => "pending",
            ArchiveState::Copied => "copied",
            ArchiveState::MetadataWritten => "metadata_written",
            ArchiveState::Dropped => "dropped",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ArchiveState::Pending),
            "copied" => Ok(ArchiveState::Copied),
            "metadata_written" => Ok(ArchiveState::MetadataWritten),
            "dropped" => Ok(ArchiveState::Dropped),
            other => Err(StoreError::InvalidArchiveState(other.to_string())),
        }
    }
}

/// One archival run: a month group and its progress.
#[derive(Debug, Clone)]
pub struct ArchiveRun {
    pub year: i32,
    pub month: u32,
    pub state: ArchiveState,
    pub artifact_path: Option<String>,
    pub shards: Vec<String>,
    pub total_rows: i64,
    pub original_size: i64,
    pub compressed_size: i64,
    pub updated_at: DateTime<Utc>,
}

impl ArchiveRun {
    pub fn new(year: i32, month: u32, shards: Vec<String>) -> Self {
        Self {
            year,
            month,
            state: ArchiveState::Pending,
            artifact_path: None,
            shards,
            total_rows: 0,
            original_size: 0,
            compressed_size: 0,
            updated_at: Utc::now(),
        }
    }
}

impl LogStore {
    /// Load the persisted run for a month group, if any.
    pub async fn archive_run(&self, year: i32, month: u32) -> Result<Option<ArchiveRun>> {
        let row = sqlx::query(
            "SELECT year, month, state, artifact_path, shards, total_rows, \
                    original_size, compressed_size, updated_at \
             FROM archive_runs WHERE year = ? AND month = ?",
        )
        .bind(year)
        .bind(month as i64)
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| {
            Ok(ArchiveRun {
                year: row.try_get("year")?,
                month: row.try_get::<i64, _>("month")? as u32,
                state: ArchiveState::parse(&row.try_get::<String, _>("state")?)?,
                artifact_path: row.try_get("artifact_path")?,
                shards: serde_json::from_str(&row.try_get::<String, _>("shards")?)?,
                total_rows: row.try_get("total_rows")?,
                original_size: row.try_get("original_size")?,
                compressed_size: row.try_get("compressed_size")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    /// Upsert a run, stamping `updated_at` with the write time.
    pub async fn save_archive_run(&self, run: &ArchiveRun) -> Result<()> {
        let shards = serde_json::to_string(&run.shards)?;
        sqlx::query(
            "INSERT INTO archive_runs \
             (year, month, state, artifact_path, shards, total_rows, original_size, compressed_size, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(year, month) DO UPDATE SET \
                 state = excluded.state, \
                 artifact_path = excluded.artifact_path, \
                 shards = excluded.shards, \
                 total_rows = excluded.total_rows, \
                 original_size = excluded.original_size, \
                 compressed_size = excluded.compressed_size, \
                 updated_at = excluded.updated_at",
        )
        .bind(run.year)
        .bind(run.month as i64)
        .bind(run.state.as_str())
        .bind(run.artifact_path.as_deref())
        .bind(shards)
        .bind(run.total_rows)
        .bind(run.original_size)
        .bind(run.compressed_size)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
