//! Shard Compaction
//!
//! Legacy shards (created before tables were born in the optimized layout)
//! can be converted in place: the table is rebuilt in id order inside one
//! transaction, the catalog's storage format flips to `compact`, and a
//! `VACUUM` afterwards returns the freed pages to the filesystem. Row
//! content and count are untouched.
//!
//! A shard already in the optimized layout is a reported no-op, not an
//! error - batch runs over the whole catalog hit mostly no-ops and that is
//! the healthy state.
//!
//! Per-shard failures are isolated: one failing shard produces a `failed`
//! entry in the batch report and the run moves on.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::lifecycle::{apply_shard_migrations, render_sql, SHARD_MIGRATIONS, SHARD_SCHEMA_VERSION};
use crate::store::{checked_shard, LogStore, StorageFormat};

/// Database size before and after a compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeDelta {
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl SizeDelta {
    pub fn bytes_saved(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Result of compacting a single shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionOutcome {
    Compacted(SizeDelta),
    /// The shard was already in the optimized layout.
    AlreadyCompacted,
}

/// Per-shard line of a batch compaction report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompactionStatus {
    Compacted { bytes_before: u64, bytes_after: u64 },
    AlreadyCompacted,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CompactionEntry {
    pub shard: String,
    #[serde(flatten)]
    pub status: CompactionStatus,
}

/// Structured report of a batch compaction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompactionReport {
    pub entries: Vec<CompactionEntry>,
}

impl CompactionReport {
    pub fn compacted(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, CompactionStatus::Compacted { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, CompactionStatus::Failed { .. }))
            .count()
    }
}

impl LogStore {
    /// Convert one shard to the space-optimized layout.
    ///
    /// Brings the shard's schema current first (the rebuild writes the
    /// canonical column set), then rebuilds and reclaims. No-op for a
    /// shard already in the optimized layout.
    pub async fn compact_shard(&self, shard: &str) -> Result<CompactionOutcome> {
        let shard = checked_shard(shard)?;
        let entry = self
            .catalog_entry(shard)
            .await?
            .ok_or_else(|| StoreError::ShardNotFound(shard.to_string()))?;

        if entry.storage_format == StorageFormat::Compact {
            return Ok(CompactionOutcome::AlreadyCompacted);
        }

        if entry.schema_version < SHARD_SCHEMA_VERSION {
            apply_shard_migrations(self.pool(), shard, entry.schema_version).await?;
        }

        let bytes_before = self.database_size().await?;
        self.rebuild_shard(shard).await?;

        // VACUUM cannot run inside a transaction; freed pages are returned
        // to the filesystem here.
        sqlx::query("VACUUM").execute(self.pool()).await?;
        let bytes_after = self.database_size().await?;

        let delta = SizeDelta {
            bytes_before,
            bytes_after,
        };
        info!(
            "compacted shard {}: {} -> {} bytes ({} saved)",
            shard,
            delta.bytes_before,
            delta.bytes_after,
            delta.bytes_saved()
        );
        Ok(CompactionOutcome::Compacted(delta))
    }

    /// Compact every shard in the catalog, oldest first. One failing shard
    /// never aborts the run.
    pub async fn compact_all(&self) -> Result<CompactionReport> {
        let mut report = CompactionReport::default();
        for shard in self.list_shards().await? {
            let status = match self.compact_shard(&shard).await {
                Ok(CompactionOutcome::Compacted(delta)) => CompactionStatus::Compacted {
                    bytes_before: delta.bytes_before,
                    bytes_after: delta.bytes_after,
                },
                Ok(CompactionOutcome::AlreadyCompacted) => CompactionStatus::AlreadyCompacted,
                Err(e) => {
                    warn!("compaction of shard {} failed: {}", shard, e);
                    CompactionStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.entries.push(CompactionEntry { shard, status });
        }
        Ok(report)
    }

    /// Rebuild a shard table in id order under a fresh canonical schema.
    async fn rebuild_shard(&self, shard: &str) -> Result<()> {
        let rebuild = format!("{shard}__rebuild");
        let mut tx = self.pool().begin().await?;

        // A crashed earlier rebuild may have left the scratch table behind.
        sqlx::query(&format!("DROP TABLE IF EXISTS \"{rebuild}\""))
            .execute(&mut *tx)
            .await?;

        // Shape the scratch table with the same migration statements that
        // shape live shards, so the two can never drift.
        for migration in SHARD_MIGRATIONS {
            for stmt in migration.table_sql {
                sqlx::query(&render_sql(stmt, &rebuild))
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let columns = "id, timestamp, source_ip, source_port, dest_ip, dest_port, \
                       protocol, user, message, received_at";
        sqlx::query(&format!(
            "INSERT INTO \"{rebuild}\" ({columns}) \
             SELECT {columns} FROM \"{shard}\" ORDER BY id"
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!("DROP TABLE \"{shard}\""))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("ALTER TABLE \"{rebuild}\" RENAME TO \"{shard}\""))
            .execute(&mut *tx)
            .await?;

        // Indexes went down with the old table; recreate them under the
        // final name.
        for migration in SHARD_MIGRATIONS {
            for stmt in migration.index_sql {
                sqlx::query(&render_sql(stmt, shard))
                    .execute(&mut *tx)
                    .await?;
            }
        }

        // Flip the format in the same transaction: the catalog never
        // claims compact for a table that was not rebuilt.
        sqlx::query("UPDATE shard_catalog SET storage_format = ? WHERE shard = ?")
            .bind(StorageFormat::Compact.as_str())
            .bind(shard)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShardManager;
    use chrono::Utc;
    use logshard_core::{parse, NewLogRecord};
    use std::sync::Arc;

    /// Build a v1-era shard in the legacy format with a few rows.
    async fn legacy_shard(store: &LogStore, shard: &str, rows: usize) {
        sqlx::query(&render_sql(SHARD_MIGRATIONS[0].table_sql[0], shard))
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO shard_catalog (shard, schema_version, storage_format, created_at) \
             VALUES (?, 1, 'standard', ?)",
        )
        .bind(shard)
        .bind(Utc::now())
        .execute(store.pool())
        .await
        .unwrap();
        for i in 0..rows {
            sqlx::query(&format!(
                "INSERT INTO \"{shard}\" (timestamp, protocol, message, received_at) \
                 VALUES (?, 'TCP', ?, ?)"
            ))
            .bind(Utc::now())
            .bind(format!("legacy row {i}"))
            .bind(Utc::now())
            .execute(store.pool())
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn compacting_legacy_shard_preserves_rows_and_ids() {
        let store = LogStore::open_in_memory().await.unwrap();
        legacy_shard(&store, "logs_20230101", 5).await;

        let outcome = store.compact_shard("logs_20230101").await.unwrap();
        assert!(matches!(outcome, CompactionOutcome::Compacted(_)));

        let entry = store
            .catalog_entry("logs_20230101")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.storage_format, StorageFormat::Compact);
        assert_eq!(entry.schema_version, SHARD_SCHEMA_VERSION);

        let rows = store.read_all_records("logs_20230101").await.unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[4].id, 5);
        assert_eq!(rows[2].message, "legacy row 2");
    }

    #[tokio::test]
    async fn compacting_twice_is_a_reported_noop() {
        let store = LogStore::open_in_memory().await.unwrap();
        legacy_shard(&store, "logs_20230101", 3).await;

        store.compact_shard("logs_20230101").await.unwrap();
        let outcome = store.compact_shard("logs_20230101").await.unwrap();
        assert_eq!(outcome, CompactionOutcome::AlreadyCompacted);
        assert_eq!(store.shard_row_count("logs_20230101").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn new_shards_are_born_compact() {
        let store = Arc::new(LogStore::open_in_memory().await.unwrap());
        let manager = ShardManager::new(store.clone());
        manager.ensure_shard("logs_20240101").await.unwrap();

        let outcome = store.compact_shard("logs_20240101").await.unwrap();
        assert_eq!(outcome, CompactionOutcome::AlreadyCompacted);
    }

    #[tokio::test]
    async fn unknown_shard_is_an_error() {
        let store = LogStore::open_in_memory().await.unwrap();
        let err = store.compact_shard("logs_20240101").await.unwrap_err();
        assert!(matches!(err, StoreError::ShardNotFound(_)));
    }

    #[tokio::test]
    async fn batch_isolates_per_shard_failures() {
        let store = Arc::new(LogStore::open_in_memory().await.unwrap());
        let manager = ShardManager::new(store.clone());
        manager.ensure_shard("logs_20240101").await.unwrap();
        legacy_shard(&store, "logs_20230101", 2).await;

        // A catalog row whose table is gone: rebuild will fail for it.
        sqlx::query(
            "INSERT INTO shard_catalog (shard, schema_version, storage_format, created_at) \
             VALUES ('logs_20230615', 2, 'standard', ?)",
        )
        .bind(Utc::now())
        .execute(store.pool())
        .await
        .unwrap();

        let rec = NewLogRecord::from_parsed(parse("proto TCP x"), Utc::now());
        store.insert_record("logs_20240101", &rec).await.unwrap();

        let report = store.compact_all().await.unwrap();
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.compacted(), 1);
        assert_eq!(report.failed(), 1);

        // The healthy shards were untouched by the sick one.
        assert_eq!(store.shard_row_count("logs_20230101").await.unwrap(), 2);
        assert_eq!(store.shard_row_count("logs_20240101").await.unwrap(), 1);
    }
}
