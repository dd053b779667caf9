//! LogStore: SQLite-Backed Shard Storage
//!
//! The [`LogStore`] owns the connection pool and everything that touches a
//! shard table directly: inserts, full reads for archival, drops, and the
//! shard catalog. Higher-level policy (lifecycle caching, compaction,
//! deletion, queries) lives in sibling modules as further `impl LogStore`
//! blocks.
//!
//! ## Connection Pool
//!
//! - File-backed stores run WAL mode with a small pool, shared across
//!   async tasks via `Arc<LogStore>`
//! - In-memory stores pin the pool to a single connection - each SQLite
//!   `:memory:` connection is its own database, so a wider pool would
//!   scatter tables across invisible siblings
//!
//! ## Identifier Safety
//!
//! Shard names are spliced into SQL as identifiers (SQLite cannot bind
//! table names), so every name that did not come straight out of
//! [`logshard_core::shard_id`] is validated against the strict
//! `logs_YYYYMMDD` shape first.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;

use logshard_core::record::UNKNOWN_PROTOCOL;
use logshard_core::{LogRecord, NewLogRecord};

use crate::error::{Result, StoreError};

/// Physical layout of a shard table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    /// Legacy layout, produced by engine versions that created tables
    /// without the rebuild step.
    Standard,
    /// Space-optimized layout: rebuilt in id order with freed pages
    /// reclaimed. New shards start here.
    Compact,
}

impl StorageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageFormat::Standard => "standard",
            StorageFormat::Compact => "compact",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(StorageFormat::Standard),
            "compact" => Ok(StorageFormat::Compact),
            other => Err(StoreError::Migration(format!(
                "unknown storage format {other:?} in shard catalog"
            ))),
        }
    }
}

/// One row of the shard catalog.
#[derive(Debug, Clone)]
pub struct ShardCatalogEntry {
    pub shard: String,
    pub schema_version: i32,
    pub storage_format: StorageFormat,
    pub created_at: DateTime<Utc>,
}

/// The storage engine handle. Cheap to share via `Arc`.
pub struct LogStore {
    pool: SqlitePool,
}

impl LogStore {
    /// Open (or create) a file-backed store and run catalog migrations.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", path.as_ref().display()))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// In-memory store for tests. Single connection: see module docs.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Direct pool access, for callers that need raw SQL (tests, mostly).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================================================================
    // SHARD CATALOG
    // ========================================================================

    /// Look up a shard's catalog entry, `None` when the shard is unknown.
    pub async fn catalog_entry(&self, shard: &str) -> Result<Option<ShardCatalogEntry>> {
        let row = sqlx::query(
            "SELECT shard, schema_version, storage_format, created_at \
             FROM shard_catalog WHERE shard = ?",
        )
        .bind(shard)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(ShardCatalogEntry {
                shard: row.try_get("shard")?,
                schema_version: row.try_get("schema_version")?,
                storage_format: StorageFormat::parse(&row.try_get::<String, _>("storage_format")?)?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    /// All known shards, ascending by name (and therefore by date).
    pub async fn list_shards(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT shard FROM shard_catalog ORDER BY shard")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| row.try_get("shard").map_err(StoreError::from))
            .collect()
    }

    /// True when the shard is present in the catalog.
    pub async fn shard_exists(&self, shard: &str) -> Result<bool> {
        Ok(self.catalog_entry(shard).await?.is_some())
    }

    // ========================================================================
    // ROW STORAGE
    // ========================================================================

    /// Append one record to a shard, returning the assigned shard-local id.
    ///
    /// The shard must already be current-schema - callers go through
    /// [`crate::ShardManager::ensure_shard`] first.
    pub async fn insert_record(&self, shard: &str, record: &NewLogRecord) -> Result<i64> {
        let shard = checked_shard(shard)?;
        let sql = format!(
            "INSERT INTO \"{shard}\" \
             (timestamp, source_ip, source_port, dest_ip, dest_port, protocol, user, message, received_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );

        let result = sqlx::query(&sql)
            .bind(record.timestamp)
            .bind(record.source_ip.as_deref())
            .bind(record.source_port.map(i64::from))
            .bind(record.dest_ip.as_deref())
            .bind(record.dest_port.map(i64::from))
            .bind(record.protocol.as_str())
            .bind(record.user.as_deref())
            .bind(record.message.as_str())
            .bind(record.received_at)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Every record of a shard, ascending by id. Used by the archival copy
    /// phase, which needs a deterministic full scan.
    pub async fn read_all_records(&self, shard: &str) -> Result<Vec<LogRecord>> {
        let shard = checked_shard(shard)?;
        let sql = format!("SELECT * FROM \"{shard}\" ORDER BY id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Row count of a shard table.
    pub async fn shard_row_count(&self, shard: &str) -> Result<i64> {
        let shard = checked_shard(shard)?;
        let sql = format!("SELECT COUNT(*) FROM \"{shard}\"");
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }

    /// Drop a shard: table and catalog row together.
    pub async fn drop_shard(&self, shard: &str) -> Result<()> {
        let shard = checked_shard(shard)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS \"{shard}\""))
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM shard_catalog WHERE shard = ?")
            .bind(shard)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Total database file size in bytes, from the page counters.
    pub(crate) async fn database_size(&self) -> Result<u64> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await?;
        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await?;
        Ok((page_count as u64) * (page_size as u64))
    }
}

/// Validate a name before splicing it into SQL as an identifier.
pub(crate) fn checked_shard(shard: &str) -> Result<&str> {
    if logshard_core::shard::is_shard_name(shard) {
        Ok(shard)
    } else {
        Err(StoreError::InvalidShardName(shard.to_string()))
    }
}

/// Map a shard row to a [`LogRecord`].
pub(crate) fn record_from_row(row: &SqliteRow) -> Result<LogRecord> {
    Ok(LogRecord {
        id: row.try_get("id")?,
        timestamp: row.try_get("timestamp")?,
        source_ip: row.try_get("source_ip")?,
        source_port: port_from(row.try_get("source_port")?),
        dest_ip: row.try_get("dest_ip")?,
        dest_port: port_from(row.try_get("dest_port")?),
        protocol: row
            .try_get::<Option<String>, _>("protocol")?
            .unwrap_or_else(|| UNKNOWN_PROTOCOL.to_string()),
        user: row.try_get("user")?,
        message: row
            .try_get::<Option<String>, _>("message")?
            .unwrap_or_default(),
        received_at: row.try_get("received_at")?,
    })
}

fn port_from(value: Option<i64>) -> Option<u16> {
    value.and_then(|v| u16::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShardManager;
    use logshard_core::parse;
    use std::sync::Arc;

    async fn store_with_shard(shard: &str) -> Arc<LogStore> {
        let store = Arc::new(LogStore::open_in_memory().await.unwrap());
        let manager = ShardManager::new(store.clone());
        manager.ensure_shard(shard).await.unwrap();
        store
    }

    fn sample_record(message: &str) -> NewLogRecord {
        NewLogRecord::from_parsed(parse(message), Utc::now())
    }

    #[tokio::test]
    async fn insert_assigns_monotonic_ids() {
        let store = store_with_shard("logs_20240101").await;
        let a = store
            .insert_record("logs_20240101", &sample_record("first"))
            .await
            .unwrap();
        let b = store
            .insert_record("logs_20240101", &sample_record("second"))
            .await
            .unwrap();
        assert!(b > a);
        assert_eq!(store.shard_row_count("logs_20240101").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn read_all_roundtrips_fields() {
        let store = store_with_shard("logs_20240101").await;
        let rec = sample_record(
            "in:<pppoe-alice> proto TCP (SYN), 192.168.88.10:5432->1.1.1.1:80, len 60",
        );
        store.insert_record("logs_20240101", &rec).await.unwrap();

        let rows = store.read_all_records("logs_20240101").await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.source_ip.as_deref(), Some("192.168.88.10"));
        assert_eq!(row.source_port, Some(5432));
        assert_eq!(row.dest_ip.as_deref(), Some("1.1.1.1"));
        assert_eq!(row.dest_port, Some(80));
        assert_eq!(row.protocol, "TCP");
        assert_eq!(row.user.as_deref(), Some("alice"));
        assert_eq!(row.message, rec.message);
    }

    #[tokio::test]
    async fn drop_shard_removes_table_and_catalog_row() {
        let store = store_with_shard("logs_20240101").await;
        store.drop_shard("logs_20240101").await.unwrap();
        assert!(!store.shard_exists("logs_20240101").await.unwrap());
        assert!(store.read_all_records("logs_20240101").await.is_err());
    }

    #[tokio::test]
    async fn invalid_shard_names_are_rejected() {
        let store = Arc::new(LogStore::open_in_memory().await.unwrap());
        let err = store
            .read_all_records("logs_20240101; DROP TABLE shard_catalog")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidShardName(_)));
    }
}
