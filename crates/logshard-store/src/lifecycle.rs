//! Shard Lifecycle Manager
//!
//! Every ingested record needs its day's table to exist and be
//! schema-current before the insert. Doing a catalog round trip per record
//! would dominate ingestion latency under load, so the manager keeps an
//! in-process existence cache and only walks the slow path the first time
//! a shard is seen in this run.
//!
//! ## Create-Once Guarantee
//!
//! At midnight every concurrent ingestion task races to create the new
//! day's shard. The guarantee that exactly one underlying creation happens
//! is structural, not timing luck:
//!
//! 1. fast path: read lock on the cache, hit returns immediately
//! 2. slow path: a single async mutex serializes check/create/migrate
//! 3. the cache entry is inserted only after the sequence fully succeeds
//!
//! The storage layer stays idempotent on its own (`CREATE TABLE IF NOT
//! EXISTS`, version-gated migrations), so even a second process racing on
//! the same database file cannot turn the race into a fatal error.
//!
//! ## Versioned Migrations
//!
//! Each shard records its applied schema version in the catalog;
//! `ensure_shard` applies only the missing migrations, in order. There is
//! no "try ALTER and ignore the failure" control flow - the one tolerated
//! storage-level condition is a duplicate-column report from a concurrent
//! external migrator, which is additive-schema by definition and treated
//! as already applied.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{checked_shard, LogStore, StorageFormat};

/// Current canonical shard schema version.
pub const SHARD_SCHEMA_VERSION: i32 = 2;

pub(crate) struct ShardMigration {
    pub version: i32,
    /// Statements shaping the table itself. Applied to rebuild targets too.
    pub table_sql: &'static [&'static str],
    /// Index statements, named after the final table.
    pub index_sql: &'static [&'static str],
}

/// Ordered, additive shard migrations. `{shard}` is substituted with the
/// table name.
pub(crate) const SHARD_MIGRATIONS: &[ShardMigration] = &[
    ShardMigration {
        version: 1,
        table_sql: &[r#"CREATE TABLE IF NOT EXISTS "{shard}" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            source_ip TEXT,
            source_port INTEGER,
            dest_ip TEXT,
            dest_port INTEGER,
            protocol TEXT,
            message TEXT NOT NULL,
            received_at TEXT NOT NULL
        )"#],
        index_sql: &[
            r#"CREATE INDEX IF NOT EXISTS "idx_{shard}_timestamp" ON "{shard}" (timestamp)"#,
        ],
    },
    ShardMigration {
        version: 2,
        table_sql: &[r#"ALTER TABLE "{shard}" ADD COLUMN user TEXT"#],
        index_sql: &[r#"CREATE INDEX IF NOT EXISTS "idx_{shard}_user" ON "{shard}" (user)"#],
    },
];

pub(crate) fn render_sql(template: &str, shard: &str) -> String {
    template.replace("{shard}", shard)
}

/// Apply every migration newer than `from_version` to a shard, bumping the
/// catalog version as each one lands.
pub(crate) async fn apply_shard_migrations(
    pool: &SqlitePool,
    shard: &str,
    from_version: i32,
) -> Result<()> {
    for migration in SHARD_MIGRATIONS
        .iter()
        .filter(|m| m.version > from_version)
    {
        let mut tx = pool.begin().await?;
        for stmt in migration.table_sql.iter().chain(migration.index_sql) {
            let sql = render_sql(stmt, shard);
            if let Err(e) = sqlx::query(&sql).execute(&mut *tx).await {
                if is_duplicate_column(&e) {
                    debug!(
                        "shard {} migration v{}: column already present, skipping",
                        shard, migration.version
                    );
                    continue;
                }
                return Err(e.into());
            }
        }
        sqlx::query(
            "INSERT INTO shard_catalog (shard, schema_version, storage_format, created_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(shard) DO UPDATE SET schema_version = excluded.schema_version",
        )
        .bind(shard)
        .bind(migration.version)
        .bind(StorageFormat::Compact.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
    }
    Ok(())
}

fn is_duplicate_column(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.message().contains("duplicate column name"))
}

/// Lifecycle manager: existence cache in front of the shard catalog.
///
/// Exclusively owns shard creation and schema migration; see module docs
/// for the create-once guarantee.
pub struct ShardManager {
    store: Arc<LogStore>,
    /// Shards confirmed current-schema during this run.
    known: RwLock<HashSet<String>>,
    /// Serializes the check/create/migrate slow path.
    create_lock: Mutex<()>,
}

impl ShardManager {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self {
            store,
            known: RwLock::new(HashSet::new()),
            create_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }

    /// Make sure a shard exists at the current schema version.
    ///
    /// Idempotent and safe to call concurrently and repeatedly for the
    /// same id. Errors are returned, not swallowed - the ingestion caller
    /// decides to drop the record and keep the feed alive.
    pub async fn ensure_shard(&self, shard: &str) -> Result<()> {
        if self.known.read().await.contains(shard) {
            return Ok(());
        }

        let shard = checked_shard(shard)?;
        let _guard = self.create_lock.lock().await;

        // A racing task may have finished the slow path while this one
        // waited on the lock.
        if self.known.read().await.contains(shard) {
            return Ok(());
        }

        let current = self
            .store
            .catalog_entry(shard)
            .await?
            .map(|e| e.schema_version)
            .unwrap_or(0);

        if current < SHARD_SCHEMA_VERSION {
            apply_shard_migrations(self.store.pool(), shard, current).await?;
            if current == 0 {
                info!("created shard {}", shard);
            } else {
                info!(
                    "migrated shard {} from v{} to v{}",
                    shard, current, SHARD_SCHEMA_VERSION
                );
            }
        }

        self.known.write().await.insert(shard.to_string());
        Ok(())
    }
}
