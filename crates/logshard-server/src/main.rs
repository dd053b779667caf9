//! Logshard Daemon Entry Point
//!
//! Wires the storage engine, the UDP ingestion listener, and the archival
//! schedule together. Configuration is environment variables only (see
//! [`logshard_server::config`]); logging follows `RUST_LOG`.
//!
//! ```bash
//! # Development defaults: ./data, UDP 4950, daily archival after 30 days
//! cargo run -p logshard-server
//!
//! # Production-ish
//! LOGSHARD_DB=/var/lib/logshard/logshard.db \
//! LOGSHARD_ARCHIVE_DIR=/var/lib/logshard/archives \
//! RUST_LOG=info cargo run -p logshard-server --release
//! ```

use std::sync::Arc;
use std::time::Duration;

use logshard_archive::Archiver;
use logshard_server::{ArchiveScheduler, IngestListener, IngestLiveness, ServerConfig};
use logshard_store::{LogStore, ShardManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("logshard starting");
    tracing::info!("  database: {}", config.db_path);
    tracing::info!("  syslog:   {}", config.syslog_addr);
    tracing::info!(
        "  archival: {} day retention, every {}s into {}",
        config.archive_age_days,
        config.archive_interval_secs,
        config.archive_dir
    );

    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.archive_dir)?;

    let store = Arc::new(LogStore::open(&config.db_path).await?);
    let shards = Arc::new(ShardManager::new(store.clone()));
    let liveness = Arc::new(IngestLiveness::new());

    let cold = Arc::new(object_store::local::LocalFileSystem::new_with_prefix(
        &config.archive_dir,
    )?);
    let archiver = Arc::new(Archiver::new(store.clone(), cold));

    let scheduler = ArchiveScheduler::new(
        archiver,
        Duration::from_secs(config.archive_interval_secs),
        config.archive_age_days,
    );
    let (scheduler_handle, scheduler_shutdown) = scheduler.start();

    let listener = IngestListener::bind(&config.syslog_addr, store, shards, liveness).await?;

    tokio::select! {
        _ = listener.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    let _ = scheduler_shutdown.send(());
    let _ = scheduler_handle.await;
    tracing::info!("logshard stopped");
    Ok(())
}
