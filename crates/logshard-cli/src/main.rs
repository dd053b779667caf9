//! Logshard Operator CLI
//!
//! On-demand administrative triggers against a logshard database: the
//! archival run, shard compaction, confirmed range deletion, and quick
//! read access for spot checks. Every maintenance command prints the
//! job's structured per-item report as JSON, so it can feed a pipeline or
//! an operator's eyeballs alike.
//!
//! ```bash
//! logshard --db ./data/logshard.db archive --max-age-days 30 --archive-dir ./data/archives
//! logshard --db ./data/logshard.db compact                  # whole catalog
//! logshard --db ./data/logshard.db compact logs_20240101    # one shard
//! logshard --db ./data/logshard.db delete-range 2024-01-10 2024-01-12 --confirm DELETE-SHARDS
//! logshard --db ./data/logshard.db query --date 2024-03-15 --search 8.8.8.8
//! logshard --db ./data/logshard.db stats
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use logshard_archive::Archiver;
use logshard_store::{CompactionOutcome, LogStore, QueryFilter};

#[derive(Parser)]
#[command(name = "logshard", about = "Operator tool for the logshard storage engine")]
struct Cli {
    /// SQLite database path.
    #[arg(long, env = "LOGSHARD_DB", default_value = "./data/logshard.db")]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Archive shards older than the retention window into cold storage.
    Archive {
        #[arg(long, env = "LOGSHARD_ARCHIVE_AGE_DAYS", default_value_t = 30)]
        max_age_days: u32,
        #[arg(long, env = "LOGSHARD_ARCHIVE_DIR", default_value = "./data/archives")]
        archive_dir: String,
    },

    /// Compact one shard, or the whole catalog when no shard is given.
    Compact { shard: Option<String> },

    /// Drop every shard in an inclusive date range. Irreversible.
    DeleteRange {
        start: NaiveDate,
        end: NaiveDate,
        /// Must be exactly DELETE-SHARDS.
        #[arg(long)]
        confirm: String,
    },

    /// List rows for a day (today when no date is given).
    Query {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Aggregate statistics for a day (today when no date is given).
    Stats {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let store = Arc::new(
        LogStore::open(&cli.db)
            .await
            .with_context(|| format!("opening database {}", cli.db))?,
    );

    match cli.command {
        Command::Archive {
            max_age_days,
            archive_dir,
        } => {
            std::fs::create_dir_all(&archive_dir)
                .with_context(|| format!("creating archive dir {archive_dir}"))?;
            let cold = Arc::new(
                object_store::local::LocalFileSystem::new_with_prefix(&archive_dir)
                    .with_context(|| format!("opening archive dir {archive_dir}"))?,
            );
            let report = Archiver::new(store, cold).archive(max_age_days).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Compact { shard: Some(shard) } => match store.compact_shard(&shard).await? {
            CompactionOutcome::Compacted(delta) => println!(
                "compacted {shard}: {} -> {} bytes ({} saved)",
                delta.bytes_before,
                delta.bytes_after,
                delta.bytes_saved()
            ),
            CompactionOutcome::AlreadyCompacted => println!("{shard}: already compacted"),
        },

        Command::Compact { shard: None } => {
            let report = store.compact_all().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::DeleteRange {
            start,
            end,
            confirm,
        } => {
            let report = store.delete_range(start, end, &confirm).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Query {
            date,
            search,
            limit,
            offset,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let filter = QueryFilter {
                search,
                limit,
                offset,
            };
            let rows = store.query_day(date, &filter).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }

        Command::Stats { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let stats = store.day_stats(date).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
