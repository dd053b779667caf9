//! The Archival Job
//!
//! Entry point is [`Archiver::archive`]: compute the cutoff shard name
//! from the retention window, collect every cataloged shard older than it,
//! group by calendar month, and walk each group through the persisted
//! copy-then-drop state machine. Month groups fail independently; the
//! report carries one entry per group either way.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{Duration, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use object_store::ObjectStore;
use serde::Serialize;
use tracing::{error, info, warn};

use logshard_core::{shard_id, shard_is_older_than, shard_year_month};
use logshard_store::{ArchiveRun, ArchiveState, LogStore};

use crate::error::Result;
use crate::metadata::{artifact_path, metadata_path, ArchiveMetadata};

/// Outcome of one month group.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MonthStatus {
    Archived {
        total_rows: u64,
        original_size: u64,
        compressed_size: u64,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthEntry {
    pub year: i32,
    pub month: u32,
    pub shards: Vec<String>,
    #[serde(flatten)]
    pub status: MonthStatus,
}

/// Structured report of one archival invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    /// Shards strictly older than this cutoff name were candidates.
    pub cutoff: String,
    pub months: Vec<MonthEntry>,
}

impl ArchiveReport {
    pub fn archived(&self) -> usize {
        self.months
            .iter()
            .filter(|m| matches!(m.status, MonthStatus::Archived { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.months
            .iter()
            .filter(|m| matches!(m.status, MonthStatus::Failed { .. }))
            .count()
    }
}

/// The archival job: owns the copy+drop transition for old shards.
pub struct Archiver {
    store: Arc<LogStore>,
    cold: Arc<dyn ObjectStore>,
}

impl Archiver {
    pub fn new(store: Arc<LogStore>, cold: Arc<dyn ObjectStore>) -> Self {
        Self { store, cold }
    }

    /// Archive every shard older than `max_age_days`, one artifact per
    /// calendar month.
    pub async fn archive(&self, max_age_days: u32) -> Result<ArchiveReport> {
        let cutoff_date = Utc::now().date_naive() - Duration::days(max_age_days as i64);
        let cutoff = shard_id(cutoff_date);

        let mut groups: BTreeMap<(i32, u32), Vec<String>> = BTreeMap::new();
        for shard in self.store.list_shards().await? {
            if !shard_is_older_than(&shard, &cutoff) {
                continue;
            }
            match shard_year_month(&shard) {
                Ok(key) => groups.entry(key).or_default().push(shard),
                // A malformed name in the catalog is not ours to archive.
                Err(e) => warn!("skipping uncataloguable shard: {}", e),
            }
        }

        if groups.is_empty() {
            info!("archival: no shards older than {}", cutoff);
        }

        let mut report = ArchiveReport {
            cutoff,
            months: Vec::new(),
        };
        for ((year, month), shards) in groups {
            let status = match self.archive_month(year, month, &shards).await {
                Ok(status) => status,
                Err(e) => {
                    error!("archival of {:04}-{:02} failed: {}", year, month, e);
                    MonthStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.months.push(MonthEntry {
                year,
                month,
                shards,
                status,
            });
        }
        Ok(report)
    }

    /// Walk one month group through the state machine. Any error aborts
    /// this group before its drop step; shards are only removed once the
    /// metadata write is durable.
    async fn archive_month(
        &self,
        year: i32,
        month: u32,
        candidates: &[String],
    ) -> Result<MonthStatus> {
        let mut run = match self.store.archive_run(year, month).await? {
            Some(run) if run.state == ArchiveState::Dropped => {
                // The month completed in an earlier run; new shards for it
                // would overwrite a finished artifact. Leave them to the
                // operator.
                warn!(
                    "archival: {:04}-{:02} already archived, {} shard(s) left untouched",
                    year,
                    month,
                    candidates.len()
                );
                return Ok(MonthStatus::Skipped {
                    reason: "month already archived".to_string(),
                });
            }
            Some(run) => run,
            None => ArchiveRun::new(year, month, candidates.to_vec()),
        };

        if run.state == ArchiveState::Pending {
            // Not yet durable anywhere: the candidate set is still free to
            // pick up shards that aged in since the last attempt.
            run.shards = candidates.to_vec();
            self.store.save_archive_run(&run).await?;
        }

        let artifact = artifact_path(year, month);

        // Trust a persisted Copied state only while the artifact is still
        // really there.
        if run.state == ArchiveState::Copied && self.cold.head(&artifact).await.is_err() {
            warn!(
                "archival: {:04}-{:02} marked copied but artifact is missing, re-copying",
                year, month
            );
            run.state = ArchiveState::Pending;
        }

        if run.state == ArchiveState::Pending {
            let mut rows = Vec::new();
            for shard in &run.shards {
                rows.extend(self.store.read_all_records(shard).await?);
            }
            let json = serde_json::to_vec(&rows)?;
            let compressed = gzip(&json)?;

            run.total_rows = rows.len() as i64;
            run.original_size = json.len() as i64;
            run.compressed_size = compressed.len() as i64;

            self.cold.put(&artifact, Bytes::from(compressed)).await?;
            run.artifact_path = Some(artifact.to_string());
            run.state = ArchiveState::Copied;
            self.store.save_archive_run(&run).await?;
            info!(
                "archived {:04}-{:02}: {} rows, {} -> {} bytes",
                year, month, run.total_rows, run.original_size, run.compressed_size
            );
        }

        if run.state == ArchiveState::Copied {
            let metadata = ArchiveMetadata {
                year,
                month,
                shards: run.shards.clone(),
                created_at: Utc::now(),
                total_rows: run.total_rows as u64,
                original_size: run.original_size as u64,
                compressed_size: run.compressed_size as u64,
            };
            self.cold
                .put(
                    &metadata_path(year, month),
                    Bytes::from(serde_json::to_vec_pretty(&metadata)?),
                )
                .await?;
            run.state = ArchiveState::MetadataWritten;
            self.store.save_archive_run(&run).await?;
        }

        if run.state == ArchiveState::MetadataWritten {
            for shard in &run.shards {
                self.store.drop_shard(shard).await?;
            }
            run.state = ArchiveState::Dropped;
            self.store.save_archive_run(&run).await?;
            info!(
                "dropped {} archived shard(s) for {:04}-{:02}",
                run.shards.len(),
                year,
                month
            );
        }

        Ok(MonthStatus::Archived {
            total_rows: run.total_rows as u64,
            original_size: run.original_size as u64,
            compressed_size: run.compressed_size as u64,
        })
    }
}

/// Gzip at maximum compression, matching the archive artifact format.
fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn gzip_roundtrips() {
        let data = b"a connection log line, repeated ".repeat(64);
        let compressed = gzip(&data).unwrap();
        assert!(compressed.len() < data.len());

        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
