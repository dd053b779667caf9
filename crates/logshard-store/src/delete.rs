//! Retention: Explicit Range Deletion
//!
//! Drops every shard in an inclusive date range. This is irreversible and
//! deliberately uncoordinated with archival - an operator can delete
//! shards that were never archived. The guard against *accidental*
//! invocation is the fixed confirmation token; it is not a security
//! control.
//!
//! Absent shards in the range are reported, not treated as errors: a day
//! with no traffic never had a shard to begin with.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use logshard_core::shard_id;

use crate::error::{Result, StoreError};
use crate::store::LogStore;

/// The fixed confirmation value `delete_range` demands.
pub const DELETE_CONFIRMATION: &str = "DELETE-SHARDS";

/// Per-shard line of a deletion report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteStatus {
    Dropped,
    Missing,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteEntry {
    pub shard: String,
    #[serde(flatten)]
    pub status: DeleteStatus,
}

/// Structured report of a range deletion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub entries: Vec<DeleteEntry>,
}

impl DeleteReport {
    pub fn dropped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, DeleteStatus::Dropped))
            .count()
    }

    pub fn missing(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, DeleteStatus::Missing))
            .count()
    }
}

impl LogStore {
    /// Drop every shard for the days in `[start, end]`.
    ///
    /// Rejected outright without the exact confirmation token, touching
    /// nothing. Per-shard drop failures are isolated into the report.
    pub async fn delete_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        confirmation: &str,
    ) -> Result<DeleteReport> {
        if confirmation != DELETE_CONFIRMATION {
            return Err(StoreError::ConfirmationRequired);
        }
        if start > end {
            return Err(StoreError::InvalidRange { start, end });
        }

        let mut report = DeleteReport::default();
        let mut day = start;
        loop {
            let shard = shard_id(day);
            let status = if self.shard_exists(&shard).await? {
                match self.drop_shard(&shard).await {
                    Ok(()) => {
                        warn!("deleted shard {}", shard);
                        DeleteStatus::Dropped
                    }
                    Err(e) => DeleteStatus::Failed {
                        error: e.to_string(),
                    },
                }
            } else {
                DeleteStatus::Missing
            };
            report.entries.push(DeleteEntry { shard, status });

            if day >= end {
                break;
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShardManager;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn store_with_days(days: &[NaiveDate]) -> Arc<LogStore> {
        let store = Arc::new(LogStore::open_in_memory().await.unwrap());
        let manager = ShardManager::new(store.clone());
        for day in days {
            manager.ensure_shard(&shard_id(*day)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn drops_present_and_reports_missing() {
        let store = store_with_days(&[date(2024, 1, 10), date(2024, 1, 12)]).await;

        let report = store
            .delete_range(date(2024, 1, 10), date(2024, 1, 12), DELETE_CONFIRMATION)
            .await
            .unwrap();

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.dropped(), 2);
        assert_eq!(report.missing(), 1);
        assert!(matches!(report.entries[1].status, DeleteStatus::Missing));
        assert_eq!(report.entries[1].shard, "logs_20240111");

        assert!(store.list_shards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_token_rejects_without_deleting() {
        let store = store_with_days(&[date(2024, 1, 10)]).await;

        let err = store
            .delete_range(date(2024, 1, 10), date(2024, 1, 10), "yes please")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConfirmationRequired));

        let err = store
            .delete_range(date(2024, 1, 10), date(2024, 1, 10), "")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConfirmationRequired));

        assert_eq!(store.list_shards().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let store = store_with_days(&[date(2024, 1, 10)]).await;
        let err = store
            .delete_range(date(2024, 1, 12), date(2024, 1, 10), DELETE_CONFIRMATION)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRange { .. }));
        assert_eq!(store.list_shards().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn single_day_range_works() {
        let store = store_with_days(&[date(2024, 1, 10)]).await;
        let report = store
            .delete_range(date(2024, 1, 10), date(2024, 1, 10), DELETE_CONFIRMATION)
            .await
            .unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.dropped(), 1);
    }
}
