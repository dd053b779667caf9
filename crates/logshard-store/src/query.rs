//! Per-Day Read API
//!
//! The reporting surface (an external HTTP collaborator) reads through
//! these two calls: a filtered, paginated row listing and a per-day
//! aggregate summary. A date with no shard is an expected state - days
//! with no traffic simply never created one - so absence translates to an
//! empty result at this boundary, never an error.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::Row;

use logshard_core::{shard_id, LogRecord};

use crate::error::Result;
use crate::store::{record_from_row, LogStore};

/// Filter and pagination for [`LogStore::query_day`].
#[derive(Debug, Clone)]
pub struct QueryFilter {
    /// Substring matched against source ip, dest ip, and message.
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            search: None,
            offset: 0,
            limit: 50,
        }
    }
}

/// One aggregation bucket: a key and how many rows carried it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub key: String,
    pub count: i64,
}

/// Aggregate statistics for one day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DayStats {
    /// Top 10 tunnel-session users by row count.
    pub top_users: Vec<CountEntry>,
    /// Full protocol distribution, descending.
    pub protocols: Vec<CountEntry>,
    /// Top 10 destination ips by row count.
    pub top_destinations: Vec<CountEntry>,
}

impl LogStore {
    /// Rows for one calendar day, newest first.
    pub async fn query_day(&self, date: NaiveDate, filter: &QueryFilter) -> Result<Vec<LogRecord>> {
        let shard = shard_id(date);
        if !self.shard_exists(&shard).await? {
            return Ok(Vec::new());
        }

        let mut sql = format!("SELECT * FROM \"{shard}\"");
        if filter.search.is_some() {
            sql.push_str(" WHERE (source_ip LIKE ? OR dest_ip LIKE ? OR message LIKE ?)");
        }
        sql.push_str(" ORDER BY id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            query = query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }
        let rows = query
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// Aggregate statistics for one calendar day.
    pub async fn day_stats(&self, date: NaiveDate) -> Result<DayStats> {
        let shard = shard_id(date);
        if !self.shard_exists(&shard).await? {
            return Ok(DayStats::default());
        }

        let top_users = self
            .count_query(&format!(
                "SELECT user AS key, COUNT(*) AS cnt FROM \"{shard}\" \
                 WHERE user IS NOT NULL AND user != '' \
                 GROUP BY user ORDER BY cnt DESC LIMIT 10"
            ))
            .await?;

        let protocols = self
            .count_query(&format!(
                "SELECT protocol AS key, COUNT(*) AS cnt FROM \"{shard}\" \
                 WHERE protocol IS NOT NULL \
                 GROUP BY protocol ORDER BY cnt DESC"
            ))
            .await?;

        let top_destinations = self
            .count_query(&format!(
                "SELECT dest_ip AS key, COUNT(*) AS cnt FROM \"{shard}\" \
                 WHERE dest_ip IS NOT NULL \
                 GROUP BY dest_ip ORDER BY cnt DESC LIMIT 10"
            ))
            .await?;

        Ok(DayStats {
            top_users,
            protocols,
            top_destinations,
        })
    }

    async fn count_query(&self, sql: &str) -> Result<Vec<CountEntry>> {
        let rows = sqlx::query(sql).fetch_all(self.pool()).await?;
        rows.into_iter()
            .map(|row| {
                Ok(CountEntry {
                    key: row.try_get("key")?,
                    count: row.try_get("cnt")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShardManager;
    use chrono::Utc;
    use logshard_core::{parse, NewLogRecord};
    use std::sync::Arc;

    async fn seeded_store() -> Arc<LogStore> {
        let store = Arc::new(LogStore::open_in_memory().await.unwrap());
        let manager = ShardManager::new(store.clone());
        manager.ensure_shard("logs_20240315").await.unwrap();

        let messages = [
            "in:<pppoe-alice> proto TCP (SYN), 192.168.88.10:5432->1.1.1.1:80, len 60",
            "in:<pppoe-alice> proto UDP, 192.168.88.10:5353->8.8.8.8:53, len 80",
            "in:<pppoe-bob> proto TCP (ACK), 192.168.88.11:40000->1.1.1.1:443, len 52",
            "system,info dhcp lease granted",
        ];
        for message in messages {
            let rec = NewLogRecord::from_parsed(parse(message), Utc::now());
            store.insert_record("logs_20240315", &rec).await.unwrap();
        }
        store
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn query_returns_newest_first() {
        let store = seeded_store().await;
        let rows = store
            .query_day(day(), &QueryFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].id > rows[3].id);
    }

    #[tokio::test]
    async fn query_filters_by_substring() {
        let store = seeded_store().await;
        let filter = QueryFilter {
            search: Some("8.8.8.8".to_string()),
            ..QueryFilter::default()
        };
        let rows = store.query_day(day(), &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dest_ip.as_deref(), Some("8.8.8.8"));

        // Message text is searched too.
        let filter = QueryFilter {
            search: Some("dhcp lease".to_string()),
            ..QueryFilter::default()
        };
        assert_eq!(store.query_day(day(), &filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn query_paginates_with_offset() {
        let store = seeded_store().await;
        let page1 = store
            .query_day(
                day(),
                &QueryFilter {
                    limit: 3,
                    ..QueryFilter::default()
                },
            )
            .await
            .unwrap();
        let page2 = store
            .query_day(
                day(),
                &QueryFilter {
                    limit: 3,
                    offset: 3,
                    ..QueryFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page1.len(), 3);
        assert_eq!(page2.len(), 1);
        assert!(page1.iter().all(|r| r.id != page2[0].id));
    }

    #[tokio::test]
    async fn missing_day_is_empty_not_error() {
        let store = Arc::new(LogStore::open_in_memory().await.unwrap());
        let rows = store
            .query_day(day(), &QueryFilter::default())
            .await
            .unwrap();
        assert!(rows.is_empty());

        let stats = store.day_stats(day()).await.unwrap();
        assert!(stats.top_users.is_empty());
        assert!(stats.protocols.is_empty());
        assert!(stats.top_destinations.is_empty());
    }

    #[tokio::test]
    async fn stats_aggregate_users_protocols_destinations() {
        let store = seeded_store().await;
        let stats = store.day_stats(day()).await.unwrap();

        assert_eq!(stats.top_users[0].key, "alice");
        assert_eq!(stats.top_users[0].count, 2);
        assert_eq!(stats.top_users[1].key, "bob");

        let tcp = stats.protocols.iter().find(|e| e.key == "TCP").unwrap();
        assert_eq!(tcp.count, 2);
        // The unparsed message lands under UNKNOWN.
        assert!(stats.protocols.iter().any(|e| e.key == "UNKNOWN"));

        let top = &stats.top_destinations[0];
        assert_eq!(top.key, "1.1.1.1");
        assert_eq!(top.count, 2);
    }
}
