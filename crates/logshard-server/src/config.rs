//! Daemon Configuration
//!
//! All configuration comes from environment variables with defaults that
//! run a single box out of the box:
//!
//! - `LOGSHARD_DB`: SQLite database path (default: ./data/logshard.db)
//! - `LOGSHARD_SYSLOG_ADDR`: UDP bind address (default: 0.0.0.0:4950)
//! - `LOGSHARD_ARCHIVE_DIR`: cold-storage directory (default: ./data/archives)
//! - `LOGSHARD_ARCHIVE_AGE_DAYS`: retention window before archival (default: 30)
//! - `LOGSHARD_ARCHIVE_INTERVAL_SECS`: archival schedule (default: 86400)
//!
//! Logging is controlled by `RUST_LOG` via the tracing env filter.

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: String,
    pub syslog_addr: String,
    pub archive_dir: String,
    pub archive_age_days: u32,
    pub archive_interval_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var("LOGSHARD_DB")
                .unwrap_or_else(|_| "./data/logshard.db".to_string()),
            syslog_addr: std::env::var("LOGSHARD_SYSLOG_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:4950".to_string()),
            archive_dir: std::env::var("LOGSHARD_ARCHIVE_DIR")
                .unwrap_or_else(|_| "./data/archives".to_string()),
            archive_age_days: std::env::var("LOGSHARD_ARCHIVE_AGE_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            archive_interval_secs: std::env::var("LOGSHARD_ARCHIVE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86400),
        }
    }
}
