//! Archive Metadata Sidecar
//!
//! Each archived month carries a `metadata.json` next to its artifact:
//! enough for an operator (or a restore tool) to know what the artifact
//! holds without decompressing it. The sidecar is written strictly after
//! the artifact itself - its presence implies the artifact is durable.

use chrono::{DateTime, Utc};
use object_store::path::Path;
use serde::{Deserialize, Serialize};

/// Sidecar describing one archived month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub year: i32,
    pub month: u32,
    /// Constituent shard names, ascending.
    pub shards: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Sum of the constituent shards' row counts.
    pub total_rows: u64,
    /// Uncompressed JSON size in bytes.
    pub original_size: u64,
    /// Artifact size in bytes as stored.
    pub compressed_size: u64,
}

/// Cold-storage location of a month's compressed artifact.
pub fn artifact_path(year: i32, month: u32) -> Path {
    Path::from(format!(
        "{year:04}/{month:02}/logs_{year:04}{month:02}.json.gz"
    ))
}

/// Cold-storage location of a month's metadata sidecar.
pub fn metadata_path(year: i32, month: u32) -> Path {
    Path::from(format!("{year:04}/{month:02}/metadata.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_zero_padded_per_month_prefix() {
        assert_eq!(
            artifact_path(2024, 1).to_string(),
            "2024/01/logs_202401.json.gz"
        );
        assert_eq!(metadata_path(2024, 12).to_string(), "2024/12/metadata.json");
    }

    #[test]
    fn metadata_roundtrips_as_json() {
        let meta = ArchiveMetadata {
            year: 2024,
            month: 1,
            shards: vec!["logs_20240101".to_string()],
            created_at: Utc::now(),
            total_rows: 10,
            original_size: 4096,
            compressed_size: 512,
        };
        let json = serde_json::to_string_pretty(&meta).unwrap();
        let back: ArchiveMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
