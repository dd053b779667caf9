//! Log Record Types
//!
//! ## Types Overview
//!
//! ### LogRecord
//! One row as stored in a shard. The `id` is shard-local and assigned by the
//! storage engine at write time; its order reflects storage arrival order,
//! not wire order.
//!
//! ### NewLogRecord
//! A record about to be written - everything except the id. Built from a
//! [`ParsedLog`](crate::parser::ParsedLog) plus the ingestion clock.
//!
//! ## Design Decisions
//!
//! - `message` is always present; every other extracted field is
//!   best-effort and may be absent without failing ingestion
//! - `protocol` falls back to `"UNKNOWN"` rather than NULL so protocol
//!   aggregations never need a COALESCE
//! - `timestamp` is the event *arrival* time, not any time claimed inside
//!   the message; `received_at` is the ingestion-system clock

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::ParsedLog;

/// Protocol value stored when the message carried no recognizable token.
pub const UNKNOWN_PROTOCOL: &str = "UNKNOWN";

/// One ingested connection-log event, as stored in a shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Shard-local monotonic id, assigned at write time.
    pub id: i64,

    /// Event arrival time (UTC).
    pub timestamp: DateTime<Utc>,

    pub source_ip: Option<String>,
    pub source_port: Option<u16>,
    pub dest_ip: Option<String>,
    pub dest_port: Option<u16>,

    /// Free-text protocol token, `"UNKNOWN"` when absent from the message.
    pub protocol: String,

    /// Username derived from a tunneling-session marker, when present.
    pub user: Option<String>,

    /// The raw original text, truncated to [`MAX_MESSAGE_BYTES`](crate::parser::MAX_MESSAGE_BYTES).
    pub message: String,

    /// Ingestion-system clock at the time the row was written.
    pub received_at: DateTime<Utc>,
}

/// A record about to be inserted - [`LogRecord`] minus the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogRecord {
    pub timestamp: DateTime<Utc>,
    pub source_ip: Option<String>,
    pub source_port: Option<u16>,
    pub dest_ip: Option<String>,
    pub dest_port: Option<u16>,
    pub protocol: String,
    pub user: Option<String>,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

impl NewLogRecord {
    /// Build a record from parser output, stamping both clocks with the
    /// ingestion time.
    pub fn from_parsed(parsed: ParsedLog, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            source_ip: parsed.source_ip,
            source_port: parsed.source_port,
            dest_ip: parsed.dest_ip,
            dest_port: parsed.dest_port,
            protocol: parsed
                .protocol
                .unwrap_or_else(|| UNKNOWN_PROTOCOL.to_string()),
            user: parsed.user,
            message: parsed.message,
            received_at: now,
        }
    }
}
