//! Shard Resolver
//!
//! A shard is one calendar day of log records, stored in its own table
//! named `logs_YYYYMMDD`. The mapping from a timestamp to that name is the
//! single most load-bearing pure function in the system: ingestion,
//! archival, compaction, deletion, and the query layer all have to agree
//! on it, so it exists exactly once, here.
//!
//! ## Ordering Invariant
//!
//! Shard names are fixed-width and zero-padded, so *lexicographic* order
//! equals *date* order. [`shard_is_older_than`] is the one place that
//! relies on this; any future change to the name format must preserve the
//! property or replace that function, never re-derive the comparison
//! elsewhere.
//!
//! The calendar day is taken in UTC, fixed once for the whole system.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::error::{Error, Result};

/// Prefix shared by every shard table name.
pub const SHARD_PREFIX: &str = "logs_";

/// Shard name for a calendar date: `logs_YYYYMMDD`, zero-padded.
pub fn shard_id(date: NaiveDate) -> String {
    format!("{}{}", SHARD_PREFIX, date.format("%Y%m%d"))
}

/// Shard name for the UTC calendar day containing `ts`.
pub fn shard_for(ts: DateTime<Utc>) -> String {
    shard_id(ts.date_naive())
}

/// Inverse of [`shard_id`]: recover the calendar date from a shard name.
///
/// Fails on anything that is not a well-formed `logs_YYYYMMDD` name for a
/// real calendar date.
pub fn shard_date(name: &str) -> Result<NaiveDate> {
    let digits = name
        .strip_prefix(SHARD_PREFIX)
        .ok_or_else(|| Error::InvalidShardName(name.to_string()))?;
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidShardName(name.to_string()));
    }
    NaiveDate::parse_from_str(digits, "%Y%m%d")
        .map_err(|_| Error::InvalidShardName(name.to_string()))
}

/// The `(year, month)` a shard belongs to, for monthly archive grouping.
pub fn shard_year_month(name: &str) -> Result<(i32, u32)> {
    let date = shard_date(name)?;
    Ok((date.year(), date.month()))
}

/// True when `name` sorts strictly before `cutoff`.
///
/// Valid only because shard names are fixed-width and zero-padded (see
/// module docs); both arguments must be well-formed shard names.
pub fn shard_is_older_than(name: &str, cutoff: &str) -> bool {
    name < cutoff
}

/// True when `name` is a well-formed shard name.
pub fn is_shard_name(name: &str) -> bool {
    shard_date(name).is_ok()
}
