//! Ingestion Liveness Signal
//!
//! The status endpoint reports the router as "online" when a record was
//! successfully ingested within the last 30 seconds. The signal is an
//! explicitly owned object constructed at process start and injected into
//! the listener - no ambient global - so it can be exercised in tests
//! without a live socket.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

/// How recently a record must have arrived for the feed to count as
/// online.
pub const ONLINE_WINDOW_SECS: i64 = 30;

/// Timestamp of the last successfully ingested record.
///
/// Internally an atomic epoch-millis value; zero means "never".
#[derive(Debug, Default)]
pub struct IngestLiveness {
    last_received_ms: AtomicI64,
}

impl IngestLiveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful ingestion at `now`.
    pub fn mark_received(&self, now: DateTime<Utc>) {
        self.last_received_ms
            .store(now.timestamp_millis(), Ordering::Relaxed);
    }

    /// When the last record arrived, `None` if none ever did.
    pub fn last_received(&self) -> Option<DateTime<Utc>> {
        match self.last_received_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    /// True when a record arrived within the online window before `now`.
    pub fn is_online_at(&self, now: DateTime<Utc>) -> bool {
        match self.last_received() {
            Some(last) => now - last < Duration::seconds(ONLINE_WINDOW_SECS),
            None => false,
        }
    }

    /// [`Self::is_online_at`] against the current clock.
    pub fn is_online(&self) -> bool {
        self.is_online_at(Utc::now())
    }
}
