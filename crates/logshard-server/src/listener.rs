//! UDP Ingestion Listener
//!
//! Router devices fire their connection logs at this socket as plain-text
//! datagrams: unacknowledged, unordered, best-effort. The receive loop
//! does nothing but accept and hand off; all storage I/O happens in
//! per-datagram tasks so a slow insert never backs up the socket.
//!
//! Error policy is availability-first. The source cannot retry and there
//! is no buffer to smooth a storage outage, so a failed ensure-shard or
//! insert is logged and the record is dropped - the feed keeps flowing.
//! Duplicate transmissions produce duplicate rows; ids reflect storage
//! arrival order, not wire order.

use std::sync::Arc;

use chrono::Utc;
use tokio::net::UdpSocket;
use tracing::{info, warn};

use logshard_core::{parse, shard_for, NewLogRecord};
use logshard_store::{LogStore, ShardManager};

use crate::liveness::IngestLiveness;

/// Datagrams beyond this length are truncated at receive time; the parser
/// bounds the stored message separately.
const RECV_BUFFER_BYTES: usize = 8192;

/// The ingestion listener: one socket, one receive loop.
pub struct IngestListener {
    socket: UdpSocket,
    store: Arc<LogStore>,
    shards: Arc<ShardManager>,
    liveness: Arc<IngestLiveness>,
}

impl IngestListener {
    /// Bind the ingestion socket.
    pub async fn bind(
        addr: &str,
        store: Arc<LogStore>,
        shards: Arc<ShardManager>,
        liveness: Arc<IngestLiveness>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("syslog listener bound on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            store,
            shards,
            liveness,
        })
    }

    /// Local address of the bound socket.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Run the receive loop forever, spawning one task per datagram.
    pub async fn run(self) {
        let mut buf = vec![0u8; RECV_BUFFER_BYTES];
        loop {
            let (len, _peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!("syslog receive error: {}", e);
                    continue;
                }
            };

            let raw = String::from_utf8_lossy(&buf[..len]).into_owned();
            let store = self.store.clone();
            let shards = self.shards.clone();
            let liveness = self.liveness.clone();
            tokio::spawn(async move {
                handle_datagram(&store, &shards, &liveness, raw).await;
            });
        }
    }
}

/// Parse one datagram and append it to its day's shard.
///
/// Every failure path drops exactly this record and returns; the feed is
/// never taken down by a storage problem.
async fn handle_datagram(
    store: &LogStore,
    shards: &ShardManager,
    liveness: &IngestLiveness,
    raw: String,
) {
    let now = Utc::now();
    let record = NewLogRecord::from_parsed(parse(&raw), now);
    let shard = shard_for(now);

    if let Err(e) = shards.ensure_shard(&shard).await {
        warn!("dropping record, ensure_shard {} failed: {}", shard, e);
        return;
    }

    match store.insert_record(&shard, &record).await {
        Ok(_id) => liveness.mark_received(now),
        Err(e) => warn!("dropping record, insert into {} failed: {}", shard, e),
    }
}
