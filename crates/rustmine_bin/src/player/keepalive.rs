//! The per-connection heartbeat: a background task pings every 15 seconds
//! and a shared ledger tracks which pings are still unanswered.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::consts::{KEEPALIVE_ID_MAX, KEEPALIVE_INTERVAL, KEEPALIVE_TIMEOUT};
use crate::network::packets::ClientBound;
use crate::network::{FrameWriter, ProtocolError};

/// Outstanding keepalive ids with the time each was sent. Shared between the
/// keepalive task (records) and the read loop (acknowledges).
#[derive(Default)]
pub struct KeepaliveLedger {
    outstanding: parking_lot::Mutex<Vec<(i64, Instant)>>,
}

impl KeepaliveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: i64) {
        self.record_at(id, Instant::now());
    }

    fn record_at(&self, id: i64, sent: Instant) {
        self.outstanding.lock().push((id, sent));
    }

    /// Clear a client reply. A reply that matches nothing outstanding is a
    /// protocol violation.
    pub fn acknowledge(&self, id: i64) -> Result<(), ProtocolError> {
        let mut outstanding = self.outstanding.lock();
        match outstanding.iter().position(|(pending, _)| *pending == id) {
            Some(at) => {
                outstanding.remove(at);
                Ok(())
            }
            None => Err(ProtocolError::KeepaliveMismatch),
        }
    }

    /// More than one ping unanswered, the oldest of them past the timeout.
    pub fn timed_out(&self) -> bool {
        self.timed_out_at(Instant::now(), KEEPALIVE_TIMEOUT)
    }

    fn timed_out_at(&self, now: Instant, timeout: Duration) -> bool {
        let outstanding = self.outstanding.lock();
        outstanding.len() > 1
            && outstanding
                .iter()
                .any(|(_, sent)| now.duration_since(*sent) >= timeout)
    }
}

/// Spawn the keepalive clock for one connection. Exits on write failure, and
/// raises `timed_out` for the read loop to close the connection.
pub fn spawn_keepalive(
    writer: Arc<Mutex<FrameWriter<OwnedWriteHalf>>>,
    ledger: Arc<KeepaliveLedger>,
    timed_out: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(KEEPALIVE_INTERVAL).await;

            if ledger.timed_out() {
                debug!("[KEEPALIVE] unanswered pings past the deadline, signalling close");
                timed_out.notify_one();
                return;
            }

            let id = rand::thread_rng().gen_range(1..KEEPALIVE_ID_MAX);
            let packet = ClientBound::KeepAlive { id };
            let Ok(payload) = packet.encode() else {
                return;
            };

            {
                let mut writer = writer.lock().await;
                if writer.write_frame(packet.packet_id(), &payload).await.is_err() {
                    // Connection is gone; the read loop will notice on its own.
                    return;
                }
            }

            ledger.record(id);
            trace!("[KEEPALIVE] sent id {id}");
        }
    })
}
