//! Per-connection protocol state machine. One of these is owned by each
//! accept task; it walks the client from handshake to play and turns every
//! lower-layer error into a closed socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use rustmine_config::ServerConfig;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

use crate::network::packets::{ClientBound, NextState, ServerBound};
use crate::network::{FrameReader, FrameWriter, Phase, ProtocolError};
use crate::player::keepalive::spawn_keepalive;
use crate::player::play_state::{self, PlaySession};
use crate::player::{KeepaliveLedger, uuid_offline};

/// The exact status JSON shape: version, players, description, favicon, in
/// that order.
pub fn status_json(config: &ServerConfig, online: u32) -> String {
    serde_json::json!({
        "version": {
            "name": config.version,
            "protocol": config.version_protocol,
        },
        "players": {
            "max": config.max_players,
            "online": online,
            "sample": [],
        },
        "description": { "text": config.description },
        "favicon": config.favicon,
    })
    .to_string()
}

/// Bumps the process-wide online counter for the lifetime of a play session,
/// on every exit path.
struct OnlineGuard {
    counter: Arc<AtomicU32>,
}

impl OnlineGuard {
    fn join(counter: Arc<AtomicU32>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for OnlineGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Connection {
    addr:   SocketAddr,
    config: Arc<ServerConfig>,
    online: Arc<AtomicU32>,
    reader: FrameReader<OwnedReadHalf>,
    writer: Arc<Mutex<FrameWriter<OwnedWriteHalf>>>,
    phase:  Phase,
}

impl Connection {
    pub fn new(
        socket: TcpStream,
        addr: SocketAddr,
        config: Arc<ServerConfig>,
        online: Arc<AtomicU32>,
    ) -> Self {
        let (read_half, write_half) = socket.into_split();
        Self {
            addr,
            config,
            online,
            reader: FrameReader::new(read_half),
            writer: Arc::new(Mutex::new(FrameWriter::new(write_half))),
            phase: Phase::Handshaking,
        }
    }

    /// Drive the connection until the peer leaves or a protocol error ends
    /// it. The caller owns the logging of whatever this returns.
    pub async fn handle(mut self) -> Result<(), ProtocolError> {
        loop {
            let (id, payload) = self.reader.read_frame().await?;
            let packet = ServerBound::decode(self.phase, id, &payload)?;

            match packet {
                ServerBound::Handshake { protocol, next, .. } => {
                    self.phase = match next {
                        NextState::Status => Phase::Status,
                        NextState::Login => Phase::Login,
                    };
                    debug!(
                        "[CONNECTION] {} handshake: protocol {protocol}, next {}",
                        self.addr, self.phase
                    );
                }

                ServerBound::StatusRequest => {
                    let online = self.online.load(Ordering::SeqCst);
                    let json = status_json(&self.config, online);
                    self.send(&ClientBound::StatusResponse { json }).await?;
                    debug!("[STATUS] {} served status", self.addr);
                }

                ServerBound::StatusPing { token } => {
                    self.send(&ClientBound::StatusPong { token }).await?;
                    debug!("[STATUS] {} pinged, closing", self.addr);
                    return Ok(());
                }

                ServerBound::LoginStart { username } => {
                    return self.login(username).await;
                }

                _ => {
                    return Err(ProtocolError::UnexpectedPacket {
                        phase: self.phase,
                        id,
                    });
                }
            }
        }
    }

    /// Login transition: optional compression negotiation, LoginSuccess,
    /// then the play session until the connection dies.
    async fn login(mut self, username: String) -> Result<(), ProtocolError> {
        let uuid = uuid_offline(&username);
        info!("[LOGIN] '{}' ({}) logging in from {}", username, uuid, self.addr);

        if self.config.compression_enabled() {
            let threshold = self.config.compression_threshold;
            self.send(&ClientBound::SetCompression { threshold }).await?;
            // Both directions switch envelopes after this packet.
            self.writer.lock().await.set_threshold(threshold);
            self.reader.set_threshold(threshold);
            debug!("[LOGIN] {} compression enabled at {threshold} bytes", self.addr);
        }

        self.send(&ClientBound::LoginSuccess {
            uuid,
            username: username.clone(),
        })
        .await?;

        self.phase = Phase::Play;
        let _online = OnlineGuard::join(Arc::clone(&self.online));

        // The whole burst goes out under one writer lock, before the
        // keepalive clock can interleave.
        {
            let mut writer = self.writer.lock().await;
            for packet in play_state::join_burst(&username, uuid)? {
                let payload = packet.encode()?;
                writer.write_frame(packet.packet_id(), &payload).await?;
            }
        }
        info!("[PLAY] '{}' joined the world", username);

        let ledger = Arc::new(KeepaliveLedger::new());
        let timed_out = Arc::new(Notify::new());
        let keepalive = spawn_keepalive(
            Arc::clone(&self.writer),
            Arc::clone(&ledger),
            Arc::clone(&timed_out),
        );

        let mut session = PlaySession::new(username);
        let result =
            play_state::play_loop(&mut self.reader, &ledger, &timed_out, &mut session).await;

        // The clock must not outlive the session or it would hold the write
        // half open.
        keepalive.abort();
        result
    }

    async fn send(&self, packet: &ClientBound) -> Result<(), ProtocolError> {
        let payload = packet.encode()?;
        self.writer
            .lock()
            .await
            .write_frame(packet.packet_id(), &payload)
            .await
    }
}
