use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use anyhow::Result;
use rustmine_config::ServerConfig;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{error, info, warn};

use crate::network::ProtocolError;
use crate::player::Connection;

pub struct MinecraftServer {
    listener: TcpListener,
    config:   Arc<ServerConfig>,
    online:   Arc<AtomicU32>,
}

impl MinecraftServer {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        // max_players doubles as the listen backlog when the host is a
        // literal address; hostnames fall back to the default backlog.
        let backlog = config.max_players.max(1) as u32;
        let listener = match config.bind_addr().parse::<SocketAddr>() {
            Ok(addr) => {
                let socket = if addr.is_ipv4() {
                    TcpSocket::new_v4()?
                } else {
                    TcpSocket::new_v6()?
                };
                socket.bind(addr)?;
                socket.listen(backlog)?
            }
            Err(_) => TcpListener::bind(config.bind_addr()).await?,
        };
        info!("[STARTUP] Server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            config: Arc::new(config),
            online: Arc::new(AtomicU32::new(0)),
        })
    }

    /// The actual bound address, which differs from the configured one when
    /// port zero was requested.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept forever. Per-connection failures never stop the loop; only a
    /// dead listener does.
    pub async fn run(self) -> Result<()> {
        loop {
            let (socket, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("[NETWORK] Accept error: {e}");
                    return Err(e.into());
                }
            };

            info!("[CONNECTION] New connection from {addr}");
            let config = Arc::clone(&self.config);
            let online = Arc::clone(&self.online);

            tokio::spawn(async move {
                handle_client(socket, addr, config, online).await;
            });
        }
    }
}

/// Run one client to completion and log its fate: peers hanging up is
/// routine, everything else gets a single warning naming the error kind.
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    config: Arc<ServerConfig>,
    online: Arc<AtomicU32>,
) {
    let connection = Connection::new(socket, addr, config, online);

    match connection.handle().await {
        Ok(()) => info!("[CONNECTION] {addr} closed"),
        Err(ProtocolError::IoClosed) => info!("[CONNECTION] {addr} disconnected"),
        Err(e) => warn!("[CONNECTION] {addr} closed: {e} ({})", e.kind()),
    }
}
