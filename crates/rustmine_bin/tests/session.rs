//! End-to-end sessions against a real listener: a client speaks the wire
//! format over loopback TCP and checks the server's byte-level behavior.

use std::io::Read;
use std::net::SocketAddr;

use flate2::read::ZlibDecoder;
use rustmine_bin::network::protocol::{PacketReader, PacketWriter, read_varint};
use rustmine_bin::network::{ByteWritable, FrameReader, FrameWriter, ProtocolError};
use rustmine_bin::player::uuid_offline;
use rustmine_bin::{MinecraftServer, ServerConfig};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Expected packet ids of the post-login burst, in order.
const BURST_IDS: [i32; 10] = [0x28, 0x4E, 0x38, 0x49, 0x22, 0x32, 0x36, 0x52, 0x19, 0x5E];

async fn start_server(mut config: ServerConfig) -> SocketAddr {
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    let server = MinecraftServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

struct Client {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let socket = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = socket.into_split();
        Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
        }
    }

    async fn send(&mut self, id: i32, build: impl FnOnce(&mut PacketWriter)) {
        let mut payload = PacketWriter::new();
        build(&mut payload);
        self.writer.write_frame(id, &payload.finish()).await.unwrap();
    }

    async fn handshake(&mut self, addr: SocketAddr, next: i32) {
        self.send(0x00, |w| {
            w.write_varint(771);
            w.write_string("localhost");
            w.write_unsigned_short(addr.port());
            w.write_varint(next);
        })
        .await;
    }

    async fn login(&mut self, addr: SocketAddr, username: &str) {
        self.handshake(addr, 2).await;
        self.send(0x00, |w| w.write_string(username)).await;
    }

    async fn read_frame(&mut self) -> (i32, Vec<u8>) {
        self.reader.read_frame().await.unwrap()
    }

    async fn expect_closed(&mut self) {
        match self.reader.read_frame().await {
            Err(ProtocolError::IoClosed) => {}
            other => panic!("expected the server to close, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_server_list_ping() {
    let addr = start_server(ServerConfig::default()).await;
    let mut client = Client::connect(addr).await;

    client.handshake(addr, 1).await;
    client.send(0x00, |_| {}).await;

    let (id, payload) = client.read_frame().await;
    assert_eq!(id, 0x00);
    let mut reader = PacketReader::new(&payload);
    let json = reader.read_string().unwrap();
    let status: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(status["version"]["protocol"], 771);
    assert_eq!(status["players"]["online"], 0);
    assert_eq!(status["players"]["sample"], serde_json::json!([]));
    assert_eq!(status["description"]["text"], "A Rust Minecraft Server");

    let token = 0x0123_4567_89AB_CDEFi64;
    client.send(0x01, |w| w.write_long(token)).await;

    let (id, payload) = client.read_frame().await;
    assert_eq!(id, 0x01);
    let mut reader = PacketReader::new(&payload);
    assert_eq!(reader.read_long().unwrap(), token);

    client.expect_closed().await;
}

#[tokio::test]
async fn test_offline_login_and_play_burst() {
    let addr = start_server(ServerConfig::default()).await;
    let mut client = Client::connect(addr).await;

    client.login(addr, "Player").await;

    let (id, payload) = client.read_frame().await;
    assert_eq!(id, 0x02);
    let mut reader = PacketReader::new(&payload);
    assert_eq!(reader.read_uuid().unwrap(), uuid_offline("Player"));
    assert_eq!(reader.read_string().unwrap(), "Player");
    assert_eq!(reader.remaining(), 0);

    let mut burst = Vec::new();
    for _ in 0..BURST_IDS.len() {
        burst.push(client.read_frame().await);
    }
    let ids: Vec<i32> = burst.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, BURST_IDS);

    // Join Game carries entity id 1 and the hardcore flag off.
    let join = &burst[0].1;
    let mut reader = PacketReader::new(join);
    assert_eq!(reader.read_int().unwrap(), 1);
    assert!(!reader.read_bool().unwrap());
    assert_eq!(reader.read_byte().unwrap(), 1);

    // The position sync uses teleport id 1.
    let sync = &burst[2].1;
    let mut reader = PacketReader::new(sync);
    assert_eq!(reader.read_double().unwrap(), 0.5);
    assert_eq!(reader.read_double().unwrap(), 65.0);
    assert_eq!(reader.read_double().unwrap(), 0.5);
    reader.read_float().unwrap();
    reader.read_float().unwrap();
    assert_eq!(reader.read_byte().unwrap(), 0);
    assert_eq!(reader.read_varint().unwrap(), 1);

    // The brand message is a raw trailing payload.
    let brand = &burst[8].1;
    let mut reader = PacketReader::new(brand);
    assert_eq!(reader.read_string().unwrap(), "minecraft:brand");
    assert_eq!(reader.read_rest(), b"CustomServer");

    // The session stays up for routine play traffic.
    client.send(0x00, |w| w.write_varint(1)).await;
    client
        .send(0x13, |w| {
            w.write_double(1.5);
            w.write_double(65.0);
            w.write_double(2.5);
            w.write_bool(true);
        })
        .await;
}

#[tokio::test]
async fn test_login_with_compression_threshold() {
    let config = ServerConfig {
        compression_threshold: 256,
        ..ServerConfig::default()
    };
    let addr = start_server(config).await;

    let socket = TcpStream::connect(addr).await.unwrap();
    let (mut read_half, write_half) = socket.into_split();
    let mut writer = FrameWriter::new(write_half);

    let mut handshake = PacketWriter::new();
    handshake.write_varint(771);
    handshake.write_string("localhost");
    handshake.write_unsigned_short(addr.port());
    handshake.write_varint(2);
    writer.write_frame(0x00, &handshake.finish()).await.unwrap();

    let mut login = PacketWriter::new();
    login.write_string("Player");
    writer.write_frame(0x00, &login.finish()).await.unwrap();

    // SetCompression arrives in the plain envelope.
    let body = read_raw_frame(&mut read_half).await;
    let (id, consumed) = read_varint(&body, 0).unwrap();
    assert_eq!(id, 0x03);
    let (threshold, _) = read_varint(&body, consumed).unwrap();
    assert_eq!(threshold, 256);

    // Everything after it uses the compressed envelope. LoginSuccess is
    // small, so its marker must be zero.
    let (id, payload, was_deflated) = read_compressed_frame(&mut read_half).await;
    assert_eq!(id, 0x02);
    assert!(!was_deflated);
    let mut reader = PacketReader::new(&payload);
    assert_eq!(reader.read_uuid().unwrap(), uuid_offline("Player"));

    let mut seen = Vec::new();
    for _ in 0..BURST_IDS.len() {
        let (id, payload, was_deflated) = read_compressed_frame(&mut read_half).await;
        seen.push((id, payload.len(), was_deflated));
    }
    let ids: Vec<i32> = seen.iter().map(|(id, _, _)| *id).collect();
    assert_eq!(ids, BURST_IDS);

    for (id, payload_len, was_deflated) in seen {
        // Frames at or above the threshold must be deflated, smaller ones
        // must not be. The id byte itself rides inside the body.
        let body_len = payload_len + 1;
        if body_len >= 256 {
            assert!(was_deflated, "packet 0x{id:02X} of {body_len} bytes went out raw");
        } else {
            assert!(!was_deflated, "packet 0x{id:02X} of {body_len} bytes was deflated");
        }
        if id == 0x28 || id == 0x22 {
            assert!(was_deflated, "packet 0x{id:02X} should exceed the threshold");
        }
        if id == 0x19 {
            assert!(!was_deflated, "the brand message is far below the threshold");
        }
    }
}

#[tokio::test]
async fn test_keepalive_mismatch_closes_the_connection() {
    let addr = start_server(ServerConfig::default()).await;
    let mut client = Client::connect(addr).await;

    client.login(addr, "Player").await;

    // LoginSuccess plus the burst.
    for _ in 0..=BURST_IDS.len() {
        client.read_frame().await;
    }

    // Nothing is outstanding, so any keepalive reply is a mismatch.
    client.send(0x10, |w| w.write_long(12345)).await;
    client.expect_closed().await;
}

#[tokio::test]
async fn test_malformed_length_varint_closes_the_connection() {
    let addr = start_server(ServerConfig::default()).await;
    let socket = TcpStream::connect(addr).await.unwrap();
    let (mut read_half, write_half) = socket.into_split();

    use tokio::io::AsyncWriteExt;
    let mut write_half = write_half;
    write_half
        .write_all(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F])
        .await
        .unwrap();
    write_half.flush().await.unwrap();

    // The server may answer with a clean close or a reset, but never with
    // bytes.
    let mut buf = [0u8; 1];
    match read_half.read(&mut buf).await {
        Ok(0) | Err(_) => {}
        Ok(n) => panic!("server answered {n} bytes to a malformed length"),
    }
}

#[tokio::test]
async fn test_unknown_play_packet_closes_the_connection() {
    let addr = start_server(ServerConfig::default()).await;
    let mut client = Client::connect(addr).await;

    client.login(addr, "Player").await;
    for _ in 0..=BURST_IDS.len() {
        client.read_frame().await;
    }

    // 0x7F is not part of the play vocabulary.
    client.send(0x7F, |w| w.write_varint(0)).await;
    client.expect_closed().await;
}

/// Read one raw frame body (after the outer length prefix).
async fn read_raw_frame(read_half: &mut OwnedReadHalf) -> Vec<u8> {
    let mut length: u32 = 0;
    for i in 0..5 {
        let b = read_half.read_u8().await.unwrap();
        length |= u32::from(b & 0x7F) << (7 * i);
        if b & 0x80 == 0 {
            break;
        }
    }
    let mut body = vec![0u8; length as usize];
    read_half.read_exact(&mut body).await.unwrap();
    body
}

/// Read one frame in the compressed envelope and hand back
/// `(packet_id, payload, was_deflated)`.
async fn read_compressed_frame(read_half: &mut OwnedReadHalf) -> (i32, Vec<u8>, bool) {
    let body = read_raw_frame(read_half).await;
    let (uncompressed_len, consumed) = read_varint(&body, 0).unwrap();

    let (packet, was_deflated) = if uncompressed_len == 0 {
        (body[consumed..].to_vec(), false)
    } else {
        let mut inflated = Vec::new();
        ZlibDecoder::new(&body[consumed..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated.len(), uncompressed_len as usize);
        (inflated, true)
    };

    let (id, consumed) = read_varint(&packet, 0).unwrap();
    (id, packet[consumed..].to_vec(), was_deflated)
}
