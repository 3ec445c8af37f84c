//! End-to-end bridge test over loopback UDP.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

use dsu_bridge::bridge::Bridge;
use dsu_bridge::config::Config;
use dsu_bridge::dsu::crc::crc32;
use dsu_bridge::dsu::encoder::{finalize_crc, write_header};
use dsu_bridge::dsu::protocol::*;

const TIMEOUT: Duration = Duration::from_secs(2);

fn request(message_type: MessageType, payload: &[u8]) -> Vec<u8> {
    let mut frame = write_header(DSU_MAGIC_CLIENT, DSU_PROTOCOL_VERSION, 0x5EED, message_type, payload.len());
    frame.extend_from_slice(payload);
    finalize_crc(&mut frame);
    frame.to_vec()
}

fn pose_datagram(values: [f64; 6]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn read_u32(frame: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(frame[offset..offset + 4].try_into().unwrap())
}

fn read_f32(frame: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(frame[offset..offset + 4].try_into().unwrap())
}

fn crc_is_valid(frame: &[u8]) -> bool {
    let mut copy = frame.to_vec();
    let stored = read_u32(&copy, 8);
    copy[8..12].fill(0);
    crc32(&copy) == stored
}

async fn recv(socket: &UdpSocket) -> Vec<u8> {
    let mut buf = [0u8; 256];
    let (len, _) = tokio::time::timeout(TIMEOUT, socket.recv_from(&mut buf))
        .await
        .expect("timed out waiting for a datagram")
        .unwrap();
    buf[..len].to_vec()
}

async fn start_bridge() -> (Bridge, SocketAddr, SocketAddr) {
    let mut config = Config::default();
    config.tracking.port = 0;
    config.dsu.port = 0;
    config.dsu.server_id = Some(0xB21D_6E00);

    let bridge = Bridge::start(&config).await.unwrap();
    let tracking = bridge.tracking_addr();
    let dsu = bridge.dsu_addr().unwrap();
    (bridge, tracking, dsu)
}

#[tokio::test]
async fn test_version_and_ports_requests() {
    let (bridge, _, dsu) = start_bridge().await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    client.send_to(&request(MessageType::Version, &[]), dsu).await.unwrap();
    let version = recv(&client).await;
    assert_eq!(&version[0..4], b"DSUS");
    assert_eq!(read_u32(&version, 12), 0xB21D_6E00);
    assert_eq!(read_u32(&version, 16), MessageType::Version.as_u32());
    assert_eq!(u16::from_le_bytes([version[20], version[21]]), 1001);
    assert!(crc_is_valid(&version));

    client.send_to(&request(MessageType::Ports, &[1, 0, 0, 0, 0]), dsu).await.unwrap();
    let ports = recv(&client).await;
    assert_eq!(ports.len(), DSU_HEADER_SIZE + PORT_RESPONSE_PAYLOAD_SIZE);
    assert_eq!(read_u32(&ports, 16), MessageType::Ports.as_u32());
    assert!(crc_is_valid(&ports));

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_tracking_samples_are_broadcast_to_registered_clients() {
    let (bridge, tracking, dsu) = start_bridge().await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let tracker = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    client.send_to(&request(MessageType::PadData, &[0u8; 8]), dsu).await.unwrap();
    // Requests are handled in order, so this reply means the client is registered
    client.send_to(&request(MessageType::Version, &[]), dsu).await.unwrap();
    recv(&client).await;

    tracker
        .send_to(&pose_datagram([1.0, 2.0, 3.0, 10.0, 20.0, 30.0]), tracking)
        .await
        .unwrap();
    let first = recv(&client).await;

    assert_eq!(first.len(), DSU_HEADER_SIZE + PAD_DATA_RESPONSE_PAYLOAD_SIZE);
    assert_eq!(read_u32(&first, 16), MessageType::PadData.as_u32());
    assert!(crc_is_valid(&first));
    assert_eq!(first[31], 1); // connected
    assert_eq!(read_u32(&first, 32), 0); // packet number

    // First sample after start is a diff from zero over one second
    assert_eq!(read_f32(&first, 76), 1.0);
    assert_eq!(read_f32(&first, 80), 2.0);
    assert_eq!(read_f32(&first, 84), 3.0);
    assert_eq!(read_f32(&first, 88), 20.0); // pitch
    assert_eq!(read_f32(&first, 92), 10.0); // yaw
    assert_eq!(read_f32(&first, 96), 30.0); // roll

    // Stop marker
    tracker.send_to(&pose_datagram([0.0; 6]), tracking).await.unwrap();
    let second = recv(&client).await;
    assert_eq!(read_u32(&second, 32), 1);
    assert!((76..100).step_by(4).all(|offset| read_f32(&second, offset) == 0.0));

    // Undersized tracking datagrams produce nothing
    tracker.send_to(&[0u8; 47], tracking).await.unwrap();
    let mut buf = [0u8; 256];
    assert!(tokio::time::timeout(Duration::from_millis(200), client.recv_from(&mut buf))
        .await
        .is_err());

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_corrupt_requests_get_no_reply() {
    let (bridge, _, dsu) = start_bridge().await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut corrupt = request(MessageType::Version, &[]);
    corrupt[13] ^= 0x80;
    client.send_to(&corrupt, dsu).await.unwrap();

    let mut buf = [0u8; 256];
    assert!(tokio::time::timeout(Duration::from_millis(200), client.recv_from(&mut buf))
        .await
        .is_err());

    bridge.shutdown().await;
}
