//! # Receive Loops
//!
//! One always-on receive loop per socket. Each loop has exactly one receive
//! in flight and hands every datagram, cut to its received length, to the
//! matching decode path.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace};

use super::{is_transient_receive_error, shutdown_requested};
use super::{DSU_RECV_BUFFER_SIZE, TRACKING_RECV_BUFFER_SIZE};
use crate::dsu::dispatcher::Dispatcher;
use crate::tracking::decode_tracking_datagram;
use crate::tracking::transform::PoseTransform;
use crate::tracking::PoseSample;

/// Pause after a persistent receive error before trying again
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(1);

/// Receive pose datagrams, transform them and queue them for broadcast
///
/// Datagrams shorter than 48 bytes are dropped. A receive error zeroes the
/// transform's previous sample and the loop continues.
pub async fn run_tracking_listener(
    socket: Arc<UdpSocket>,
    mut transform: PoseTransform,
    samples: mpsc::UnboundedSender<PoseSample>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; TRACKING_RECV_BUFFER_SIZE];
    let mut received: u64 = 0;

    loop {
        let result = tokio::select! {
            result = socket.recv_from(&mut buf) => result,
            _ = shutdown_requested(&mut shutdown) => break,
        };

        match result {
            Ok((len, from)) => {
                let raw = match decode_tracking_datagram(&buf[..len]) {
                    Ok(raw) => raw,
                    Err(e) => {
                        trace!("Dropped tracking datagram from {}: {}", from, e);
                        continue;
                    }
                };

                received += 1;
                let sample = transform.apply(raw);
                if samples.send(sample).is_err() {
                    debug!("Sample queue closed, stopping tracking listener");
                    break;
                }
            }
            Err(e) => {
                transform.clear_last_sample();
                if is_transient_receive_error(&e) {
                    trace!("Ignored tracking receive error: {}", e);
                } else {
                    debug!("Tracking receive error: {}", e);
                    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                }
            }
        }
    }

    info!("Tracking listener stopped after {} samples", received);
}

/// Receive DSU client requests and answer them
pub async fn run_dsu_listener(
    socket: Arc<UdpSocket>,
    dispatcher: Dispatcher,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; DSU_RECV_BUFFER_SIZE];

    loop {
        let result = tokio::select! {
            result = socket.recv_from(&mut buf) => result,
            _ = shutdown_requested(&mut shutdown) => break,
        };

        match result {
            Ok((len, from)) => {
                if let Some(reply) = dispatcher.handle_datagram(&buf[..len], from) {
                    if let Err(e) = socket.send_to(&reply, from).await {
                        debug!("Failed to reply to {}: {}", from, e);
                    }
                }
            }
            Err(e) => {
                if is_transient_receive_error(&e) {
                    trace!("Ignored DSU receive error: {}", e);
                } else {
                    debug!("DSU receive error: {}", e);
                    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                }
            }
        }
    }

    info!("DSU listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsu::encoder::{finalize_crc, write_header};
    use crate::dsu::protocol::*;
    use crate::session::SessionRegistry;

    fn pose_datagram(values: [f64; 6]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    async fn bound() -> Arc<UdpSocket> {
        Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap())
    }

    #[tokio::test]
    async fn test_tracking_listener_queues_transformed_samples() {
        let socket = bound().await;
        let target = socket.local_addr().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = tokio::spawn(run_tracking_listener(
            Arc::clone(&socket),
            PoseTransform::default(),
            tx,
            shutdown_rx,
        ));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        // Too short, dropped
        sender.send_to(&[0u8; 20], target).await.unwrap();
        sender.send_to(&pose_datagram([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), target).await.unwrap();

        let sample = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no sample")
            .unwrap();
        // First sample is a diff from zero over one second
        assert_eq!(sample.channels(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), listener).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dsu_listener_answers_version_request() {
        let socket = bound().await;
        let target = socket.local_addr().unwrap();
        let sessions = Arc::new(SessionRegistry::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = tokio::spawn(run_dsu_listener(
            Arc::clone(&socket),
            Dispatcher::new(9, Arc::clone(&sessions)),
            shutdown_rx,
        ));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut request = write_header(DSU_MAGIC_CLIENT, DSU_PROTOCOL_VERSION, 1, MessageType::Version, 0);
        finalize_crc(&mut request);
        client.send_to(&request, target).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .expect("no reply")
            .unwrap();

        assert_eq!(len, 22);
        assert_eq!(&buf[0..4], b"DSUS");
        assert_eq!(u32::from_le_bytes(buf[12..16].try_into().unwrap()), 9);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), listener).await.unwrap().unwrap();
    }
}
