//! # Transport Module
//!
//! UDP plumbing for both endpoints.
//!
//! This module handles:
//! - One receive loop per socket (tracking source, DSU clients)
//! - Handing decoded pose samples to the broadcast worker over a channel
//! - Fire-and-forget UDP sends to DSU clients
//! - Shutdown signalling

pub mod broadcast;
pub mod listener;

use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::watch;

/// Receive buffer for DSU client frames
pub const DSU_RECV_BUFFER_SIZE: usize = 1024;

/// Receive buffer for tracking datagrams
pub const TRACKING_RECV_BUFFER_SIZE: usize = 100;

/// Trait for sending datagrams, so broadcast and reply paths can be tested
#[cfg_attr(test, mockall::automock)]
pub trait DatagramSink: Send + Sync {
    /// Send one datagram without waiting; a full socket buffer drops it
    fn send_datagram(&self, data: &[u8], target: SocketAddr) -> io::Result<usize>;
}

impl DatagramSink for UdpSocket {
    fn send_datagram(&self, data: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.try_send_to(data, target)
    }
}

/// Resolve once shutdown has been requested or the signal sender is gone
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // An Err means the sender was dropped, which also ends the loops
    let _ = shutdown.wait_for(|&stop| stop).await;
}

/// Receive errors that say nothing about the socket itself
///
/// An ICMP port-unreachable from a vanished client surfaces as a connection
/// reset on the next receive of an unconnected UDP socket.
pub fn is_transient_receive_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_receive_errors() {
        assert!(is_transient_receive_error(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_transient_receive_error(&io::Error::from(io::ErrorKind::ConnectionRefused)));
        assert!(!is_transient_receive_error(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_shutdown_requested_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { shutdown_requested(&mut rx).await });

        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("shutdown not observed")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_requested_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(1), shutdown_requested(&mut rx))
            .await
            .expect("dropped sender should end the wait");
    }

    #[tokio::test]
    async fn test_udp_socket_sink_sends() {
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        // try_send_to may need the socket to be writable first
        sender.writable().await.unwrap();
        assert_eq!(sender.send_datagram(b"DSUS", target).unwrap(), 4);

        let mut buf = [0u8; 16];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"DSUS");
    }
}
