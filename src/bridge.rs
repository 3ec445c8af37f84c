//! # Bridge
//!
//! Binds both sockets and runs the three pipeline tasks:
//!
//! ```text
//! tracking socket -> tracking listener -> queue -> broadcast worker -> DSU socket
//! DSU socket      -> DSU listener      -> dispatcher -> reply / session touch
//! ```
//!
//! The session registry is the only state shared between the two sides.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dsu::dispatcher::Dispatcher;
use crate::error::Result;
use crate::session::SessionRegistry;
use crate::tracking::transform::{PoseTransform, TransformMode};
use crate::transport::broadcast::{run_broadcast_worker, Broadcaster, SampleOutput};
use crate::transport::listener::{run_dsu_listener, run_tracking_listener};

/// A running bridge
#[derive(Debug)]
pub struct Bridge {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    tracking_addr: SocketAddr,
    dsu_addr: Option<SocketAddr>,
    server_id: Option<u32>,
}

impl Bridge {
    /// Bind sockets and start all pipelines
    ///
    /// # Errors
    ///
    /// Returns error if an address is invalid or a socket cannot be bound.
    /// Nothing is left running on error.
    pub async fn start(config: &Config) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (samples_tx, samples_rx) = mpsc::unbounded_channel();

        let tracking_socket = Arc::new(UdpSocket::bind(config.tracking.socket_addr()?).await?);
        let tracking_addr = tracking_socket.local_addr()?;
        info!("Tracking receiver listening on {}", tracking_addr);

        if config.tracking.divide_by_gravity {
            warn!("tracking.divide_by_gravity is not supported yet and is ignored");
        }

        let mut tasks = Vec::with_capacity(3);
        let mut dsu_addr = None;
        let mut server_id = None;

        let (transform, output) = if config.dsu.enabled {
            let dsu_socket = Arc::new(UdpSocket::bind(config.dsu.socket_addr()?).await?);
            let addr = dsu_socket.local_addr()?;
            let id = config.dsu.server_id.unwrap_or_else(rand::random::<u32>);
            info!("DSU server listening on {} (server id 0x{:08X})", addr, id);

            let sessions = Arc::new(SessionRegistry::new(config.dsu.client_timeout()));
            let dispatcher = Dispatcher::new(id, Arc::clone(&sessions));
            tasks.push(tokio::spawn(run_dsu_listener(
                Arc::clone(&dsu_socket),
                dispatcher,
                shutdown_rx.clone(),
            )));

            dsu_addr = Some(addr);
            server_id = Some(id);

            (
                PoseTransform::new(config.tracking.mode),
                SampleOutput::Dsu(Broadcaster::new(dsu_socket, sessions, id)),
            )
        } else {
            info!("DSU server disabled, logging raw tracking samples");
            (PoseTransform::new(TransformMode::Absolute), SampleOutput::Print)
        };

        debug!("Transform mode: {:?}", transform.mode());

        tasks.push(tokio::spawn(run_tracking_listener(
            tracking_socket,
            transform,
            samples_tx,
            shutdown_rx.clone(),
        )));
        tasks.push(tokio::spawn(run_broadcast_worker(samples_rx, output, shutdown_rx)));

        Ok(Self {
            shutdown: shutdown_tx,
            tasks,
            tracking_addr,
            dsu_addr,
            server_id,
        })
    }

    /// Bound tracking address (useful when configured with port 0)
    pub fn tracking_addr(&self) -> SocketAddr {
        self.tracking_addr
    }

    /// Bound DSU address, `None` in debug mode
    pub fn dsu_addr(&self) -> Option<SocketAddr> {
        self.dsu_addr
    }

    /// Server id advertised to clients, `None` in debug mode
    pub fn server_id(&self) -> Option<u32> {
        self.server_id
    }

    /// Stop every pipeline and wait for them to finish
    pub async fn shutdown(self) {
        // Receivers may all be gone already; that is fine
        let _ = self.shutdown.send(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Pipeline task ended abnormally: {}", e);
            }
        }

        info!("Bridge stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> Config {
        let mut config = Config::default();
        config.tracking.port = 0;
        config.dsu.port = 0;
        config
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut config = loopback_config();
        config.dsu.server_id = Some(42);

        let bridge = Bridge::start(&config).await.unwrap();
        assert_ne!(bridge.tracking_addr().port(), 0);
        assert!(bridge.dsu_addr().is_some());
        assert_eq!(bridge.server_id(), Some(42));

        tokio::time::timeout(std::time::Duration::from_secs(2), bridge.shutdown())
            .await
            .expect("shutdown hung");
    }

    #[tokio::test]
    async fn test_debug_mode_has_no_dsu_socket() {
        let mut config = loopback_config();
        config.dsu.enabled = false;

        let bridge = Bridge::start(&config).await.unwrap();
        assert!(bridge.dsu_addr().is_none());
        assert!(bridge.server_id().is_none());

        tokio::time::timeout(std::time::Duration::from_secs(2), bridge.shutdown())
            .await
            .expect("shutdown hung");
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = loopback_config();
        config.tracking.port = taken.local_addr().unwrap().port();

        assert!(Bridge::start(&config).await.is_err());
    }
}
