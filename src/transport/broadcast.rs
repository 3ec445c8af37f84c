//! # Broadcast Worker
//!
//! Consumes pose samples from the tracking listener and sends one PadData
//! frame per live DSU client for each sample. Samples are handled one at a
//! time, so broadcast rounds never overlap.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::{shutdown_requested, DatagramSink};
use crate::dsu::encoder::{encode_pad_data_response, motion_timestamp_now};
use crate::session::SessionRegistry;
use crate::tracking::PoseSample;

/// Sends PadData frames to every registered client
pub struct Broadcaster {
    sink: Arc<dyn DatagramSink>,
    sessions: Arc<SessionRegistry>,
    server_id: u32,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("server_id", &self.server_id)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Broadcaster {
    pub fn new(sink: Arc<dyn DatagramSink>, sessions: Arc<SessionRegistry>, server_id: u32) -> Self {
        Self {
            sink,
            sessions,
            server_id,
        }
    }

    /// Run one broadcast round for a sample
    ///
    /// # Returns
    ///
    /// * `usize` - Number of frames handed to the socket
    ///
    /// A failed send is logged and does not affect other clients.
    pub fn broadcast(&self, sample: &PoseSample) -> usize {
        let recipients = self.sessions.broadcast_round();
        if recipients.is_empty() {
            return 0;
        }

        let motion_timestamp = motion_timestamp_now();
        let mut sent = 0;

        for (endpoint, packet_number) in recipients {
            let frame = encode_pad_data_response(self.server_id, packet_number, sample, motion_timestamp);
            match self.sink.send_datagram(&frame, endpoint) {
                Ok(_) => sent += 1,
                Err(e) => debug!("Failed to send pad data to {}: {}", endpoint, e),
            }
        }

        sent
    }
}

/// Where processed samples go
#[derive(Debug)]
pub enum SampleOutput {
    /// Broadcast to DSU clients
    Dsu(Broadcaster),
    /// Debug mode: log each sample as JSON
    Print,
}

impl SampleOutput {
    fn deliver(&self, sample: &PoseSample) {
        match self {
            SampleOutput::Dsu(broadcaster) => {
                broadcaster.broadcast(sample);
            }
            SampleOutput::Print => match serde_json::to_string(sample) {
                Ok(json) => info!("Tracking sample: {}", json),
                Err(e) => debug!("Failed to format sample: {}", e),
            },
        }
    }
}

/// Drain the sample queue until shutdown or until the listener goes away
pub async fn run_broadcast_worker(
    mut samples: mpsc::UnboundedReceiver<PoseSample>,
    output: SampleOutput,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut delivered: u64 = 0;

    loop {
        tokio::select! {
            sample = samples.recv() => {
                let Some(sample) = sample else { break };
                output.deliver(&sample);
                delivered += 1;
            }
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }

    info!("Broadcast worker stopped after {} samples", delivered);
}
