//! # DSU Message Dispatcher
//!
//! Routes validated client frames to a reply or a session registration.

use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::trace;

use super::decoder::decode_frame;
use super::encoder::{encode_port_response, encode_version_response};
use super::protocol::{Frame, MessageType};
use crate::session::SessionRegistry;

/// Stateless per-message router; the only shared state is the session registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    server_id: u32,
    sessions: Arc<SessionRegistry>,
}

impl Dispatcher {
    pub fn new(server_id: u32, sessions: Arc<SessionRegistry>) -> Self {
        Self { server_id, sessions }
    }

    pub fn server_id(&self) -> u32 {
        self.server_id
    }

    /// Decode a raw datagram and dispatch it
    ///
    /// Invalid frames are dropped without a reply.
    pub fn handle_datagram(&self, datagram: &[u8], from: SocketAddr) -> Option<Bytes> {
        match decode_frame(datagram) {
            Ok(frame) => self.handle(&frame, from),
            Err(e) => {
                trace!("Dropped frame from {}: {}", from, e);
                None
            }
        }
    }

    /// Dispatch a validated frame
    ///
    /// # Returns
    ///
    /// * `Some(reply)` for Version and Ports requests
    /// * `None` for PadData requests (the sender is registered for broadcast
    ///   instead) and for unknown message types
    pub fn handle(&self, frame: &Frame, from: SocketAddr) -> Option<Bytes> {
        match frame.message_type() {
            Some(MessageType::Version) => Some(encode_version_response(self.server_id)),
            Some(MessageType::Ports) => Some(encode_port_response(self.server_id)),
            Some(MessageType::PadData) => {
                // Slot selectors in the payload are ignored
                self.sessions.touch(from);
                None
            }
            None => {
                trace!(
                    "Ignored unknown message type 0x{:08X} from {}",
                    frame.header.message_type,
                    from
                );
                None
            }
        }
    }
}
