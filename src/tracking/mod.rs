//! # Tracking Module
//!
//! Head-tracking input (opentrack "UDP over network" output).
//!
//! This module handles:
//! - Decoding the 48-byte pose datagram (six little-endian f64)
//! - Converting absolute poses into the rates carried as DSU motion

pub mod transform;

use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Size of a pose datagram: x, y, z, yaw, pitch, roll as f64
pub const TRACKING_DATAGRAM_SIZE: usize = 48;

/// Six-axis pose: position x/y/z and orientation yaw/pitch/roll (degrees)
///
/// Holds either an absolute reading or a per-second rate, depending on
/// where it sits in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PoseSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl PoseSample {
    /// Build a sample from channels in wire order
    pub fn from_channels(channels: [f64; 6]) -> Self {
        Self {
            x: channels[0],
            y: channels[1],
            z: channels[2],
            yaw: channels[3],
            pitch: channels[4],
            roll: channels[5],
        }
    }

    /// Channels in wire order
    pub fn channels(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.yaw, self.pitch, self.roll]
    }

    /// True when every channel is exactly 0.0 (the tracker's stop marker)
    pub fn is_zero(&self) -> bool {
        self.channels().iter().all(|&value| value == 0.0)
    }
}

/// Decode a tracking-source datagram
///
/// # Arguments
///
/// * `datagram` - Received bytes; anything past the first 48 bytes is ignored
///
/// # Errors
///
/// Returns error if the datagram is shorter than 48 bytes
pub fn decode_tracking_datagram(datagram: &[u8]) -> Result<PoseSample> {
    if datagram.len() < TRACKING_DATAGRAM_SIZE {
        return Err(BridgeError::TrackingDatagram(format!(
            "Datagram too short: {} bytes",
            datagram.len()
        )));
    }

    let mut channels = [0.0f64; 6];
    for (channel, chunk) in channels.iter_mut().zip(datagram[..TRACKING_DATAGRAM_SIZE].chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *channel = f64::from_le_bytes(raw);
    }

    Ok(PoseSample::from_channels(channels))
}
