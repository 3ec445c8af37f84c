//! # DSU Frame Decoder
//!
//! Validates inbound DSU frames (magic, version, length, CRC).

use super::crc::crc32;
use super::protocol::*;
use crate::error::{BridgeError, Result};

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decode a complete DSU client frame
///
/// # Arguments
///
/// * `datagram` - Received datagram bytes (exactly the received length)
///
/// # Returns
///
/// * `Result<Frame>` - Decoded frame, or error if invalid
///
/// # Errors
///
/// Returns error, checked in this order, if:
/// - Datagram is shorter than a header
/// - Magic is not "DSUC"
/// - Protocol version is above 1001
/// - Declared length exceeds the datagram length
/// - CRC check fails
///
/// A datagram longer than its declared length is truncated to the declared
/// length before the CRC is checked.
pub fn decode_frame(datagram: &[u8]) -> Result<Frame> {
    if datagram.len() < DSU_HEADER_SIZE {
        return Err(BridgeError::DsuProtocol(format!(
            "Frame too short: {} bytes",
            datagram.len()
        )));
    }

    if datagram[0..4] != DSU_MAGIC_CLIENT {
        return Err(BridgeError::DsuProtocol(format!(
            "Invalid magic: {:02X?}",
            &datagram[0..4]
        )));
    }

    let protocol_version = read_u16(datagram, 4);
    if protocol_version > DSU_PROTOCOL_VERSION {
        return Err(BridgeError::DsuProtocol(format!(
            "Unsupported protocol version {}",
            protocol_version
        )));
    }

    let header = Header {
        magic: DSU_MAGIC_CLIENT,
        protocol_version,
        packet_size: read_u16(datagram, 6),
        crc32: read_u32(datagram, DSU_CRC_OFFSET),
        id: read_u32(datagram, 12),
        message_type: read_u32(datagram, 16),
    };
    let total_length = header.total_length();

    if total_length > datagram.len() {
        return Err(BridgeError::DsuProtocol(format!(
            "Frame too short: expected {} bytes, got {}",
            total_length,
            datagram.len()
        )));
    }

    if total_length < DSU_HEADER_SIZE {
        return Err(BridgeError::DsuProtocol(format!(
            "Declared length {} is smaller than a header",
            total_length
        )));
    }

    // Padded datagrams are tolerated; only the declared bytes are checked
    let mut frame = datagram[..total_length].to_vec();

    frame[DSU_CRC_OFFSET..DSU_CRC_OFFSET + 4].fill(0);
    let calculated_crc = crc32(&frame);

    if calculated_crc != header.crc32 {
        return Err(BridgeError::DsuProtocol(format!(
            "CRC mismatch: expected 0x{:08X}, got 0x{:08X}",
            calculated_crc, header.crc32
        )));
    }

    Ok(Frame {
        header,
        payload: frame[DSU_HEADER_SIZE..].to_vec(),
    })
}
