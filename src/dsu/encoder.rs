//! # DSU Packet Encoder
//!
//! Builds DSU server frames. Headers are written with a zeroed CRC field,
//! the payload is appended, and [`finalize_crc`] checksums the whole frame once.

use bytes::{BufMut, Bytes, BytesMut};

use super::crc::crc32;
use super::protocol::*;
use crate::tracking::PoseSample;

/// Write a DSU header with the CRC field left zero
///
/// # Arguments
///
/// * `magic` - "DSUS" for server frames ("DSUC" is only used by tests and clients)
/// * `protocol_version` - Version to advertise
/// * `id` - Server or client id
/// * `message_type` - Message type
/// * `payload_len` - Bytes that will follow the header
///
/// # Returns
///
/// * `BytesMut` - 20-byte header with room reserved for the payload
pub fn write_header(
    magic: [u8; 4],
    protocol_version: u16,
    id: u32,
    message_type: MessageType,
    payload_len: usize,
) -> BytesMut {
    let mut frame = BytesMut::with_capacity(DSU_HEADER_SIZE + payload_len);
    frame.put_slice(&magic);
    frame.put_u16_le(protocol_version);
    frame.put_u16_le((payload_len + DSU_PACKET_SIZE_OVERHEAD) as u16);
    frame.put_u32_le(0); // crc placeholder
    frame.put_u32_le(id);
    frame.put_u32_le(message_type.as_u32());
    frame
}

/// Compute the CRC over the complete frame and store it in the CRC field
///
/// The CRC is computed with the field zeroed, so finalizing twice is harmless.
pub fn finalize_crc(frame: &mut [u8]) {
    frame[DSU_CRC_OFFSET..DSU_CRC_OFFSET + 4].fill(0);
    let crc = crc32(frame);
    frame[DSU_CRC_OFFSET..DSU_CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());
}

/// Append a ControllerInfo block (11 bytes)
pub fn put_controller_info(frame: &mut BytesMut, info: &ControllerInfo) {
    frame.put_u8(info.slot);
    frame.put_u8(info.slot_state);
    frame.put_u8(info.device_model);
    frame.put_u8(info.connection_type);
    frame.put_slice(&info.mac_address);
    frame.put_u8(info.battery_status);
}

fn put_touch_data(frame: &mut BytesMut, touch: &TouchData) {
    frame.put_u8(touch.is_active);
    frame.put_u8(touch.id);
    frame.put_u16_le(touch.x);
    frame.put_u16_le(touch.y);
}

/// Append a ControllerData block (69 bytes)
pub fn put_controller_data(frame: &mut BytesMut, data: &ControllerData) {
    frame.put_u8(data.connected);
    frame.put_u32_le(data.packet_number);
    frame.put_slice(&data.buttons);
    put_touch_data(frame, &data.first_touch);
    put_touch_data(frame, &data.second_touch);
    frame.put_u64_le(data.motion_timestamp);
    frame.put_f32_le(data.accel_x);
    frame.put_f32_le(data.accel_y);
    frame.put_f32_le(data.accel_z);
    frame.put_f32_le(data.gyro_pitch);
    frame.put_f32_le(data.gyro_yaw);
    frame.put_f32_le(data.gyro_roll);
}

fn server_header(server_id: u32, message_type: MessageType, payload_len: usize) -> BytesMut {
    write_header(DSU_MAGIC_SERVER, DSU_PROTOCOL_VERSION, server_id, message_type, payload_len)
}

/// Encode a version response advertising protocol 1001
///
/// # Examples
///
/// ```
/// use dsu_bridge::dsu::encoder::encode_version_response;
///
/// let frame = encode_version_response(7);
/// assert_eq!(frame.len(), 22);
/// assert_eq!(&frame[0..4], b"DSUS");
/// ```
pub fn encode_version_response(server_id: u32) -> Bytes {
    let mut frame = server_header(server_id, MessageType::Version, VERSION_RESPONSE_PAYLOAD_SIZE);
    frame.put_u16_le(DSU_PROTOCOL_VERSION);
    finalize_crc(&mut frame);
    frame.freeze()
}

/// Encode a port response describing the virtual controller in slot 0
pub fn encode_port_response(server_id: u32) -> Bytes {
    let mut frame = server_header(server_id, MessageType::Ports, PORT_RESPONSE_PAYLOAD_SIZE);
    put_controller_info(&mut frame, &ControllerInfo::virtual_slot());
    frame.put_u8(0); // reserved
    finalize_crc(&mut frame);
    frame.freeze()
}

/// Encode a pad data response carrying a pose sample as motion data
///
/// # Arguments
///
/// * `server_id` - Server id echoed in the header
/// * `packet_number` - Per-client packet counter
/// * `sample` - Pose sample; x/y/z go to the accelerometer, yaw/pitch/roll to the gyro
/// * `motion_timestamp` - Timestamp in microseconds
pub fn encode_pad_data_response(
    server_id: u32,
    packet_number: u32,
    sample: &PoseSample,
    motion_timestamp: u64,
) -> Bytes {
    let mut frame = server_header(server_id, MessageType::PadData, PAD_DATA_RESPONSE_PAYLOAD_SIZE);
    put_controller_info(&mut frame, &ControllerInfo::virtual_slot());

    let data = ControllerData {
        accel_x: sample.x as f32,
        accel_y: sample.y as f32,
        accel_z: sample.z as f32,
        gyro_pitch: sample.pitch as f32,
        gyro_yaw: sample.yaw as f32,
        gyro_roll: sample.roll as f32,
        ..ControllerData::neutral(packet_number, motion_timestamp)
    };
    put_controller_data(&mut frame, &data);

    finalize_crc(&mut frame);
    frame.freeze()
}

/// Current wall-clock time as a motion timestamp (millisecond resolution, in microseconds)
pub fn motion_timestamp_now() -> u64 {
    (chrono::Utc::now().timestamp_millis().max(0) as u64) * 1000
}
