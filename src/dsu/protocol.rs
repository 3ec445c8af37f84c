//! # DSU Protocol Constants and Types
//!
//! Core definitions for the DSU (cemuhook) controller protocol.
//! All multi-byte fields are little-endian.
//!
//! ```text
//! 0       4       6       8       12      16      20
//! +-------+-------+-------+-------+-------+-------+---------
//! | magic | ver   | size  | crc32 |  id   | type  | payload
//! +-------+-------+-------+-------+-------+-------+---------
//! ```

/// Magic for frames sent by clients
pub const DSU_MAGIC_CLIENT: [u8; 4] = *b"DSUC";

/// Magic for frames sent by the server
pub const DSU_MAGIC_SERVER: [u8; 4] = *b"DSUS";

/// Highest protocol version the server accepts and advertises
pub const DSU_PROTOCOL_VERSION: u16 = 1001;

/// Header size including the message type field
pub const DSU_HEADER_SIZE: usize = 20;

/// Bytes counted in `packet_size` that precede the payload (the message type)
pub const DSU_PACKET_SIZE_OVERHEAD: usize = 4;

/// Bytes of header that are not counted in `packet_size`
pub const DSU_UNCOUNTED_HEADER_SIZE: usize = 16;

/// Offset of the CRC field within the header
pub const DSU_CRC_OFFSET: usize = 8;

/// ControllerInfo block size
pub const CONTROLLER_INFO_SIZE: usize = 11;

/// ControllerData block size
pub const CONTROLLER_DATA_SIZE: usize = 69;

/// Version response payload size
pub const VERSION_RESPONSE_PAYLOAD_SIZE: usize = 2;

/// Port response payload size (ControllerInfo + reserved byte)
pub const PORT_RESPONSE_PAYLOAD_SIZE: usize = CONTROLLER_INFO_SIZE + 1;

/// Pad data response payload size
pub const PAD_DATA_RESPONSE_PAYLOAD_SIZE: usize = CONTROLLER_INFO_SIZE + CONTROLLER_DATA_SIZE;

/// Slot state: connected
pub const SLOT_STATE_CONNECTED: u8 = 2;

/// Device model: full gyro
pub const DEVICE_MODEL_FULL_GYRO: u8 = 2;

/// Stick center value
pub const STICK_CENTER: u8 = 128;

/// DSU message types
///
/// Requests and responses share the same numeric identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    /// Protocol version information
    Version = 0x0010_0000,
    /// Information about connected controllers
    Ports = 0x0010_0001,
    /// Actual controller data
    PadData = 0x0010_0002,
}

impl MessageType {
    /// Map a raw message type value, `None` for unrecognized values
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0010_0000 => Some(MessageType::Version),
            0x0010_0001 => Some(MessageType::Ports),
            0x0010_0002 => Some(MessageType::PadData),
            _ => None,
        }
    }

    /// Raw wire value
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Parsed DSU header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// "DSUC" or "DSUS"
    pub magic: [u8; 4],

    /// Protocol version
    pub protocol_version: u16,

    /// Payload length plus the 4-byte message type
    pub packet_size: u16,

    /// CRC-32 as stored in the frame
    pub crc32: u32,

    /// Client or server id, opaque
    pub id: u32,

    /// Raw message type
    pub message_type: u32,
}

impl Header {
    /// Total frame length this header declares
    pub fn total_length(&self) -> usize {
        self.packet_size as usize + DSU_UNCOUNTED_HEADER_SIZE
    }
}

/// A validated inbound DSU frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Parsed header
    pub header: Header,

    /// Payload following the header, already truncated to the declared length
    pub payload: Vec<u8>,
}

impl Frame {
    /// Recognized message type, if any
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u32(self.header.message_type)
    }
}

/// Controller slot description (11 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerInfo {
    pub slot: u8,
    pub slot_state: u8,
    pub device_model: u8,
    pub connection_type: u8,
    pub mac_address: [u8; 6],
    pub battery_status: u8,
}

impl ControllerInfo {
    /// The single always-connected virtual controller in slot 0
    pub fn virtual_slot() -> Self {
        Self {
            slot: 0,
            slot_state: SLOT_STATE_CONNECTED,
            device_model: DEVICE_MODEL_FULL_GYRO,
            connection_type: 0,
            mac_address: [0; 6],
            battery_status: 0,
        }
    }
}

/// One touch point (inactive in everything this server sends)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchData {
    pub is_active: u8,
    pub id: u8,
    pub x: u16,
    pub y: u16,
}

/// Controller state block (69 bytes on the wire)
///
/// Button and axis bytes are laid out in wire order. Only the motion fields
/// carry real data; everything else holds neutral values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerData {
    pub connected: u8,
    pub packet_number: u32,

    /// Buttons, sticks, d-pad and analog buttons (20 bytes)
    pub buttons: [u8; 20],

    pub first_touch: TouchData,
    pub second_touch: TouchData,

    /// Motion timestamp in microseconds
    pub motion_timestamp: u64,

    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
    pub gyro_pitch: f32,
    pub gyro_yaw: f32,
    pub gyro_roll: f32,
}

/// Neutral button block: sticks centered, everything else released
pub const NEUTRAL_BUTTONS: [u8; 20] = {
    let mut buttons = [0u8; 20];
    // left stick x/y, right stick x/y
    buttons[4] = STICK_CENTER;
    buttons[5] = STICK_CENTER;
    buttons[6] = STICK_CENTER;
    buttons[7] = STICK_CENTER;
    buttons
};

impl ControllerData {
    /// Connected controller with neutral inputs and zero motion
    pub fn neutral(packet_number: u32, motion_timestamp: u64) -> Self {
        Self {
            connected: 1,
            packet_number,
            buttons: NEUTRAL_BUTTONS,
            first_touch: TouchData::default(),
            second_touch: TouchData::default(),
            motion_timestamp,
            accel_x: 0.0,
            accel_y: 0.0,
            accel_z: 0.0,
            gyro_pitch: 0.0,
            gyro_yaw: 0.0,
            gyro_roll: 0.0,
        }
    }
}
