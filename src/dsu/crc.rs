//! # CRC-32
//!
//! Frame checksum for DSU: IEEE CRC-32 (reflected 0xEDB88320, init and
//! final XOR 0xFFFFFFFF), computed over the whole frame with the CRC
//! field zeroed.

/// Calculate the CRC-32 of a frame
///
/// # Arguments
///
/// * `data` - Complete DSU frame with the CRC field zeroed
///
/// # Examples
///
/// ```
/// use dsu_bridge::dsu::crc::crc32;
///
/// assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
/// ```
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
