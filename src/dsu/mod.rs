//! # DSU Protocol Module
//!
//! Implementation of the DSU (cemuhook) controller protocol, server side.
//!
//! This module handles:
//! - Frame header validation (magic, version, length)
//! - CRC-32 integrity checks
//! - Version, Ports and PadData response encoding
//! - Dispatching client requests

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod dispatcher;
pub mod crc;
