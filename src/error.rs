//! # Error Types
//!
//! Custom error types for DSU Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for DSU Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// DSU frame rejected by the header codec
    #[error("DSU protocol error: {0}")]
    DsuProtocol(String),

    /// Tracking-source datagram could not be decoded
    #[error("Tracking datagram error: {0}")]
    TrackingDatagram(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for DSU Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
