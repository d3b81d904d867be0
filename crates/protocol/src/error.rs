//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Outbound packet had no type tag
    #[error("Empty packet: missing packet type tag")]
    EmptyPacket,

    /// Tag byte does not name an HCI packet type
    #[error("Invalid packet type: {0:#04x}")]
    InvalidPacketType(u8),

    /// Packet type is known but cannot be written over this transport
    #[error("Unsupported packet type for write: {0:?}")]
    UnsupportedPacketType(crate::PacketType),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
