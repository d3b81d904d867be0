//! HCI packet and USB error type definitions
//!
//! This module defines the tagged packet types surfaced to transport users
//! and the USB error vocabulary shared by every backend.

use crate::error::ProtocolError;
use crate::hci::{HCI_ACLDATA_PKT, HCI_COMMAND_PKT, HCI_EVENT_PKT, HCI_SCODATA_PKT};
use bytes::Bytes;
use thiserror::Error;

/// HCI packet type, identified by the leading tag byte of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Host to controller command (tag 0x01)
    Command,
    /// Asynchronous Connection-Less data (tag 0x02)
    AclData,
    /// Synchronous audio data (tag 0x03)
    ScoData,
    /// Controller to host event (tag 0x04)
    Event,
}

impl PacketType {
    /// Wire tag for this packet type
    pub fn tag(self) -> u8 {
        match self {
            PacketType::Command => HCI_COMMAND_PKT,
            PacketType::AclData => HCI_ACLDATA_PKT,
            PacketType::ScoData => HCI_SCODATA_PKT,
            PacketType::Event => HCI_EVENT_PKT,
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            HCI_COMMAND_PKT => Ok(PacketType::Command),
            HCI_ACLDATA_PKT => Ok(PacketType::AclData),
            HCI_SCODATA_PKT => Ok(PacketType::ScoData),
            HCI_EVENT_PKT => Ok(PacketType::Event),
            other => Err(ProtocolError::InvalidPacketType(other)),
        }
    }
}

/// A complete inbound HCI frame
///
/// The wrapped bytes are the frame exactly as it arrived from the controller,
/// without the packet type tag. Use [`HciPacket::to_tagged`] for the
/// tag-prefixed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HciPacket {
    /// `[eventCode][paramLength][params...]`
    Event(Bytes),
    /// `[handle: u16 LE][dataLength: u16 LE][payload...]`
    AclData(Bytes),
}

impl HciPacket {
    pub fn packet_type(&self) -> PacketType {
        match self {
            HciPacket::Event(_) => PacketType::Event,
            HciPacket::AclData(_) => PacketType::AclData,
        }
    }

    /// Frame bytes without the tag
    pub fn frame(&self) -> &Bytes {
        match self {
            HciPacket::Event(frame) | HciPacket::AclData(frame) => frame,
        }
    }

    /// Frame bytes prefixed with the one-byte packet type tag
    pub fn to_tagged(&self) -> Vec<u8> {
        let frame = self.frame();
        let mut tagged = Vec::with_capacity(1 + frame.len());
        tagged.push(self.packet_type().tag());
        tagged.extend_from_slice(frame);
        tagged
    }
}

/// USB error types
///
/// Maps to libusb error codes. See rusb::Error for details.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsbError {
    /// Transfer timed out
    #[error("operation timed out")]
    Timeout,
    /// Endpoint stalled (protocol error)
    #[error("endpoint stalled")]
    Pipe,
    /// Device was disconnected
    #[error("no such device (it may have been disconnected)")]
    NoDevice,
    /// Device or endpoint not found
    #[error("entity not found")]
    NotFound,
    /// Device is busy
    #[error("resource busy")]
    Busy,
    /// Buffer overflow
    #[error("overflow")]
    Overflow,
    /// I/O error
    #[error("input/output error")]
    Io,
    /// Invalid parameter
    #[error("invalid parameter")]
    InvalidParam,
    /// Access denied (permissions)
    #[error("access denied (insufficient permissions)")]
    Access,
    /// Other error with message
    #[error("{message}")]
    Other { message: String },
}
