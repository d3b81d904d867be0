//! HCI wire protocol for hci-usb
//!
//! This crate defines the Host Controller Interface packet layer spoken over a
//! USB Bluetooth controller. It has no USB access of its own: it turns raw
//! inbound byte chunks into complete, tagged HCI frames and builds the
//! outbound command packets the transport writes.
//!
//! # Example
//!
//! ```
//! use protocol::{EventReassembler, HciPacket, PacketType};
//!
//! let mut events = EventReassembler::new();
//!
//! // A Command Complete event split across two USB transfers
//! assert!(events.push(&[0x0e, 0x04, 0x01]).is_empty());
//! let packets = events.push(&[0x03, 0x0c, 0x00]);
//!
//! assert_eq!(packets.len(), 1);
//! assert_eq!(packets[0].packet_type(), PacketType::Event);
//! assert_eq!(packets[0].to_tagged(), vec![0x04, 0x0e, 0x04, 0x01, 0x03, 0x0c, 0x00]);
//! ```

pub mod codec;
pub mod error;
pub mod hci;
pub mod types;

pub use codec::{AclFormat, AclReassembler, EventFormat, EventReassembler, FrameFormat, FrameReassembler};
pub use error::{ProtocolError, Result};
pub use hci::{
    HCI_ACLDATA_PKT, HCI_COMMAND_PKT, HCI_EVENT_PKT, HCI_SCODATA_PKT, OCF_RESET, OGF_HOST_CTL,
    is_reset_complete, opcode, reset_command,
};
pub use types::{HciPacket, PacketType, UsbError};
