//! Common utilities for hci-usb
//!
//! This crate provides functionality shared by every transport backend:
//! error handling, logging setup, bind configuration with environment
//! precedence, the known-controller table, and the outbound packet channel.

pub mod channel;
pub mod config;
pub mod error;
pub mod logging;
pub mod usb_types;

pub use channel::{PacketReceiver, PacketSender, create_packet_channel};
pub use config::UsbParams;
pub use error::{Error, Result};
pub use logging::setup_logging;
pub use usb_types::{
    DeviceRecord, KNOWN_CONTROLLERS, KnownController, Mode, UsbDeviceSummary, known_controller,
};
