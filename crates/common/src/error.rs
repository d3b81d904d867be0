//! Common error types

use crate::usb_types::Mode;
use protocol::{ProtocolError, UsbError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No compatible USB Bluetooth device found")]
    DeviceNotFound,

    #[error("USB error: {0}")]
    Usb(#[from] UsbError),

    #[error("Endpoint {0:#04x} not found on interface 0")]
    EndpointNotFound(u8),

    #[error("Cannot {operation} while in {mode} mode")]
    InvalidState { operation: &'static str, mode: Mode },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures reported by the USB layer itself
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::Usb(_) | Error::EndpointNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
