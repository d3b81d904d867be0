//! HCI transport over USB
//!
//! Selects a backend for the running platform, binds a USB Bluetooth
//! controller and moves tagged HCI packets in both directions.

pub mod config;
pub mod factory;
pub mod transport;
pub mod unsupported;
pub mod usb;

pub use factory::{
    BackendKind, create_transport, parse_backend_choice, resolve_backend, resolve_current,
};
pub use transport::Transport;
pub use unsupported::UnsupportedTransport;
pub use usb::UsbTransport;
