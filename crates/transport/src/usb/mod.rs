//! USB-direct HCI backend
//!
//! Talks to a Bluetooth controller through libusb instead of a kernel HCI
//! socket. Inbound endpoints are polled on dedicated threads so the blocking
//! USB reads never run on the async runtime.

pub mod backend;
pub mod binder;
pub mod matcher;
pub mod poller;
pub mod readiness;
pub mod rusb_bus;
pub mod socket;
pub mod writer;

pub use backend::{Endpoint, TransferKind, UsbBus, UsbHandle};
pub use binder::{Binder, BoundDevice, EndpointSet};
pub use readiness::ReadinessTracker;
pub use rusb_bus::RusbBus;
pub use socket::UsbTransport;
