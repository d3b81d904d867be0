//! USB capability surface
//!
//! The transport only needs a handful of USB primitives: enumerate, open,
//! configure, claim, look up an endpoint, and move bytes. They are expressed
//! as traits so the HCI logic can run against `rusb` in production and an
//! in-memory bus in tests.

use common::{Result, UsbDeviceSummary};
use std::time::Duration;

/// USB transfer type of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// A resolved endpoint on the claimed interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Endpoint address, bit 7 set for IN
    pub address: u8,
    pub kind: TransferKind,
    pub max_packet_size: u16,
}

impl Endpoint {
    pub fn is_in(&self) -> bool {
        (self.address & 0x80) != 0
    }
}

/// Access to the set of attached USB devices
pub trait UsbBus: Send + Sync + 'static {
    type Handle: UsbHandle;

    /// Enumerate attached devices in bus order
    fn devices(&self) -> Result<Vec<UsbDeviceSummary>>;

    /// Open a previously enumerated device
    fn open(&self, device: &UsbDeviceSummary) -> Result<Self::Handle>;
}

/// An opened USB device
///
/// Setup calls take `&mut self` and happen once at bind time; transfer calls
/// take `&self` so the handle can be shared with the polling threads.
pub trait UsbHandle: Send + Sync + 'static {
    fn set_configuration(&mut self, config: u8) -> Result<()>;

    fn claim_interface(&mut self, interface: u8) -> Result<()>;

    /// Find an endpoint by address on the given interface of the active configuration
    fn endpoint(&self, interface: u8, address: u8) -> Result<Endpoint>;

    /// Host-to-device control transfer on endpoint 0
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize>;

    /// Host-to-device bulk transfer
    fn write_bulk(&self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Device-to-host read, using the endpoint's own transfer type
    fn read(&self, endpoint: &Endpoint, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}
