//! Device binding and mode tracking
//!
//! ```text
//!            bind_user            mark_raw
//! Unbound ─────────────► User ─────────────► Raw
//!    │
//!    └──── bind_control ────► Control   (no device access)
//! ```
//!
//! A bind opens the selected device, selects configuration 1, claims
//! interface 0, resolves the three HCI endpoints and starts the writer
//! thread. The mode only leaves `Unbound` once every step has succeeded; a
//! failed bind drops the handle, which closes the device again.

use super::backend::{Endpoint, UsbBus, UsbHandle};
use super::matcher::{known_devices, select_device};
use super::writer::UsbWriter;
use common::{DeviceRecord, Error, Mode, Result, UsbDeviceSummary, UsbParams};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration selected on the controller
pub const HCI_CONFIGURATION: u8 = 1;
/// Interface carrying the HCI endpoints
pub const HCI_INTERFACE: u8 = 0;
/// Event packets, interrupt IN
pub const EP_EVENT_IN: u8 = 0x81;
/// ACL data, bulk IN
pub const EP_ACL_IN: u8 = 0x82;
/// ACL data, bulk OUT
pub const EP_ACL_OUT: u8 = 0x02;
/// ACL data OUT on controllers numbering it 1 (Zephyr HCI USB firmware)
pub const EP_ACL_OUT_ALT: u8 = 0x01;

/// The three HCI endpoints of a bound controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSet {
    pub event_in: Endpoint,
    pub acl_in: Endpoint,
    pub acl_out: Endpoint,
}

/// An opened, configured and claimed controller
pub struct BoundDevice<H: UsbHandle> {
    pub summary: UsbDeviceSummary,
    pub handle: Arc<H>,
    pub endpoints: EndpointSet,
    pub writer: UsbWriter,
}

/// Binds one controller and tracks the transport mode
pub struct Binder<B: UsbBus> {
    bus: Arc<B>,
    env: UsbParams,
    mode: Mode,
    bound: Option<BoundDevice<B::Handle>>,
}

impl<B: UsbBus> Binder<B> {
    /// `env` holds the environment-sourced bind parameters, read once at startup
    pub fn new(bus: Arc<B>, env: UsbParams) -> Self {
        Self {
            bus,
            env,
            mode: Mode::Unbound,
            bound: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn bound(&self) -> Option<&BoundDevice<B::Handle>> {
        self.bound.as_ref()
    }

    /// Bound device, if the mode allows data transfer
    pub fn data_device(&self, operation: &'static str) -> Result<&BoundDevice<B::Handle>> {
        match (&self.bound, self.mode.is_data_mode()) {
            (Some(bound), true) => Ok(bound),
            _ => Err(Error::InvalidState {
                operation,
                mode: self.mode,
            }),
        }
    }

    /// Unbound -> User
    pub fn bind_user(&mut self, dev_id: i32, params: Option<&UsbParams>) -> Result<()> {
        self.require_unbound("bind")?;

        let params = UsbParams::resolve(params, &self.env);
        let devices = self.bus.devices()?;
        let index = select_device(&devices, dev_id, &params).ok_or(Error::DeviceNotFound)?;
        let summary = devices[index];

        info!(
            "Binding controller {:04x}:{:04x} on bus {} address {}",
            summary.vendor_id, summary.product_id, summary.bus_number, summary.device_address
        );

        let mut handle = self.bus.open(&summary)?;
        handle.set_configuration(HCI_CONFIGURATION)?;
        handle.claim_interface(HCI_INTERFACE)?;

        let endpoints = resolve_endpoints(&handle)?;
        debug!("Resolved endpoints: {:?}", endpoints);

        let handle = Arc::new(handle);
        let writer = UsbWriter::spawn(handle.clone(), endpoints.acl_out)?;

        self.bound = Some(BoundDevice {
            summary,
            handle,
            endpoints,
            writer,
        });
        self.mode = Mode::User;
        Ok(())
    }

    /// User -> Raw
    pub fn mark_raw(&mut self) -> Result<()> {
        if self.mode != Mode::User {
            return Err(Error::InvalidState {
                operation: "enter raw mode",
                mode: self.mode,
            });
        }
        self.mode = Mode::Raw;
        Ok(())
    }

    /// Unbound -> Control, without touching any device
    pub fn bind_control(&mut self) -> Result<()> {
        self.require_unbound("bind")?;
        self.mode = Mode::Control;
        Ok(())
    }

    /// Known controllers currently attached
    pub fn device_list(&self) -> Result<Vec<DeviceRecord>> {
        Ok(known_devices(&self.bus.devices()?))
    }

    fn require_unbound(&self, operation: &'static str) -> Result<()> {
        if self.mode != Mode::Unbound {
            return Err(Error::InvalidState {
                operation,
                mode: self.mode,
            });
        }
        Ok(())
    }
}

/// Resolve event-in, ACL-in and ACL-out on the HCI interface
///
/// ACL-out falls back once from 0x02 to 0x01; the IN endpoints have no fallback.
pub fn resolve_endpoints<H: UsbHandle>(handle: &H) -> Result<EndpointSet> {
    let acl_out = match handle.endpoint(HCI_INTERFACE, EP_ACL_OUT) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            warn!(
                "ACL-out endpoint {:#04x} unavailable ({}), trying {:#04x}",
                EP_ACL_OUT, e, EP_ACL_OUT_ALT
            );
            handle.endpoint(HCI_INTERFACE, EP_ACL_OUT_ALT)?
        }
    };

    let event_in = handle.endpoint(HCI_INTERFACE, EP_EVENT_IN)?;
    let acl_in = handle.endpoint(HCI_INTERFACE, EP_ACL_IN)?;

    Ok(EndpointSet {
        event_in,
        acl_in,
        acl_out,
    })
}
