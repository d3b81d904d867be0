//! `rusb` implementation of the USB capability surface
//!
//! This module provides the production bus over libusb and maps rusb errors
//! to the transport's USB error vocabulary.

use super::backend::{Endpoint, TransferKind, UsbBus, UsbHandle};
use common::{Error, Result, UsbDeviceSummary};
use protocol::UsbError;
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, warn};

/// libusb-backed device bus
pub struct RusbBus {
    context: Context,
}

impl RusbBus {
    /// Create a new libusb context
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(map_rusb_error)?;
        Ok(Self { context })
    }

    fn find_device(&self, wanted: &UsbDeviceSummary) -> Result<Device<Context>> {
        let devices = self.context.devices().map_err(map_rusb_error)?;
        devices
            .iter()
            .find(|d| d.bus_number() == wanted.bus_number && d.address() == wanted.device_address)
            .ok_or(Error::DeviceNotFound)
    }
}

impl UsbBus for RusbBus {
    type Handle = RusbHandle;

    fn devices(&self) -> Result<Vec<UsbDeviceSummary>> {
        let devices = self.context.devices().map_err(map_rusb_error)?;
        let mut summaries = Vec::with_capacity(devices.len());

        for device in devices.iter() {
            match device.device_descriptor() {
                Ok(desc) => summaries.push(UsbDeviceSummary {
                    vendor_id: desc.vendor_id(),
                    product_id: desc.product_id(),
                    bus_number: device.bus_number(),
                    device_address: device.address(),
                }),
                Err(e) => {
                    debug!(
                        "Skipping device bus={}, addr={}: no descriptor ({})",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                }
            }
        }

        debug!("Enumerated {} devices", summaries.len());
        Ok(summaries)
    }

    fn open(&self, device: &UsbDeviceSummary) -> Result<RusbHandle> {
        let handle = self
            .find_device(device)?
            .open()
            .map_err(|e| {
                warn!("Failed to open device: {}", e);
                map_rusb_error(e)
            })?;

        debug!(
            "Opened device {:04x}:{:04x} on bus {} address {}",
            device.vendor_id, device.product_id, device.bus_number, device.device_address
        );

        Ok(RusbHandle {
            handle,
            claimed_interfaces: Vec::new(),
            detached_interfaces: Vec::new(),
        })
    }
}

/// Opened libusb device
///
/// Claimed interfaces are released, and detached kernel drivers reattached,
/// when the handle is dropped.
pub struct RusbHandle {
    handle: DeviceHandle<Context>,
    claimed_interfaces: Vec<u8>,
    detached_interfaces: Vec<u8>,
}

impl UsbHandle for RusbHandle {
    fn set_configuration(&mut self, config: u8) -> Result<()> {
        self.handle
            .set_active_configuration(config)
            .map_err(map_rusb_error)?;
        debug!("Set active configuration {}", config);
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<()> {
        // The OS Bluetooth driver usually owns the controller
        match self.handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                match self.handle.detach_kernel_driver(interface) {
                    Ok(()) => self.detached_interfaces.push(interface),
                    Err(e) => warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    ),
                }
            }
            Ok(false) => {}
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
            }
        }

        self.handle
            .claim_interface(interface)
            .map_err(map_rusb_error)?;
        self.claimed_interfaces.push(interface);

        debug!("Claimed interface {}", interface);
        Ok(())
    }

    fn endpoint(&self, interface: u8, address: u8) -> Result<Endpoint> {
        let config = self
            .handle
            .device()
            .active_config_descriptor()
            .map_err(map_rusb_error)?;

        for iface in config.interfaces().filter(|i| i.number() == interface) {
            for alt in iface.descriptors() {
                for ep in alt.endpoint_descriptors() {
                    if ep.address() == address {
                        return Ok(Endpoint {
                            address,
                            kind: map_transfer_type(ep.transfer_type()),
                            max_packet_size: ep.max_packet_size(),
                        });
                    }
                }
            }
        }

        Err(Error::EndpointNotFound(address))
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize> {
        self.handle
            .write_control(request_type, request, value, index, data, timeout)
            .map_err(map_rusb_error)
    }

    fn write_bulk(&self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize> {
        self.handle
            .write_bulk(endpoint, data, timeout)
            .map_err(map_rusb_error)
    }

    fn read(&self, endpoint: &Endpoint, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let result = match endpoint.kind {
            TransferKind::Interrupt => self.handle.read_interrupt(endpoint.address, buf, timeout),
            TransferKind::Bulk => self.handle.read_bulk(endpoint.address, buf, timeout),
            other => {
                return Err(Error::Unsupported(format!(
                    "{:?} reads on endpoint {:#04x}",
                    other, endpoint.address
                )));
            }
        };
        result.map_err(map_rusb_error)
    }
}

impl Drop for RusbHandle {
    fn drop(&mut self) {
        for interface in self.claimed_interfaces.drain(..) {
            if let Err(e) = self.handle.release_interface(interface) {
                warn!("Failed to release interface {}: {}", interface, e);
            }
        }

        for interface in self.detached_interfaces.drain(..) {
            if let Err(e) = self.handle.attach_kernel_driver(interface) {
                debug!(
                    "Could not reattach kernel driver to interface {}: {}",
                    interface, e
                );
            } else {
                debug!("Reattached kernel driver to interface {}", interface);
            }
        }
    }
}

fn map_transfer_type(transfer_type: rusb::TransferType) -> TransferKind {
    match transfer_type {
        rusb::TransferType::Control => TransferKind::Control,
        rusb::TransferType::Isochronous => TransferKind::Isochronous,
        rusb::TransferType::Bulk => TransferKind::Bulk,
        rusb::TransferType::Interrupt => TransferKind::Interrupt,
    }
}

/// Map rusb::Error to the transport's USB error
pub fn map_rusb_error(err: rusb::Error) -> Error {
    let usb = match err {
        rusb::Error::Timeout => UsbError::Timeout,
        rusb::Error::Pipe => UsbError::Pipe,
        rusb::Error::NoDevice => UsbError::NoDevice,
        rusb::Error::NotFound => UsbError::NotFound,
        rusb::Error::Busy => UsbError::Busy,
        rusb::Error::Overflow => UsbError::Overflow,
        rusb::Error::Io => UsbError::Io,
        rusb::Error::InvalidParam => UsbError::InvalidParam,
        rusb::Error::Access => UsbError::Access,
        _ => UsbError::Other {
            message: err.to_string(),
        },
    };
    Error::Usb(usb)
}
