//! Controller selection
//!
//! Resolves a device index and bind parameters to one enumerated device:
//!
//! 1. bus + address set: first device matching every set field; the device
//!    index is ignored since bus and address already name one port.
//! 2. vid + pid set: the `dev_id`-th device (1-based) matching them.
//! 3. otherwise: the first attached device from [`KNOWN_CONTROLLERS`], in
//!    table order.

use common::{DeviceRecord, KNOWN_CONTROLLERS, UsbDeviceSummary, UsbParams, known_controller};
use tracing::debug;

/// Pick a device from `devices`, returning its index
pub fn select_device(devices: &[UsbDeviceSummary], dev_id: i32, params: &UsbParams) -> Option<usize> {
    if params.has_location() {
        debug!(
            "Selecting by USB bus {:?}, address {:?}",
            params.bus, params.address
        );
        return nth_match(devices, 0, params);
    }

    if params.has_ids() {
        debug!(
            "Selecting by USB VID {:#06x?}, PID {:#06x?}, index {}",
            params.vid, params.pid, dev_id
        );
        return nth_match(devices, dev_id, params);
    }

    first_known(devices)
}

/// Walk `devices` counting matches down from `skip`; the match that brings
/// the count to zero or below is returned.
fn nth_match(devices: &[UsbDeviceSummary], skip: i32, params: &UsbParams) -> Option<usize> {
    let mut remaining = skip;
    for (index, device) in devices.iter().enumerate() {
        if !matches_params(device, params) {
            continue;
        }
        remaining -= 1;
        if remaining > 0 {
            continue;
        }
        return Some(index);
    }
    None
}

fn matches_params(device: &UsbDeviceSummary, params: &UsbParams) -> bool {
    params.vid.is_none_or(|vid| device.vendor_id == vid)
        && params.pid.is_none_or(|pid| device.product_id == pid)
        && params.bus.is_none_or(|bus| device.bus_number == bus)
        && params
            .address
            .is_none_or(|address| device.device_address == address)
}

fn first_known(devices: &[UsbDeviceSummary]) -> Option<usize> {
    KNOWN_CONTROLLERS.iter().find_map(|controller| {
        let index = devices
            .iter()
            .position(|d| d.vendor_id == controller.vid && d.product_id == controller.pid)?;
        debug!("Found known controller {}", controller.name);
        Some(index)
    })
}

/// Device list as reported to users: known controllers only, binding state unknown
pub fn known_devices(devices: &[UsbDeviceSummary]) -> Vec<DeviceRecord> {
    devices
        .iter()
        .filter(|d| known_controller(d.vendor_id, d.product_id).is_some())
        .map(DeviceRecord::from)
        .collect()
}
