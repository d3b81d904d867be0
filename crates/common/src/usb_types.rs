//! USB type abstractions shared by the transport backends

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating mode of a transport instance
///
/// Set once by a bind call. Only `User` and `Raw` allow data transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Not bound yet
    #[default]
    Unbound,
    /// Device claimed, no reset issued
    User,
    /// Device claimed and reset, readiness tracked
    Raw,
    /// Liveness/identity only, no device access
    Control,
}

impl Mode {
    /// Whether packets may flow in this mode
    pub fn is_data_mode(self) -> bool {
        matches!(self, Mode::User | Mode::Raw)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Unbound => "unbound",
            Mode::User => "user",
            Mode::Raw => "raw",
            Mode::Control => "control",
        };
        f.write_str(name)
    }
}

/// A USB Bluetooth controller model known to speak HCI over USB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownController {
    pub vid: u16,
    pub pid: u16,
    pub name: &'static str,
}

/// Controllers probed when no VID/PID is configured
///
/// Order matters: when several are attached, the first listed model wins.
pub const KNOWN_CONTROLLERS: &[KnownController] = &[
    KnownController { vid: 0x0cf3, pid: 0xe300, name: "Qualcomm Atheros QCA61x4" },
    KnownController { vid: 0x0a5c, pid: 0x21e8, name: "Broadcom BCM20702A0" },
    KnownController { vid: 0x0a5c, pid: 0x21f1, name: "Broadcom BCM20702A0" },
    KnownController { vid: 0x19ff, pid: 0x0239, name: "Broadcom BCM20702A0" },
    KnownController { vid: 0x413c, pid: 0x8143, name: "Broadcom BCM20702A0" },
    KnownController { vid: 0x0a12, pid: 0x0001, name: "CSR" },
    KnownController { vid: 0x0b05, pid: 0x17cb, name: "ASUS BT400" },
    KnownController { vid: 0x8087, pid: 0x07da, name: "Intel 6235" },
    KnownController { vid: 0x8087, pid: 0x07dc, name: "Intel 7260" },
    KnownController { vid: 0x8087, pid: 0x0a2a, name: "Intel 7265" },
    KnownController { vid: 0x8087, pid: 0x0a2b, name: "Intel 8265" },
    KnownController { vid: 0x0489, pid: 0xe07a, name: "Broadcom BCM20702A1" },
    KnownController { vid: 0x0a5c, pid: 0x6412, name: "Broadcom BCM2045A0" },
    KnownController { vid: 0x050d, pid: 0x065a, name: "Belkin BCM20702A0" },
    KnownController { vid: 0x1286, pid: 0x204c, name: "Marvell AVASTAR" },
    KnownController { vid: 0x8087, pid: 0x0025, name: "Dell Precision 5530" },
];

/// Look up a known controller by VID/PID
pub fn known_controller(vid: u16, pid: u16) -> Option<&'static KnownController> {
    KNOWN_CONTROLLERS.iter().find(|c| c.vid == vid && c.pid == pid)
}

/// Identity of one enumerated USB device, as seen by device selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsbDeviceSummary {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub device_address: u8,
}

/// Device list entry reported to transport users
///
/// `dev_id` and `dev_up` are always `None` for USB enumeration: listing a
/// device says nothing about whether it is bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub dev_id: Option<u32>,
    pub dev_up: Option<bool>,
    pub id_vendor: u16,
    pub id_product: u16,
    pub bus_number: u8,
    pub device_address: u8,
}

impl From<&UsbDeviceSummary> for DeviceRecord {
    fn from(summary: &UsbDeviceSummary) -> Self {
        Self {
            dev_id: None,
            dev_up: None,
            id_vendor: summary.vendor_id,
            id_product: summary.product_id,
            bus_number: summary.bus_number,
            device_address: summary.device_address,
        }
    }
}
