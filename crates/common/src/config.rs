//! Bind configuration
//!
//! Device selection parameters can come from the caller or from the process
//! environment. Each field is resolved on its own:
//!
//! ```text
//! explicit argument  >  BLUETOOTH_HCI_SOCKET_USB_*  >  unset
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable naming the USB vendor ID
pub const ENV_USB_VID: &str = "BLUETOOTH_HCI_SOCKET_USB_VID";
/// Environment variable naming the USB product ID
pub const ENV_USB_PID: &str = "BLUETOOTH_HCI_SOCKET_USB_PID";
/// Environment variable naming the USB bus number
pub const ENV_USB_BUS: &str = "BLUETOOTH_HCI_SOCKET_USB_BUS";
/// Environment variable naming the USB device address
pub const ENV_USB_ADDRESS: &str = "BLUETOOTH_HCI_SOCKET_USB_ADDRESS";

/// USB device selection parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbParams {
    #[serde(default)]
    pub vid: Option<u16>,
    #[serde(default)]
    pub pid: Option<u16>,
    #[serde(default)]
    pub bus: Option<u8>,
    #[serde(default)]
    pub address: Option<u8>,
}

impl UsbParams {
    /// Read parameters from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read parameters through an arbitrary key lookup
    ///
    /// Values are decimal, or hexadecimal with a `0x` prefix. Values that do
    /// not parse are logged and treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            vid: lookup(ENV_USB_VID).and_then(|v| parse_field(ENV_USB_VID, &v)),
            pid: lookup(ENV_USB_PID).and_then(|v| parse_field(ENV_USB_PID, &v)),
            bus: lookup(ENV_USB_BUS).and_then(|v| parse_field(ENV_USB_BUS, &v)),
            address: lookup(ENV_USB_ADDRESS).and_then(|v| parse_field(ENV_USB_ADDRESS, &v)),
        }
    }

    /// Merge explicit parameters over environment parameters, field by field
    pub fn resolve(explicit: Option<&UsbParams>, env: &UsbParams) -> UsbParams {
        let explicit = explicit.copied().unwrap_or_default();
        UsbParams {
            vid: explicit.vid.or(env.vid),
            pid: explicit.pid.or(env.pid),
            bus: explicit.bus.or(env.bus),
            address: explicit.address.or(env.address),
        }
    }

    /// Both VID and PID are set
    pub fn has_ids(&self) -> bool {
        self.vid.is_some() && self.pid.is_some()
    }

    /// Both bus and address are set, pinning one physical port
    pub fn has_location(&self) -> bool {
        self.bus.is_some() && self.address.is_some()
    }
}

/// Parse an integer from decimal or `0x`-prefixed hexadecimal
pub fn parse_int<T>(value: &str) -> Option<T>
where
    T: TryFrom<u32>,
{
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => value.parse::<u32>().ok()?,
    };
    T::try_from(parsed).ok()
}

fn parse_field<T>(key: &str, value: &str) -> Option<T>
where
    T: TryFrom<u32>,
{
    let parsed = parse_int(value);
    if parsed.is_none() {
        warn!("Ignoring {}={:?}: not a valid integer for this field", key, value);
    }
    parsed
}
