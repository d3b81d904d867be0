//! Backend selection
//!
//! The USB-direct backend is used where the OS offers no raw HCI socket
//! (Windows, FreeBSD) or when forced through the environment. Linux and
//! Android would use a native raw socket, which this crate does not provide.

use crate::transport::Transport;
use crate::unsupported::UnsupportedTransport;
use crate::usb::UsbTransport;
use common::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable forcing the USB backend on any platform
pub const ENV_FORCE_USB: &str = "BLUETOOTH_HCI_SOCKET_FORCE_USB";

/// Available transport implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Usb,
    Native,
    Unsupported,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Usb => "usb",
            BackendKind::Native => "native",
            BackendKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "usb" => Ok(BackendKind::Usb),
            "native" => Ok(BackendKind::Native),
            "unsupported" => Ok(BackendKind::Unsupported),
            other => Err(Error::Config(format!(
                "Unknown backend '{}', expected usb, native or auto",
                other
            ))),
        }
    }
}

/// Parse a backend name, `auto` meaning the platform default
pub fn parse_backend_choice(name: &str) -> Result<Option<BackendKind>> {
    if name.trim().eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    name.parse().map(Some)
}

fn has_native_socket(os: &str) -> bool {
    matches!(os, "linux" | "android")
}

/// Platform default backend
pub fn select_backend(os: &str, force_usb: bool) -> BackendKind {
    if force_usb || matches!(os, "windows" | "freebsd") {
        BackendKind::Usb
    } else if has_native_socket(os) {
        BackendKind::Native
    } else {
        BackendKind::Unsupported
    }
}

/// Resolve an explicitly requested backend, or the platform default if none
///
/// Requesting `Native` on a platform without raw HCI sockets yields
/// `Unsupported`.
pub fn resolve_backend(requested: Option<BackendKind>, os: &str, force_usb: bool) -> BackendKind {
    match requested {
        Some(BackendKind::Native) if !has_native_socket(os) => BackendKind::Unsupported,
        Some(kind) => kind,
        None => select_backend(os, force_usb),
    }
}

/// Resolve a backend for the running platform and environment
pub fn resolve_current(requested: Option<BackendKind>) -> BackendKind {
    let force_usb = std::env::var_os(ENV_FORCE_USB).is_some();
    resolve_backend(requested, std::env::consts::OS, force_usb)
}

/// Construct a transport of the given kind
pub fn create_transport(kind: BackendKind) -> Result<Box<dyn Transport>> {
    info!("Using {} HCI transport", kind);
    match kind {
        BackendKind::Usb => Ok(Box::new(UsbTransport::from_env()?)),
        BackendKind::Native => {
            warn!("Native raw HCI sockets are not provided by this build; set {} to use USB", ENV_FORCE_USB);
            Ok(Box::new(UnsupportedTransport::new(
                "native HCI socket backend is not available in this build",
            )))
        }
        BackendKind::Unsupported => Ok(Box::new(UnsupportedTransport::new(format!(
            "no HCI transport for platform '{}'",
            std::env::consts::OS
        )))),
    }
}
