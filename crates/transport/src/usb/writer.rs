//! Outbound packet routing
//!
//! HCI over USB puts each packet type on its own transfer type:
//!
//! ```text
//! 0x01 Command   -> class control transfer to the interface, tag stripped
//! 0x02 ACL Data  -> bulk OUT transfer on the ACL-out endpoint, tag stripped
//! ```
//!
//! Writes are fire-and-forget. The caller only routes the packet; a dedicated
//! writer thread issues the transfers in submission order and logs failures.

use super::backend::{Endpoint, UsbHandle};
use async_channel::{Receiver, Sender, unbounded};
use common::{Error, Result};
use protocol::{PacketType, ProtocolError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// bmRequestType for HCI commands: host-to-device, class, interface
pub const HCI_COMMAND_REQUEST_TYPE: u8 = 0x21;

/// libusb treats a zero timeout as unlimited
const WRITE_TIMEOUT: Duration = Duration::ZERO;

/// Transfer chosen for an outbound packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Control(&'a [u8]),
    Bulk(&'a [u8]),
}

/// Decide which transfer carries `packet`, a tag-prefixed HCI packet
pub fn route(packet: &[u8]) -> protocol::Result<Route<'_>> {
    let (&tag, payload) = packet.split_first().ok_or(ProtocolError::EmptyPacket)?;

    match PacketType::try_from(tag)? {
        PacketType::Command => Ok(Route::Control(payload)),
        PacketType::AclData => Ok(Route::Bulk(payload)),
        other => Err(ProtocolError::UnsupportedPacketType(other)),
    }
}

/// A routed packet waiting for the writer thread, tag already stripped
#[derive(Debug)]
enum Transfer {
    Control(Vec<u8>),
    Bulk(Vec<u8>),
}

impl From<Route<'_>> for Transfer {
    fn from(route: Route<'_>) -> Self {
        match route {
            Route::Control(payload) => Transfer::Control(payload.to_vec()),
            Route::Bulk(payload) => Transfer::Bulk(payload.to_vec()),
        }
    }
}

/// Issue one transfer, logging instead of returning failures
fn issue<H: UsbHandle>(handle: &H, acl_out: &Endpoint, transfer: &Transfer) {
    match transfer {
        Transfer::Control(payload) => {
            if let Err(e) = handle.write_control(
                HCI_COMMAND_REQUEST_TYPE,
                0,
                0,
                0,
                payload,
                WRITE_TIMEOUT,
            ) {
                warn!("HCI command transfer failed: {}", e);
            }
        }
        Transfer::Bulk(payload) => {
            if let Err(e) = handle.write_bulk(acl_out.address, payload, WRITE_TIMEOUT) {
                warn!(
                    "ACL data transfer on endpoint {:#04x} failed: {}",
                    acl_out.address, e
                );
            }
        }
    }
}

/// Outbound side of a bound controller
///
/// Owns a thread draining a queue of routed packets. Dropping the writer
/// closes the queue, lets queued transfers finish, and joins the thread.
pub struct UsbWriter {
    queue: Option<Sender<Transfer>>,
    thread: Option<JoinHandle<()>>,
}

impl UsbWriter {
    pub fn spawn<H: UsbHandle>(handle: Arc<H>, acl_out: Endpoint) -> Result<Self> {
        let (queue, pending) = unbounded();

        let thread = std::thread::Builder::new()
            .name("hci-out".to_string())
            .spawn(move || drain(handle, acl_out, pending))?;

        debug!("Started writer, ACL-out endpoint {:#04x}", acl_out.address);
        Ok(Self {
            queue: Some(queue),
            thread: Some(thread),
        })
    }

    /// Route `packet` and queue its transfer without waiting for it
    ///
    /// Only routing errors are returned.
    pub fn submit(&self, packet: &[u8]) -> Result<()> {
        debug!("write: {}", hex_string(packet));

        let transfer = Transfer::from(route(packet)?);
        self.queue
            .as_ref()
            .ok_or_else(|| Error::Channel("writer closed".to_string()))?
            .try_send(transfer)
            .map_err(|e| Error::Channel(e.to_string()))
    }
}

fn drain<H: UsbHandle>(handle: Arc<H>, acl_out: Endpoint, pending: Receiver<Transfer>) {
    while let Ok(transfer) = pending.recv_blocking() {
        issue(handle.as_ref(), &acl_out, &transfer);
    }
    debug!("Writer stopped");
}

impl Drop for UsbWriter {
    fn drop(&mut self) {
        self.queue.take();
        if let Some(thread) = self.thread.take() {
            if let Err(e) = thread.join() {
                warn!("Writer thread panicked: {:?}", e);
            }
        }
    }
}

/// Lowercase hex rendering for packet logging
pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
