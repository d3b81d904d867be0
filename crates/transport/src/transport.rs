//! The HCI transport interface implemented by every backend

use common::{DeviceRecord, Mode, PacketReceiver, Result, UsbParams};

/// Byte-oriented HCI transport to one Bluetooth controller
///
/// Packets written are tag-prefixed (`0x01` command, `0x02` ACL data).
/// Packets received arrive on [`Transport::packets`] as typed frames.
pub trait Transport: Send {
    /// Bind as [`Transport::bind_user`], then reset the controller
    fn bind_raw(&mut self, dev_id: i32, params: Option<&UsbParams>) -> Result<()>;

    /// Bind a controller for data transfer without resetting it
    ///
    /// `dev_id` selects among several matching controllers, 1-based.
    /// `params` overrides the environment-sourced selection, field by field.
    fn bind_user(&mut self, dev_id: i32, params: Option<&UsbParams>) -> Result<()>;

    /// Enter control mode, for identity/liveness queries only
    fn bind_control(&mut self) -> Result<()>;

    /// Install a kernel-level HCI packet filter, where the backend has one
    fn set_filter(&mut self, filter: &[u8]) -> Result<()>;

    /// Send one tag-prefixed packet
    fn write(&self, packet: &[u8]) -> Result<()>;

    /// Begin delivering inbound packets
    fn start(&mut self) -> Result<()>;

    /// Stop delivering inbound packets
    fn stop(&mut self) -> Result<()>;

    /// Send HCI_Reset
    fn reset(&self) -> Result<()>;

    /// Controllers this backend could bind
    fn device_list(&self) -> Result<Vec<DeviceRecord>>;

    /// Whether the controller has completed its reset
    fn is_dev_up(&self) -> bool;

    fn mode(&self) -> Mode;

    /// Receiver for inbound packets
    fn packets(&self) -> PacketReceiver;
}
