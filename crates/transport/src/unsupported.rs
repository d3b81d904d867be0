//! Placeholder transport for platforms without a usable backend

use crate::transport::Transport;
use common::{
    DeviceRecord, Error, Mode, PacketReceiver, PacketSender, Result, UsbParams,
    create_packet_channel,
};

/// Transport whose every data operation fails with [`Error::Unsupported`]
pub struct UnsupportedTransport {
    reason: String,
    // Held so receivers block instead of seeing a closed channel
    _packets_tx: PacketSender,
    packets_rx: PacketReceiver,
}

impl UnsupportedTransport {
    pub fn new(reason: impl Into<String>) -> Self {
        let (packets_tx, packets_rx) = create_packet_channel();
        Self {
            reason: reason.into(),
            _packets_tx: packets_tx,
            packets_rx,
        }
    }

    fn unsupported<T>(&self) -> Result<T> {
        Err(Error::Unsupported(self.reason.clone()))
    }
}

impl Transport for UnsupportedTransport {
    fn bind_raw(&mut self, _dev_id: i32, _params: Option<&UsbParams>) -> Result<()> {
        self.unsupported()
    }

    fn bind_user(&mut self, _dev_id: i32, _params: Option<&UsbParams>) -> Result<()> {
        self.unsupported()
    }

    fn bind_control(&mut self) -> Result<()> {
        self.unsupported()
    }

    fn set_filter(&mut self, _filter: &[u8]) -> Result<()> {
        Ok(())
    }

    fn write(&self, _packet: &[u8]) -> Result<()> {
        self.unsupported()
    }

    fn start(&mut self) -> Result<()> {
        self.unsupported()
    }

    fn stop(&mut self) -> Result<()> {
        self.unsupported()
    }

    fn reset(&self) -> Result<()> {
        self.unsupported()
    }

    fn device_list(&self) -> Result<Vec<DeviceRecord>> {
        Ok(Vec::new())
    }

    fn is_dev_up(&self) -> bool {
        false
    }

    fn mode(&self) -> Mode {
        Mode::Unbound
    }

    fn packets(&self) -> PacketReceiver {
        self.packets_rx.clone()
    }
}
