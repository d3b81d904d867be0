//! USB-direct HCI transport
//!
//! Ties the binder, the two inbound pollers, the writer thread and the
//! readiness tracker together behind the [`Transport`] trait.

use super::backend::UsbBus;
use super::binder::Binder;
use super::poller::EndpointPoller;
use super::readiness::ReadinessTracker;
use super::rusb_bus::RusbBus;
use crate::transport::Transport;
use common::{
    DeviceRecord, Mode, PacketReceiver, PacketSender, Result, UsbParams, create_packet_channel,
};
use protocol::{AclFormat, AclReassembler, EventFormat, EventReassembler, reset_command};
use std::sync::Arc;
use tracing::{debug, info};

/// HCI transport speaking directly to a USB Bluetooth controller
pub struct UsbTransport<B: UsbBus> {
    binder: Binder<B>,
    readiness: ReadinessTracker,
    packets_tx: PacketSender,
    packets_rx: PacketReceiver,
    event_reassembler: Option<EventReassembler>,
    acl_reassembler: Option<AclReassembler>,
    event_poller: Option<EndpointPoller<EventFormat>>,
    acl_poller: Option<EndpointPoller<AclFormat>>,
}

impl UsbTransport<RusbBus> {
    /// Transport over libusb, with bind defaults taken from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Arc::new(RusbBus::new()?), UsbParams::from_env()))
    }
}

impl<B: UsbBus> UsbTransport<B> {
    pub fn new(bus: Arc<B>, env: UsbParams) -> Self {
        let (packets_tx, packets_rx) = create_packet_channel();
        Self {
            binder: Binder::new(bus, env),
            readiness: ReadinessTracker::new(),
            packets_tx,
            packets_rx,
            event_reassembler: Some(EventReassembler::new()),
            acl_reassembler: Some(AclReassembler::new()),
            event_poller: None,
            acl_poller: None,
        }
    }

    /// Whether both inbound pollers are running
    ///
    /// A poller that ended on its own, e.g. on disconnect, does not count.
    pub fn is_polling(&self) -> bool {
        let running = |finished: Option<bool>| finished == Some(false);
        running(self.event_poller.as_ref().map(EndpointPoller::is_finished))
            && running(self.acl_poller.as_ref().map(EndpointPoller::is_finished))
    }

    /// Join pollers whose thread has already exited, keeping their reassemblers
    fn reap_finished(&mut self) {
        if let Some(poller) = self.event_poller.take_if(|p| p.is_finished()) {
            self.event_reassembler = Some(poller.stop().unwrap_or_default());
        }
        if let Some(poller) = self.acl_poller.take_if(|p| p.is_finished()) {
            self.acl_reassembler = Some(poller.stop().unwrap_or_default());
        }
    }

    /// Stop both pollers, keeping their reassemblers
    fn stop_pollers(&mut self) {
        if let Some(poller) = self.event_poller.take() {
            self.event_reassembler = Some(poller.stop().unwrap_or_default());
        }
        if let Some(poller) = self.acl_poller.take() {
            self.acl_reassembler = Some(poller.stop().unwrap_or_default());
        }
    }
}

impl<B: UsbBus> Transport for UsbTransport<B> {
    fn bind_raw(&mut self, dev_id: i32, params: Option<&UsbParams>) -> Result<()> {
        self.binder.bind_user(dev_id, params)?;
        self.binder.mark_raw()?;
        self.reset()
    }

    fn bind_user(&mut self, dev_id: i32, params: Option<&UsbParams>) -> Result<()> {
        self.binder.bind_user(dev_id, params)
    }

    fn bind_control(&mut self) -> Result<()> {
        self.binder.bind_control()
    }

    fn set_filter(&mut self, filter: &[u8]) -> Result<()> {
        // USB transfers are not subject to the kernel socket filter
        debug!("Ignoring HCI filter ({} bytes) on USB transport", filter.len());
        Ok(())
    }

    fn write(&self, packet: &[u8]) -> Result<()> {
        self.binder.data_device("write")?.writer.submit(packet)
    }

    fn start(&mut self) -> Result<()> {
        let bound = self.binder.data_device("start")?;
        let handle = bound.handle.clone();
        let endpoints = bound.endpoints;

        self.reap_finished();
        if self.is_polling() {
            debug!("Polling already started");
            return Ok(());
        }

        if self.event_poller.is_none() {
            let readiness = (self.binder.mode() == Mode::Raw).then(|| self.readiness.clone());
            let poller = EndpointPoller::spawn(
                "hci-event-in",
                handle.clone(),
                endpoints.event_in,
                self.event_reassembler.take().unwrap_or_default(),
                self.packets_tx.clone(),
                readiness,
            )?;
            self.event_poller = Some(poller);
        }

        if self.acl_poller.is_none() {
            let spawned = EndpointPoller::spawn(
                "hci-acl-in",
                handle,
                endpoints.acl_in,
                self.acl_reassembler.take().unwrap_or_default(),
                self.packets_tx.clone(),
                None,
            );
            match spawned {
                Ok(poller) => self.acl_poller = Some(poller),
                Err(e) => {
                    self.stop_pollers();
                    return Err(e);
                }
            }
        }

        info!("Started HCI polling in {} mode", self.binder.mode());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.binder.data_device("stop")?;
        self.stop_pollers();
        debug!("Stopped HCI polling");
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        info!("Resetting controller");
        self.write(&reset_command())
    }

    fn device_list(&self) -> Result<Vec<DeviceRecord>> {
        self.binder.device_list()
    }

    fn is_dev_up(&self) -> bool {
        self.readiness.is_up()
    }

    fn mode(&self) -> Mode {
        self.binder.mode()
    }

    fn packets(&self) -> PacketReceiver {
        self.packets_rx.clone()
    }
}

impl<B: UsbBus> Drop for UsbTransport<B> {
    fn drop(&mut self) {
        self.stop_pollers();
    }
}
