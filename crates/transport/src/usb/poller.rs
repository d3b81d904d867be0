//! Inbound endpoint polling
//!
//! Each inbound endpoint gets a dedicated thread that reads transfers,
//! feeds them through its own reassembler and pushes complete packets onto
//! the outbound channel. The thread owns the reassembler while running and
//! hands it back when stopped, so a partial frame survives a stop/start cycle.

use super::backend::{Endpoint, UsbHandle};
use super::readiness::ReadinessTracker;
use super::writer::hex_string;
use common::{Error, PacketSender, Result};
use protocol::{FrameFormat, FrameReassembler, UsbError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Read buffer per transfer
const READ_BUFFER_SIZE: usize = 1024;

/// Timeout for one read, bounds how long `stop` waits
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Pause after an unexpected read error
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A running poller for one inbound endpoint
pub struct EndpointPoller<F: FrameFormat> {
    name: &'static str,
    running: Arc<AtomicBool>,
    thread: JoinHandle<FrameReassembler<F>>,
}

impl<F> EndpointPoller<F>
where
    F: FrameFormat + Send + 'static,
{
    /// Start polling `endpoint` on a new thread
    ///
    /// Every emitted frame is shown to `readiness` when one is given.
    pub fn spawn<H: UsbHandle>(
        name: &'static str,
        handle: Arc<H>,
        endpoint: Endpoint,
        reassembler: FrameReassembler<F>,
        sink: PacketSender,
        readiness: Option<ReadinessTracker>,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let worker = PollLoop {
            name,
            handle,
            endpoint,
            reassembler,
            sink,
            readiness,
            running: running.clone(),
        };

        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker.run())?;

        debug!("Started {} poller on endpoint {:#04x}", name, endpoint.address);
        Ok(Self {
            name,
            running,
            thread,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stop polling and take back the reassembler
    ///
    /// Returns `None` if the polling thread panicked.
    pub fn stop(self) -> Option<FrameReassembler<F>> {
        self.running.store(false, Ordering::Release);
        match self.thread.join() {
            Ok(reassembler) => {
                debug!("Stopped {} poller", self.name);
                Some(reassembler)
            }
            Err(e) => {
                warn!("{} poller panicked: {:?}", self.name, e);
                None
            }
        }
    }
}

struct PollLoop<H: UsbHandle, F: FrameFormat> {
    name: &'static str,
    handle: Arc<H>,
    endpoint: Endpoint,
    reassembler: FrameReassembler<F>,
    sink: PacketSender,
    readiness: Option<ReadinessTracker>,
    running: Arc<AtomicBool>,
}

impl<H: UsbHandle, F: FrameFormat> PollLoop<H, F> {
    fn run(mut self) -> FrameReassembler<F> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        while self.running.load(Ordering::Acquire) {
            match self.handle.read(&self.endpoint, &mut buf, READ_TIMEOUT) {
                Ok(0) => {}
                Ok(len) => self.deliver(&buf[..len]),
                Err(Error::Usb(UsbError::Timeout)) => {}
                Err(Error::Usb(UsbError::NoDevice)) => {
                    warn!("{}: controller disconnected, polling stopped", self.name);
                    break;
                }
                Err(e) => {
                    warn!("{}: read on endpoint {:#04x} failed: {}", self.name, self.endpoint.address, e);
                    std::thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        self.reassembler
    }

    fn deliver(&mut self, chunk: &[u8]) {
        trace!("{}: {} bytes: {}", self.name, chunk.len(), hex_string(chunk));

        for packet in self.reassembler.push(chunk) {
            debug!("{} {:?}: {}", self.name, F::PACKET_TYPE, hex_string(packet.frame()));

            if let Some(readiness) = &self.readiness {
                readiness.observe(packet.frame());
            }

            if self.sink.send(packet).is_err() {
                debug!("{}: no receivers left, dropping packet", self.name);
            }
        }
    }
}
