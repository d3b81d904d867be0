//! In-memory USB bus for transport tests

#![allow(dead_code)]

use common::{Error, Result, UsbDeviceSummary};
use protocol::{HciPacket, UsbError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use transport::usb::{Endpoint, TransferKind, UsbBus, UsbHandle};

pub const CSR: (u16, u16) = (0x0a12, 0x0001);
pub const INTEL_8265: (u16, u16) = (0x8087, 0x0a2b);
pub const MOUSE: (u16, u16) = (0x046d, 0xc52b);

pub fn device(ids: (u16, u16), bus_number: u8, device_address: u8) -> UsbDeviceSummary {
    UsbDeviceSummary {
        vendor_id: ids.0,
        product_id: ids.1,
        bus_number,
        device_address,
    }
}

pub fn endpoint(address: u8, kind: TransferKind) -> Endpoint {
    Endpoint {
        address,
        kind,
        max_packet_size: 64,
    }
}

/// The usual HCI endpoint layout
pub fn hci_endpoints() -> Vec<Endpoint> {
    vec![
        endpoint(0x81, TransferKind::Interrupt),
        endpoint(0x82, TransferKind::Bulk),
        endpoint(0x02, TransferKind::Bulk),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTransfer {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkTransfer {
    pub endpoint: u8,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct BusState {
    control: Vec<ControlTransfer>,
    bulk: Vec<BulkTransfer>,
    reads: HashMap<u8, VecDeque<Vec<u8>>>,
    opened: Vec<UsbDeviceSummary>,
    configurations: Vec<u8>,
    claimed: Vec<u8>,
    open_handles: usize,
    disconnected: HashSet<u8>,
}

/// Fake bus recording every transfer issued through its handles
#[derive(Clone)]
pub struct MockBus {
    devices: Vec<UsbDeviceSummary>,
    endpoints: Vec<Endpoint>,
    fail_claim: bool,
    fail_writes: bool,
    write_delay: Duration,
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    pub fn new(devices: Vec<UsbDeviceSummary>) -> Self {
        Self {
            devices,
            endpoints: hci_endpoints(),
            fail_claim: false,
            fail_writes: false,
            write_delay: Duration::ZERO,
            state: Arc::new(Mutex::new(BusState::default())),
        }
    }

    /// Make every outbound transfer take `delay` to complete
    pub fn slow_writes(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Fail reads on `endpoint` with `NoDevice` until reconnected
    pub fn disconnect(&self, endpoint: u8) {
        self.state.lock().unwrap().disconnected.insert(endpoint);
    }

    pub fn reconnect(&self, endpoint: u8) {
        self.state.lock().unwrap().disconnected.remove(&endpoint);
    }

    /// Wait until at least `count` outbound transfers have completed
    pub fn wait_for_transfers(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let done = {
                let state = self.state.lock().unwrap();
                state.control.len() + state.bulk.len()
            };
            if done >= count {
                return;
            }
            assert!(Instant::now() < deadline, "only {} of {} transfers issued", done, count);
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn failing_claim(mut self) -> Self {
        self.fail_claim = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Queue one inbound transfer on `endpoint`
    pub fn push_read(&self, endpoint: u8, chunk: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .reads
            .entry(endpoint)
            .or_default()
            .push_back(chunk.to_vec());
    }

    pub fn pending_reads(&self, endpoint: u8) -> usize {
        self.state
            .lock()
            .unwrap()
            .reads
            .get(&endpoint)
            .map_or(0, VecDeque::len)
    }

    /// Wait until every queued transfer on `endpoint` has been read
    pub fn wait_drained(&self, endpoint: u8) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.pending_reads(endpoint) > 0 {
            assert!(Instant::now() < deadline, "endpoint {:#04x} never drained", endpoint);
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    pub fn control_transfers(&self) -> Vec<ControlTransfer> {
        self.state.lock().unwrap().control.clone()
    }

    pub fn bulk_transfers(&self) -> Vec<BulkTransfer> {
        self.state.lock().unwrap().bulk.clone()
    }

    pub fn opened(&self) -> Vec<UsbDeviceSummary> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn configurations(&self) -> Vec<u8> {
        self.state.lock().unwrap().configurations.clone()
    }

    pub fn claimed(&self) -> Vec<u8> {
        self.state.lock().unwrap().claimed.clone()
    }

    pub fn open_handles(&self) -> usize {
        self.state.lock().unwrap().open_handles
    }
}

impl UsbBus for MockBus {
    type Handle = MockHandle;

    fn devices(&self) -> Result<Vec<UsbDeviceSummary>> {
        Ok(self.devices.clone())
    }

    fn open(&self, device: &UsbDeviceSummary) -> Result<MockHandle> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(*device);
        state.open_handles += 1;
        Ok(MockHandle {
            endpoints: self.endpoints.clone(),
            fail_claim: self.fail_claim,
            fail_writes: self.fail_writes,
            write_delay: self.write_delay,
            state: self.state.clone(),
        })
    }
}

pub struct MockHandle {
    endpoints: Vec<Endpoint>,
    fail_claim: bool,
    fail_writes: bool,
    write_delay: Duration,
    state: Arc<Mutex<BusState>>,
}

impl UsbHandle for MockHandle {
    fn set_configuration(&mut self, config: u8) -> Result<()> {
        self.state.lock().unwrap().configurations.push(config);
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<()> {
        if self.fail_claim {
            return Err(Error::Usb(UsbError::Busy));
        }
        self.state.lock().unwrap().claimed.push(interface);
        Ok(())
    }

    fn endpoint(&self, _interface: u8, address: u8) -> Result<Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.address == address)
            .copied()
            .ok_or(Error::EndpointNotFound(address))
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize> {
        std::thread::sleep(self.write_delay);
        if self.fail_writes {
            return Err(Error::Usb(UsbError::Pipe));
        }
        self.state.lock().unwrap().control.push(ControlTransfer {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
        });
        Ok(data.len())
    }

    fn write_bulk(&self, endpoint: u8, data: &[u8], _timeout: Duration) -> Result<usize> {
        std::thread::sleep(self.write_delay);
        if self.fail_writes {
            return Err(Error::Usb(UsbError::Pipe));
        }
        self.state.lock().unwrap().bulk.push(BulkTransfer {
            endpoint,
            data: data.to_vec(),
        });
        Ok(data.len())
    }

    fn read(&self, endpoint: &Endpoint, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let chunk = {
            let mut state = self.state.lock().unwrap();
            if state.disconnected.contains(&endpoint.address) {
                return Err(Error::Usb(UsbError::NoDevice));
            }
            state
                .reads
                .get_mut(&endpoint.address)
                .and_then(VecDeque::pop_front)
        };

        match chunk {
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => {
                std::thread::sleep(Duration::from_millis(2));
                Err(Error::Usb(UsbError::Timeout))
            }
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.state.lock().unwrap().open_handles -= 1;
    }
}

/// Poll the packet channel until a packet arrives or two seconds pass
pub fn recv_within(packets: &common::PacketReceiver) -> Option<HciPacket> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if let Some(packet) = packets.try_recv() {
            return Some(packet);
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    None
}

/// Wait up to two seconds for `condition` to hold
pub fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(2));
    }
}
