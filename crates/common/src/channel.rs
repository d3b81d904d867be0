//! Outbound packet channel between the USB pollers and transport users
//!
//! The poller threads push with non-blocking sends; consumers may receive
//! from async code or from a plain thread.

use async_channel::{Receiver, Sender, TryRecvError, unbounded};
use protocol::HciPacket;

/// Sending half, owned by the inbound pollers
#[derive(Clone)]
pub struct PacketSender {
    tx: Sender<HciPacket>,
}

impl PacketSender {
    /// Deliver a packet without blocking
    ///
    /// Fails only when every receiver has been dropped.
    pub fn send(&self, packet: HciPacket) -> crate::Result<()> {
        self.tx
            .try_send(packet)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Whether any receiver is still alive
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, handed out to transport users
#[derive(Clone)]
pub struct PacketReceiver {
    rx: Receiver<HciPacket>,
}

impl PacketReceiver {
    /// Receive the next packet
    pub async fn recv(&self) -> crate::Result<HciPacket> {
        self.rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive the next packet, blocking the current thread
    pub fn recv_blocking(&self) -> crate::Result<HciPacket> {
        self.rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Take a packet if one is queued
    pub fn try_recv(&self) -> Option<HciPacket> {
        match self.rx.try_recv() {
            Ok(packet) => Some(packet),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Number of queued packets
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create the packet channel
///
/// Returns (PacketSender for the pollers, PacketReceiver for users). The
/// channel is unbounded: inbound traffic is never throttled at this layer.
pub fn create_packet_channel() -> (PacketSender, PacketReceiver) {
    let (tx, rx) = unbounded();
    (PacketSender { tx }, PacketReceiver { rx })
}
