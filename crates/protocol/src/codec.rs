//! Inbound HCI frame reassembly
//!
//! USB delivers controller output in transfers whose boundaries have nothing
//! to do with HCI frame boundaries: one transfer may hold half a frame, or
//! the tail of one frame and the head of the next. A [`FrameReassembler`]
//! accumulates those chunks and slices out every complete, length-delimited
//! frame.
//!
//! # Frame Formats
//!
//! ```text
//! Event:    [eventCode: u8][paramLength: u8][params: paramLength bytes]
//! ACL Data: [handle: u16 LE][dataLength: u16 LE][payload: dataLength bytes]
//! ```
//!
//! The buffer is a `BytesMut`: chunks are appended at the tail and frames are
//! split off the head, so consumed bytes are reclaimed instead of the whole
//! buffer being reallocated on every transfer.

use crate::types::{HciPacket, PacketType};
use bytes::{Bytes, BytesMut};
use std::marker::PhantomData;

/// Initial buffer capacity, enough for one full-size event plus change
const INITIAL_CAPACITY: usize = 1024;

/// Header layout of one inbound HCI frame type
pub trait FrameFormat {
    /// Packet type emitted for frames of this format
    const PACKET_TYPE: PacketType;

    /// Number of header bytes preceding the payload
    const HEADER_LEN: usize;

    /// Payload length declared by a header of exactly `HEADER_LEN` bytes
    fn payload_len(header: &[u8]) -> usize;

    /// Wrap a complete, untagged frame
    fn wrap(frame: Bytes) -> HciPacket;
}

/// HCI Event frames: 2-byte header, 8-bit parameter length at offset 1
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFormat;

impl FrameFormat for EventFormat {
    const PACKET_TYPE: PacketType = PacketType::Event;
    const HEADER_LEN: usize = 2;

    fn payload_len(header: &[u8]) -> usize {
        header[1] as usize
    }

    fn wrap(frame: Bytes) -> HciPacket {
        HciPacket::Event(frame)
    }
}

/// HCI ACL Data frames: 4-byte header, little-endian 16-bit length at offset 2
///
/// The connection handle in bytes 0-1 is passed through uninterpreted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AclFormat;

impl FrameFormat for AclFormat {
    const PACKET_TYPE: PacketType = PacketType::AclData;
    const HEADER_LEN: usize = 4;

    fn payload_len(header: &[u8]) -> usize {
        u16::from_le_bytes([header[2], header[3]]) as usize
    }

    fn wrap(frame: Bytes) -> HciPacket {
        HciPacket::AclData(frame)
    }
}

/// Per-direction byte accumulator producing complete HCI frames
///
/// Invariant: after every [`push`](Self::push) the buffer holds only the bytes
/// of at most one incomplete frame.
#[derive(Debug)]
pub struct FrameReassembler<F: FrameFormat> {
    buffer: BytesMut,
    _format: PhantomData<F>,
}

/// Reassembler for the event-in endpoint
pub type EventReassembler = FrameReassembler<EventFormat>;

/// Reassembler for the ACL-in endpoint
pub type AclReassembler = FrameReassembler<AclFormat>;

impl<F: FrameFormat> FrameReassembler<F> {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            _format: PhantomData,
        }
    }

    /// Append a chunk and return every frame it completed, in arrival order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<HciPacket> {
        let mut packets = Vec::new();
        if chunk.is_empty() {
            return packets;
        }

        self.buffer.extend_from_slice(chunk);

        while let Some(frame) = self.next_frame() {
            packets.push(F::wrap(frame));
        }

        packets
    }

    /// Slice the next complete frame off the head of the buffer, if any
    fn next_frame(&mut self) -> Option<Bytes> {
        if self.buffer.len() < F::HEADER_LEN {
            return None;
        }

        let frame_len = F::HEADER_LEN + F::payload_len(&self.buffer[..F::HEADER_LEN]);
        if self.buffer.len() < frame_len {
            return None;
        }

        Some(self.buffer.split_to(frame_len).freeze())
    }

    /// Number of buffered bytes not yet emitted
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partially received frame
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl<F: FrameFormat> Default for FrameReassembler<F> {
    fn default() -> Self {
        Self::new()
    }
}
