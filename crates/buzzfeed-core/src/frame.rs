//! Packet framing
//!
//! Frame format sent to the controller:
//! - 1 byte: marker (0x5A)
//! - 1 byte: payload length
//! - N bytes: payload

use std::io::Write;

use tracing::debug;

use crate::{FeedError, Result};

/// First byte of every frame
pub const FRAME_MARKER: u8 = 0x5A;

/// Largest payload the single-byte length field can describe
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// A framed packet ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Vec<u8>,
}

impl Frame {
    /// Create a frame around the given payload
    pub fn new(payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FeedError::PayloadTooLarge(payload.len()));
        }
        Ok(Self { payload })
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encode the frame to raw bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_size());
        bytes.push(FRAME_MARKER);
        bytes.push(self.payload.len() as u8);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Get the total encoded size
    pub fn encoded_size(&self) -> usize {
        2 + self.payload.len()
    }
}

/// Destination for interpreter output packets
pub trait PacketSink {
    /// Send one payload. Empty payloads are not sent.
    fn send(&mut self, payload: &[u8]) -> Result<()>;
}

impl<T: Write + ?Sized> PacketSink for T {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Ok(());
        }

        let frame = Frame::new(payload.to_vec())?;
        let bytes = frame.to_bytes();
        self.write_all(&bytes).map_err(FeedError::Write)?;
        self.flush().map_err(FeedError::Write)?;

        debug!(len = payload.len(), frame = ?bytes, "sent packet");
        Ok(())
    }
}
