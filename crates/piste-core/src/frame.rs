//! Length-prefixed framing over a byte stream.
//!
//! Each frame is a 4-byte big-endian length followed by that many payload
//! bytes. The decoder accumulates whatever chunk sizes the transport delivers
//! and yields complete frames in send order, so partial reads and coalesced
//! writes are both fine. A corrupt prefix (zero, or beyond the cap) is fatal
//! to the connection.

use thiserror::Error;

/// Hard cap on a single frame's payload. Nothing in a tournament comes close;
/// anything larger is a corrupt prefix.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const PREFIX_LEN: usize = 4;

/// Errors from frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame length {0} exceeds cap {MAX_FRAME_LEN}")]
    Oversized(usize),
    #[error("zero-length frame")]
    Empty,
}

/// Prepend the length prefix to a payload.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.is_empty() {
        return Err(FrameError::Empty);
    }
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::Oversized(payload.len()));
    }
    let mut out = Vec::with_capacity(PREFIX_LEN + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Streaming decoder reassembling frames from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes as they arrive off the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete frame, if the buffer holds one. Call repeatedly
    /// after each [`extend`](Self::extend) until it returns `None`.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if self.buf.len() < PREFIX_LEN {
            return Ok(None);
        }
        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if len == 0 {
            return Err(FrameError::Empty);
        }
        if len > MAX_FRAME_LEN {
            return Err(FrameError::Oversized(len));
        }
        if self.buf.len() < PREFIX_LEN + len {
            return Ok(None);
        }
        let frame = self.buf[PREFIX_LEN..PREFIX_LEN + len].to_vec();
        self.buf.drain(..PREFIX_LEN + len);
        Ok(Some(frame))
    }
}
