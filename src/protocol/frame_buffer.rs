//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForPrefix`: Need at least 4 bytes
//! - `WaitingForBody`: Length known, need the whole body
//!
//! The prefix stays in the buffer until its body is complete, so the buffer
//! always holds either nothing, a partial prefix, or a prefix plus a partial
//! body.
//!
//! # Example
//!
//! ```
//! use venue_client::protocol::{build_frame, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let bytes = build_frame(&["9", "1", "17"]);
//!
//! // Data arrives in chunks from the socket
//! assert!(buffer.push(&bytes[..2]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[2..]).unwrap();
//!
//! assert_eq!(frames[0].kind().unwrap(), 9);
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{decode_prefix, DEFAULT_MAX_FRAME_SIZE, FIELD_SEPARATOR, PREFIX_SIZE};
use super::Frame;
use crate::error::{ClientError, Result};

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete length prefix.
    WaitingForPrefix,
    /// Prefix parsed, waiting for `body_len` body bytes.
    WaitingForBody { body_len: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed body size.
    max_frame_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max body: 16MB.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame buffer with a custom max body size.
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForPrefix,
            max_frame_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// If data is fragmented, partial data is buffered internally for the
    /// next push.
    ///
    /// # Errors
    ///
    /// Returns error if a declared body length exceeds `max_frame_size`.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::WaitingForPrefix => {
                    let Some(body_len) = decode_prefix(&self.buffer) else {
                        return Ok(None);
                    };

                    if body_len > self.max_frame_size {
                        return Err(ClientError::Protocol(format!(
                            "Frame size {} exceeds maximum {}",
                            body_len, self.max_frame_size
                        )));
                    }

                    self.state = State::WaitingForBody {
                        body_len: body_len as usize,
                    };
                }

                State::WaitingForBody { body_len } => {
                    if self.buffer.len() < PREFIX_SIZE + body_len {
                        return Ok(None);
                    }

                    let _ = self.buffer.split_to(PREFIX_SIZE);
                    let body = self.buffer.split_to(body_len).freeze();
                    self.state = State::WaitingForPrefix;

                    return Ok(Some(Frame::new(split_fields(body))));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForPrefix;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForPrefix => "WaitingForPrefix",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a body on the separator, dropping the element after the final
/// terminator.
fn split_fields(body: Bytes) -> Vec<Bytes> {
    let mut fields = Vec::new();
    let mut start = 0;
    for (i, byte) in body.iter().enumerate() {
        if *byte == FIELD_SEPARATOR {
            fields.push(body.slice(start..i));
            start = i + 1;
        }
    }
    // Bytes after the last separator are the terminator's tail and dropped.
    fields
}
