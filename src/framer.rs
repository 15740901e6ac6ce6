//! Newline-delimited JSON framing for one connection.
//!
//! Raw bytes accumulate in a receive buffer owned by this framer; each
//! complete line (up to and excluding a `\n`) is decoded as one JSON
//! message. A line that fails to decode is reported as an error entry
//! but never stops extraction of the lines behind it.

use bytes::{Buf, BytesMut};
use serde::Deserialize;

/// Initial receive buffer capacity.
const BUFFER_SIZE: usize = 4096;

/// A decoded inbound message.
///
/// `command` is optional at the decode layer; messages without one are
/// dropped at dispatch, matching the protocol's silent leniency.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub command: Option<String>,
}

/// Per-connection framing state.
///
/// There is no cap on buffered bytes awaiting a newline; a peer that
/// never sends one grows the buffer without bound (see DESIGN.md).
pub struct Framer {
    buffer: BytesMut,
}

impl Framer {
    pub fn new() -> Self {
        Framer {
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
        }
    }

    /// Append incoming bytes and extract every complete line, yielding a
    /// decoded message or a decode error per line, in arrival order. A
    /// partial trailing line stays buffered until its newline arrives.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<InboundMessage, serde_json::Error>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            messages.push(serde_json::from_slice(&line[..pos]));
        }
        messages
    }

    /// Bytes held awaiting a newline.
    pub fn buffered(&self) -> usize {
        self.buffer.remaining()
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}
