use bytes::BytesMut;
use tracing::trace;

use crate::error::ParseError;
use crate::frame::{parse_frame, Reading, TERMINATOR};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Splits a chunked byte stream into parsed frames.
///
/// Holds the unterminated tail of the stream between calls, so no byte is
/// dropped and no frame is parsed twice across chunk boundaries. One
/// instance belongs to exactly one port; carry state must never be shared
/// between ports, since frames do not identify their source device.
#[derive(Debug, Default)]
pub struct FrameCarry {
    buf: BytesMut,
}

impl FrameCarry {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append incoming bytes and parse every complete `\r`-delimited segment.
    ///
    /// Results come back in arrival order. Malformed segments yield
    /// `Err(ParseError)` entries in place; parsing always continues with the
    /// next segment. The trailing unterminated segment stays buffered.
    pub fn feed(&mut self, incoming: &[u8]) -> Vec<Result<Reading, ParseError>> {
        self.buf.extend_from_slice(incoming);

        let mut results = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == TERMINATOR) {
            let segment = self.buf.split_to(pos + 1);
            let parsed = parse_frame(&segment[..pos]);
            if let Err(err) = &parsed {
                trace!(%err, len = pos, "discarding malformed frame");
            }
            results.push(parsed);
        }
        results
    }

    /// The buffered unterminated tail.
    pub fn carry(&self) -> &[u8] {
        &self.buf
    }

    /// Drop any buffered tail.
    ///
    /// Called when a port reopens, so a partial frame from the previous
    /// session cannot splice onto fresh data.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
