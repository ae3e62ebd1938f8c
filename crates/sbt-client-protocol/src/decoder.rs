//! Incremental decoding of concatenated JSON values.
//!
//! The server writes envelopes back to back without length prefixes, so a
//! single read may hold half a value or several values at once. The decoder
//! accumulates bytes and yields one complete value at a time, leaving any
//! trailing partial value buffered until more bytes arrive. LSP-style
//! `Content-Length` header blocks in front of a value are skipped.

use serde_json::Value;
use thiserror::Error;

const HEADER_PREFIX: &[u8] = b"Content-";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Errors raised while decoding incoming envelopes.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The byte stream is not valid JSON.
    #[error("malformed JSON on the wire: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
    /// A well-formed JSON value did not match the envelope schema.
    #[error("invalid envelope: {reason}")]
    Envelope { reason: String },
}

impl DecodeError {
    pub(crate) fn envelope(reason: impl Into<String>) -> Self {
        Self::Envelope {
            reason: reason.into(),
        }
    }
}

/// Buffers partial reads and splits them into JSON values.
#[derive(Debug, Default)]
pub struct EnvelopeDecoder {
    buffer: Vec<u8>,
}

impl EnvelopeDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Returns `true` when no undecoded bytes (other than whitespace) remain.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }

    /// Decodes the next complete value, if the buffer holds one.
    ///
    /// Returns `Ok(None)` when more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] as soon as the buffered bytes can no
    /// longer form a valid JSON value.
    pub fn next_value(&mut self) -> Result<Option<Value>, DecodeError> {
        loop {
            self.skip_whitespace();
            if self.buffer.is_empty() {
                return Ok(None);
            }
            match self.skip_header_block() {
                HeaderScan::Skipped => continue,
                HeaderScan::Incomplete => return Ok(None),
                HeaderScan::Absent => break,
            }
        }

        let mut stream = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
        match stream.next() {
            None => Ok(None),
            Some(Ok(value)) => {
                let consumed = stream.byte_offset();
                self.buffer.drain(..consumed);
                Ok(Some(value))
            }
            Some(Err(error)) if error.is_eof() => Ok(None),
            Some(Err(source)) => Err(DecodeError::Malformed { source }),
        }
    }

    fn skip_whitespace(&mut self) {
        let leading = self
            .buffer
            .iter()
            .take_while(|byte| byte.is_ascii_whitespace())
            .count();
        self.buffer.drain(..leading);
    }

    fn skip_header_block(&mut self) -> HeaderScan {
        if self.buffer.len() < HEADER_PREFIX.len() {
            return if HEADER_PREFIX.starts_with(&self.buffer) {
                HeaderScan::Incomplete
            } else {
                HeaderScan::Absent
            };
        }
        if !self.buffer.starts_with(HEADER_PREFIX) {
            return HeaderScan::Absent;
        }
        match self
            .buffer
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR)
        {
            Some(position) => {
                self.buffer.drain(..position + HEADER_TERMINATOR.len());
                HeaderScan::Skipped
            }
            None => HeaderScan::Incomplete,
        }
    }
}

enum HeaderScan {
    Skipped,
    Incomplete,
    Absent,
}
