//! Wire-format framing for registry-encoded messages.
//!
//! Every message produced by the converters is prefixed with a five byte
//! envelope: a magic byte (`0x00`), then the registry schema id as a
//! big-endian `u32`, then the raw encoded payload. Decoding reports the
//! magic byte but does not validate it, so callers can inspect frames that
//! were produced by other tooling.

use std::fmt;

/// Leading byte of every framed message.
pub const MAGIC_BYTE: u8 = 0x00;

/// Size of the envelope prefix: magic byte plus big-endian schema id.
pub const WIRE_HEADER_LEN: usize = 5;

/// A decoded view over a framed message. The payload borrows from the
/// input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireEnvelope<'a> {
    pub magic_byte: u8,
    pub schema_id: u32,
    pub payload: &'a [u8],
}

/// Framing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    BufferTooShort { len: usize },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::BufferTooShort { len } => write!(
                f,
                "buffer of {} bytes is too short for the wire envelope: need at least {}",
                len, WIRE_HEADER_LEN
            ),
        }
    }
}

impl std::error::Error for WireError {}

/// Frames an encoded payload with the magic byte and schema id.
pub fn encode(schema_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(WIRE_HEADER_LEN + payload.len());
    buffer.push(MAGIC_BYTE);
    buffer.extend_from_slice(&schema_id.to_be_bytes());
    buffer.extend_from_slice(payload);
    buffer
}

/// Splits a framed message into its envelope parts.
///
/// Fails only when the buffer cannot hold the five byte header. An empty
/// payload after the header is valid.
pub fn decode(buffer: &[u8]) -> Result<WireEnvelope<'_>, WireError> {
    if buffer.len() < WIRE_HEADER_LEN {
        return Err(WireError::BufferTooShort { len: buffer.len() });
    }
    let mut id_bytes = [0u8; 4];
    id_bytes.copy_from_slice(&buffer[1..WIRE_HEADER_LEN]);
    Ok(WireEnvelope {
        magic_byte: buffer[0],
        schema_id: u32::from_be_bytes(id_bytes),
        payload: &buffer[WIRE_HEADER_LEN..],
    })
}
