//! Wire framing.
//!
//! Every message travels as a versioned, length-prefixed frame:
//!
//! ```text
//! [version: u8] [payload length: u32 LE] [payload]
//! ```
//!
//! The payload is the bincode encoding of a [`WireMessage`](crate::WireMessage).

use crate::CodecError;

/// Current frame version.
pub const WIRE_VERSION: u8 = 1;

/// Frame header size in bytes.
pub const HEADER_LEN: usize = 5;

/// Wrap a payload in a frame.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(WIRE_VERSION);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Validate a frame and return its payload.
pub fn unframe(bytes: &[u8]) -> Result<&[u8], CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::FrameTooShort { len: bytes.len() });
    }
    if bytes[0] != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion { found: bytes[0] });
    }
    let declared = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != declared {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }
    Ok(payload)
}
