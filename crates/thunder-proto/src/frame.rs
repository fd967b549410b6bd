//! Length-prefixed frame boundaries.
//!
//! Every transport unit is prefixed with a 4-byte big-endian unsigned
//! length giving the number of bytes that follow. The prefix is stripped
//! on read and prepended on write; the I/O layer feeds complete frames
//! upward and accepts complete frames downward.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{ProtocolError, Result};

/// Size of the length prefix.
pub const LENGTH_FIELD_LEN: usize = 4;

/// Maximum accepted frame length (16 MB).
///
/// A prefix exceeding this is a fatal per-connection error; the stream can
/// no longer be trusted to be in sync.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Validate a length prefix read off the wire.
///
/// # Errors
///
/// - [`ProtocolError::InvalidLength`] if the value is negative when
///   interpreted as a signed 32-bit integer
/// - [`ProtocolError::FrameTooLarge`] if it exceeds [`MAX_FRAME_LEN`]
pub fn decode_length(prefix: [u8; LENGTH_FIELD_LEN]) -> Result<usize> {
    let raw = u32::from_be_bytes(prefix);
    if (raw as i32) < 0 {
        return Err(ProtocolError::InvalidLength(i64::from(raw as i32)));
    }
    let len = raw as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge { len, max: MAX_FRAME_LEN });
    }
    Ok(len)
}

/// Prepend the length prefix to a frame payload.
///
/// # Errors
///
/// [`ProtocolError::FrameTooLarge`] if the payload exceeds
/// [`MAX_FRAME_LEN`].
pub fn encode(payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge { len: payload.len(), max: MAX_FRAME_LEN });
    }
    let mut buf = BytesMut::with_capacity(LENGTH_FIELD_LEN + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_carries_payload_length() {
        let framed = encode(b"hello").unwrap();
        assert_eq!(&framed[..LENGTH_FIELD_LEN], &[0, 0, 0, 5]);
        assert_eq!(&framed[LENGTH_FIELD_LEN..], b"hello");
    }

    #[test]
    fn empty_payload_is_a_valid_frame() {
        let framed = encode(b"").unwrap();
        assert_eq!(&framed[..], &[0, 0, 0, 0]);
    }

    #[test]
    fn length_round_trips() {
        let framed = encode(&[7u8; 300]).unwrap();
        let mut prefix = [0u8; LENGTH_FIELD_LEN];
        prefix.copy_from_slice(&framed[..LENGTH_FIELD_LEN]);
        assert_eq!(decode_length(prefix).unwrap(), 300);
    }

    #[test]
    fn negative_length_is_rejected() {
        let result = decode_length(0x8000_0001u32.to_be_bytes());
        assert!(matches!(result, Err(ProtocolError::InvalidLength(_))));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let result = decode_length((MAX_FRAME_LEN as u32 + 1).to_be_bytes());
        assert_eq!(
            result,
            Err(ProtocolError::FrameTooLarge { len: MAX_FRAME_LEN + 1, max: MAX_FRAME_LEN })
        );
    }
}
