//! Packet layout within a frame, and the header serializer selector.
//!
//! Within one frame a packet is laid out as:
//!
//! ```text
//! [1 byte  : codec_type]
//! [4 bytes : header length H, big-endian signed]
//! [H bytes : serialized header]
//! [remainder: body bytes]
//! ```
//!
//! The codec selector is a process-level default on the encode side, but
//! the decoder always honors whatever byte appears on the wire — a peer
//! may reply in a different header encoding than ours.

mod json;
mod thunder;

use bytes::{BufMut, Bytes, BytesMut};

pub use self::thunder::FIXED_HEADER_LEN;
use crate::{
    errors::{ProtocolError, Result},
    packet::Packet,
};

/// Bytes preceding the serialized header: codec selector plus header length.
pub const PACKET_PREFIX_LEN: usize = 5;

/// Selects the header serializer for outgoing packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecType {
    /// UTF-8 JSON object header.
    #[default]
    Json,
    /// Binary "Thunder" header.
    Thunder,
}

impl CodecType {
    /// Wire byte for this codec.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Json => 0,
            Self::Thunder => 1,
        }
    }

    /// Decode the wire selector byte.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownCodec`] for any byte other than `0` or `1`.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::Json),
            1 => Ok(Self::Thunder),
            other => Err(ProtocolError::UnknownCodec(other)),
        }
    }
}

/// Encode a packet into a frame payload (without the frame length prefix).
///
/// # Errors
///
/// [`ProtocolError::HeaderEncode`] if the selected serializer rejects the
/// packet.
pub fn encode(packet: &Packet, codec: CodecType) -> Result<Bytes> {
    let header = match codec {
        CodecType::Json => json::encode(packet)?,
        CodecType::Thunder => thunder::encode(packet)?,
    };

    let mut buf = BytesMut::with_capacity(PACKET_PREFIX_LEN + header.len() + packet.body.len());
    buf.put_u8(codec.to_byte());
    buf.put_i32(header.len() as i32);
    buf.put_slice(&header);
    buf.put_slice(&packet.body);
    Ok(buf.freeze())
}

/// Decode a frame payload into a packet.
///
/// The body length is derived from the frame length; a nonpositive derived
/// length yields an empty body.
///
/// # Errors
///
/// - [`ProtocolError::UnknownCodec`] for an unrecognized selector byte
/// - [`ProtocolError::InvalidLength`] for a negative header length
/// - [`ProtocolError::Truncated`] if the frame is shorter than the header
///   length claims
/// - [`ProtocolError::HeaderDecode`] if the header fails to parse
pub fn decode(frame: &[u8]) -> Result<Packet> {
    if frame.len() < PACKET_PREFIX_LEN {
        return Err(ProtocolError::Truncated { expected: PACKET_PREFIX_LEN, actual: frame.len() });
    }

    let codec = CodecType::from_byte(frame[0])?;

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&frame[1..PACKET_PREFIX_LEN]);
    let header_len = i32::from_be_bytes(len_bytes);
    if header_len < 0 {
        return Err(ProtocolError::InvalidLength(i64::from(header_len)));
    }

    let header_end = PACKET_PREFIX_LEN + header_len as usize;
    if frame.len() < header_end {
        return Err(ProtocolError::Truncated { expected: header_end, actual: frame.len() });
    }

    let mut packet = match codec {
        CodecType::Json => json::decode(&frame[PACKET_PREFIX_LEN..header_end])?,
        CodecType::Thunder => thunder::decode(&frame[PACKET_PREFIX_LEN..header_end])?,
    };
    packet.body = Bytes::copy_from_slice(&frame[header_end..]);
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> Packet {
        let mut packet = Packet::new(7, Bytes::from_static(b"payload"));
        packet.message = "remark".to_string();
        packet.ext_data.insert("route".to_string(), "primary".to_string());
        packet
    }

    #[test]
    fn json_frame_round_trips() {
        let packet = sample_packet();
        let wire = encode(&packet, CodecType::Json).unwrap();
        assert_eq!(wire[0], 0);
        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn thunder_frame_round_trips() {
        let packet = sample_packet();
        let wire = encode(&packet, CodecType::Thunder).unwrap();
        assert_eq!(wire[0], 1);
        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn decoder_honors_wire_codec_over_process_default() {
        // Encoded as Thunder; a peer configured for JSON must still decode it.
        let packet = sample_packet();
        let wire = encode(&packet, CodecType::Thunder).unwrap();
        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded.code, packet.code);
    }

    #[test]
    fn unknown_codec_byte_is_rejected() {
        let mut wire = encode(&sample_packet(), CodecType::Json).unwrap().to_vec();
        wire[0] = 9;
        assert_eq!(decode(&wire), Err(ProtocolError::UnknownCodec(9)));
    }

    #[test]
    fn negative_header_length_is_rejected() {
        let mut wire = encode(&sample_packet(), CodecType::Json).unwrap().to_vec();
        wire[1..5].copy_from_slice(&(-1i32).to_be_bytes());
        assert_eq!(decode(&wire), Err(ProtocolError::InvalidLength(-1)));
    }

    #[test]
    fn header_length_beyond_frame_is_rejected() {
        let packet = Packet::new(1, Bytes::new());
        let mut wire = encode(&packet, CodecType::Thunder).unwrap().to_vec();
        let claimed = wire.len() as i32; // larger than the actual header
        wire[1..5].copy_from_slice(&claimed.to_be_bytes());
        assert!(matches!(decode(&wire), Err(ProtocolError::Truncated { .. })));
    }

    #[test]
    fn missing_body_decodes_as_empty() {
        let mut packet = Packet::new(3, Bytes::new());
        packet.message = "no body".to_string();
        let wire = encode(&packet, CodecType::Thunder).unwrap();
        let decoded = decode(&wire).unwrap();
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn short_frame_is_rejected() {
        assert!(matches!(decode(&[1, 0, 0]), Err(ProtocolError::Truncated { .. })));
    }
}
