//! Binary "Thunder" header serializer.
//!
//! Fixed-size scalars followed by two length-delimited variable fields,
//! all integers big-endian:
//!
//! ```text
//! i16  code
//! u8   language
//! i16  version
//! i32  packet_id
//! i32  flag
//! i32  message length M
//! M    message bytes (UTF-8, absent if M == 0)
//! i32  ext_data length E
//! E    ext_data block  (absent if E == 0)
//! ```
//!
//! The ext_data block is a concatenation of entries — `i16` key length,
//! key bytes, `i32` value length, value bytes — consumed until the block
//! is exhausted. Map iteration order is not preserved across a round
//! trip; the set of entries and every scalar field is.

use std::collections::HashMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    packet::{LanguageCode, Packet},
};

/// Bytes occupied by the fixed-size fields (scalars plus the two length
/// fields).
pub const FIXED_HEADER_LEN: usize = 21;

pub(crate) fn encode(packet: &Packet) -> Result<Bytes> {
    let ext = encode_ext_data(&packet.ext_data)?;

    let mut buf = BytesMut::with_capacity(FIXED_HEADER_LEN + packet.message.len() + ext.len());
    buf.put_i16(packet.code);
    buf.put_u8(packet.language.to_byte());
    buf.put_i16(packet.version);
    buf.put_i32(packet.packet_id);
    buf.put_i32(packet.flag);
    buf.put_i32(packet.message.len() as i32);
    buf.put_slice(packet.message.as_bytes());
    buf.put_i32(ext.len() as i32);
    buf.put_slice(&ext);
    Ok(buf.freeze())
}

pub(crate) fn decode(header: &[u8]) -> Result<Packet> {
    let mut buf = header;

    let code = get_i16(&mut buf)?;
    let language = LanguageCode::from_byte(get_u8(&mut buf)?);
    let version = get_i16(&mut buf)?;
    let packet_id = get_i32(&mut buf)?;
    let flag = get_i32(&mut buf)?;

    let message_len = get_i32(&mut buf)?;
    let message = if message_len > 0 {
        get_string(&mut buf, message_len as usize)?
    } else {
        String::new()
    };

    let ext_len = get_i32(&mut buf)?;
    let ext_data = if ext_len > 0 {
        let block = get_bytes(&mut buf, ext_len as usize)?;
        decode_ext_data(&block)?
    } else {
        HashMap::new()
    };

    Ok(Packet {
        code,
        language,
        version,
        packet_id,
        flag,
        message,
        ext_data,
        body: Bytes::new(),
    })
}

fn encode_ext_data(ext_data: &HashMap<String, String>) -> Result<Bytes> {
    if ext_data.is_empty() {
        return Ok(Bytes::new());
    }

    let mut buf = BytesMut::new();
    for (key, value) in ext_data {
        if key.len() > i16::MAX as usize {
            return Err(ProtocolError::HeaderEncode(format!(
                "ext_data key length {} exceeds i16 range",
                key.len()
            )));
        }
        buf.put_i16(key.len() as i16);
        buf.put_slice(key.as_bytes());
        buf.put_i32(value.len() as i32);
        buf.put_slice(value.as_bytes());
    }
    Ok(buf.freeze())
}

fn decode_ext_data(block: &[u8]) -> Result<HashMap<String, String>> {
    let mut buf = block;
    let mut ext_data = HashMap::new();

    while buf.has_remaining() {
        let key_len = get_i16(&mut buf)?;
        if key_len < 0 {
            return Err(ProtocolError::HeaderDecode(format!("negative key length: {key_len}")));
        }
        let key = get_string(&mut buf, key_len as usize)?;

        let value_len = get_i32(&mut buf)?;
        if value_len < 0 {
            return Err(ProtocolError::HeaderDecode(format!(
                "negative value length: {value_len}"
            )));
        }
        let value = get_string(&mut buf, value_len as usize)?;

        ext_data.insert(key, value);
    }

    Ok(ext_data)
}

fn ensure(buf: &&[u8], needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(ProtocolError::Truncated { expected: needed, actual: buf.remaining() });
    }
    Ok(())
}

fn get_u8(buf: &mut &[u8]) -> Result<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

fn get_i16(buf: &mut &[u8]) -> Result<i16> {
    ensure(buf, 2)?;
    Ok(buf.get_i16())
}

fn get_i32(buf: &mut &[u8]) -> Result<i32> {
    ensure(buf, 4)?;
    Ok(buf.get_i32())
}

fn get_bytes(buf: &mut &[u8], len: usize) -> Result<Bytes> {
    ensure(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

fn get_string(buf: &mut &[u8], len: usize) -> Result<String> {
    let raw = get_bytes(buf, len)?;
    String::from_utf8(raw.to_vec())
        .map_err(|err| ProtocolError::HeaderDecode(format!("invalid UTF-8: {err}")))
}
