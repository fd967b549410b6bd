//! JSON header serializer.
//!
//! Serializes every packet field except `body` as a UTF-8 JSON object with
//! keys `code`, `language`, `version`, `packetId`, `flag`, `message`, and
//! `extData`. The language tag always encodes as `"GO"`; on decode, `"GO"`
//! maps to [`LanguageCode::Go`](crate::packet::LanguageCode::Go) and
//! anything else to `Unknown`. `serde_json` performs no HTML escaping.

use bytes::Bytes;

use crate::{
    errors::{ProtocolError, Result},
    packet::Packet,
};

pub(crate) fn encode(packet: &Packet) -> Result<Bytes> {
    let header =
        serde_json::to_vec(packet).map_err(|err| ProtocolError::HeaderEncode(err.to_string()))?;
    Ok(Bytes::from(header))
}

pub(crate) fn decode(header: &[u8]) -> Result<Packet> {
    serde_json::from_slice(header).map_err(|err| ProtocolError::HeaderDecode(err.to_string()))
}
