//! The packet model: the in-memory unit of communication.
//!
//! A [`Packet`] carries an operation code, correlation id, flag bits, a
//! human-readable message, auxiliary string headers, and an opaque body.
//! Everything except the body is covered by the header serializers in
//! [`crate::codec`]; the body travels as raw trailing bytes.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicI32, Ordering},
};

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Flag bit marking a packet as a response to a prior request.
pub const FLAG_RESPONSE: i32 = 1;

/// Flag bit marking a packet as oneway (no response expected).
pub const FLAG_ONEWAY: i32 = 2;

/// Protocol-version hint stamped on locally originated packets.
pub const PROTOCOL_VERSION: i16 = 0;

/// Response code synthesized by a server that has no processor registered
/// for the request's code. Reserved; ordinary operation codes are
/// non-negative.
pub const CODE_NOT_SUPPORTED: i16 = -1;

static PACKET_ID_GENERATOR: AtomicI32 = AtomicI32::new(0);

/// Draw the next correlation id from the process-wide counter.
///
/// Ids are monotonically increasing and wrap at `i32::MAX`. Uniqueness is
/// only required within the window of outstanding requests, which the
/// 2^31 id space makes negligible to violate.
pub fn next_packet_id() -> i32 {
    PACKET_ID_GENERATOR.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
}

/// Originating-peer language tag. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageCode {
    /// Go peer (also what this implementation advertises on the wire).
    #[default]
    Go,
    /// Java peer.
    Java,
    /// C++ peer.
    Cpp,
    /// Python peer.
    Python,
    /// Anything unrecognized.
    Unknown,
}

impl LanguageCode {
    /// Wire byte for this language tag.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Go => 0,
            Self::Java => 1,
            Self::Cpp => 2,
            Self::Python => 3,
            Self::Unknown => 127,
        }
    }

    /// Decode a wire byte; unrecognized values map to [`Self::Unknown`].
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Go,
            1 => Self::Java,
            2 => Self::Cpp,
            3 => Self::Python,
            _ => Self::Unknown,
        }
    }
}

// The JSON header format always advertises "GO" regardless of the in-memory
// tag, and only recognizes "GO" when decoding. This mirrors the peer
// implementations this codec interoperates with.
impl Serialize for LanguageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("GO")
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "GO" => Self::Go,
            _ => Self::Unknown,
        })
    }
}

/// The unit of communication.
///
/// Requests and responses share this shape; the [`FLAG_RESPONSE`] bit tells
/// them apart, and a response echoes the `packet_id` of the request it
/// answers. The `body` field is never part of the serialized header — it is
/// appended to the frame as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    /// Operation identifier; namespace shared by requests and response
    /// status codes.
    pub code: i16,

    /// Originating-peer tag.
    pub language: LanguageCode,

    /// Protocol-version hint.
    pub version: i16,

    /// Request/response correlation identifier.
    pub packet_id: i32,

    /// Bit field; see [`FLAG_RESPONSE`] and [`FLAG_ONEWAY`].
    pub flag: i32,

    /// Human-readable remark.
    #[serde(default)]
    pub message: String,

    /// Auxiliary headers.
    ///
    /// Peers that serialize an absent map as `null` decode to an empty map.
    #[serde(default, deserialize_with = "nullable_map")]
    pub ext_data: HashMap<String, String>,

    /// Opaque payload; excluded from the header serialization.
    #[serde(skip)]
    pub body: Bytes,
}

fn nullable_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error> {
    let map = Option::<HashMap<String, String>>::deserialize(deserializer)?;
    Ok(map.unwrap_or_default())
}

impl Packet {
    /// Create a request packet with a freshly assigned correlation id.
    pub fn new(code: i16, body: impl Into<Bytes>) -> Self {
        Self {
            code,
            language: LanguageCode::Go,
            version: PROTOCOL_VERSION,
            packet_id: next_packet_id(),
            flag: 0,
            message: String::new(),
            ext_data: HashMap::new(),
            body: body.into(),
        }
    }

    /// Attach auxiliary headers.
    pub fn with_ext_data(mut self, ext_data: HashMap<String, String>) -> Self {
        self.ext_data = ext_data;
        self
    }

    /// Attach a human-readable remark.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Whether the response bit is set.
    pub fn is_response(&self) -> bool {
        self.flag & FLAG_RESPONSE == FLAG_RESPONSE
    }

    /// Set the response bit. Other flag bits are preserved.
    pub fn mark_response(&mut self) {
        self.flag |= FLAG_RESPONSE;
    }

    /// Whether the oneway bit is set.
    pub fn is_oneway(&self) -> bool {
        self.flag & FLAG_ONEWAY == FLAG_ONEWAY
    }

    /// Set the oneway bit. Other flag bits are preserved.
    pub fn mark_oneway(&mut self) {
        self.flag |= FLAG_ONEWAY;
    }
}
