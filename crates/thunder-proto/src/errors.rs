//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire data.
///
/// Causes are carried as strings so the error stays `Clone` — decode
/// failures are recorded on response futures that may be observed from
/// both a waiting caller and a completion callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The codec selector byte did not name a known header serializer.
    #[error("unknown codec type: {0}")]
    UnknownCodec(u8),

    /// The header serializer rejected the packet.
    #[error("header encode failed: {0}")]
    HeaderEncode(String),

    /// The serialized header could not be parsed.
    #[error("header decode failed: {0}")]
    HeaderDecode(String),

    /// Fewer bytes were available than the encoding claims.
    #[error("frame truncated: expected {expected} bytes, have {actual}")]
    Truncated {
        /// Bytes the encoding claims to need.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A length field exceeds the configured frame cap.
    #[error("frame length {len} exceeds maximum {max}")]
    FrameTooLarge {
        /// Claimed length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// A length field is negative when interpreted as a signed integer.
    #[error("invalid length field: {0}")]
    InvalidLength(i64),
}
