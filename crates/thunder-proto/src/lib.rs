//! Wire protocol for the Thunder RPC transport.
//!
//! This crate is the pure byte layer: no I/O, no tasks. It defines the
//! [`Packet`] model, the two interchangeable header serializers (JSON and
//! binary "Thunder", selected by [`CodecType`]), the packet layout within a
//! frame, and the length-prefix frame helpers. The engine crate
//! (`thunder-rpc`) drives these from its per-connection receive loops.
//!
//! # Wire layout
//!
//! ```text
//! [4 bytes: frame length N, big-endian unsigned]
//! [1 byte : codec_type]
//! [4 bytes: header length H, big-endian signed]
//! [H bytes: serialized header]
//! [N - 5 - H bytes: body]
//! ```
//!
//! Implementations in any language that follow this layout interoperate.

pub mod codec;
pub mod errors;
pub mod frame;
pub mod packet;

pub use codec::{CodecType, decode, encode};
pub use errors::{ProtocolError, Result};
pub use packet::{
    CODE_NOT_SUPPORTED, FLAG_ONEWAY, FLAG_RESPONSE, LanguageCode, PROTOCOL_VERSION, Packet,
    next_packet_id,
};
