//! Property-based tests for packet encoding/decoding.
//!
//! These verify the round-trip contract for ALL representable packets, not
//! just hand-picked examples: every header field survives both codecs, the
//! ext_data entry set is preserved regardless of map iteration order, and
//! the body travels byte-for-byte.

use std::collections::HashMap;

use bytes::Bytes;
use proptest::prelude::{Strategy, any, prop, prop_assert_eq, proptest};
use thunder_proto::{CodecType, LanguageCode, Packet, codec};

fn arbitrary_ext_data() -> impl Strategy<Value = HashMap<String, String>> {
    prop::collection::hash_map("[a-zA-Z0-9_.-]{1,16}", "[ -~]{0,32}", 0..8)
}

fn arbitrary_packet() -> impl Strategy<Value = Packet> {
    (
        any::<i16>(),                           // code
        any::<i16>(),                           // version
        any::<i32>(),                           // packet_id
        any::<i32>(),                           // flag
        "[ -~]{0,64}",                          // message
        arbitrary_ext_data(),                   // ext_data
        prop::collection::vec(any::<u8>(), 0..1024), // body
    )
        .prop_map(|(code, version, packet_id, flag, message, ext_data, body)| Packet {
            code,
            language: LanguageCode::Go,
            version,
            packet_id,
            flag,
            message,
            ext_data,
            body: Bytes::from(body),
        })
}

proptest! {
    #[test]
    fn thunder_round_trip_is_identity(packet in arbitrary_packet()) {
        let wire = codec::encode(&packet, CodecType::Thunder).unwrap();
        let decoded = codec::decode(&wire).unwrap();
        prop_assert_eq!(decoded, packet);
    }

    #[test]
    fn json_round_trip_is_identity(packet in arbitrary_packet()) {
        let wire = codec::encode(&packet, CodecType::Json).unwrap();
        let decoded = codec::decode(&wire).unwrap();
        prop_assert_eq!(decoded, packet);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        // Malformed frames must surface as errors, not panics.
        let _ = codec::decode(&bytes);
    }

    #[test]
    fn truncating_a_valid_frame_never_panics(
        packet in arbitrary_packet(),
        keep in any::<prop::sample::Index>(),
    ) {
        let wire = codec::encode(&packet, CodecType::Thunder).unwrap();
        let cut = keep.index(wire.len());
        let _ = codec::decode(&wire[..cut]);
    }
}

#[test]
fn binary_header_round_trip_literal() {
    let mut ext_data = HashMap::new();
    ext_data.insert("a".to_string(), "1".to_string());
    ext_data.insert("bb".to_string(), "22".to_string());

    let packet = Packet {
        code: 42,
        language: LanguageCode::Go,
        version: 7,
        packet_id: 12345,
        flag: 3,
        message: "hello".to_string(),
        ext_data,
        body: Bytes::from((0u8..=255).collect::<Vec<u8>>()),
    };

    let wire = codec::encode(&packet, CodecType::Thunder).unwrap();
    assert_eq!(wire[0], CodecType::Thunder.to_byte());

    let decoded = codec::decode(&wire).unwrap();
    assert_eq!(decoded.code, 42);
    assert_eq!(decoded.language, LanguageCode::Go);
    assert_eq!(decoded.version, 7);
    assert_eq!(decoded.packet_id, 12345);
    assert_eq!(decoded.flag, 3);
    assert_eq!(decoded.message, "hello");
    assert_eq!(decoded.ext_data, packet.ext_data);
    assert_eq!(decoded.body, packet.body);
}

#[test]
fn codecs_disagree_on_bytes_but_agree_on_meaning() {
    let packet = Packet::new(9, Bytes::from_static(b"same payload"));
    let json_wire = codec::encode(&packet, CodecType::Json).unwrap();
    let thunder_wire = codec::encode(&packet, CodecType::Thunder).unwrap();

    assert_ne!(json_wire, thunder_wire);
    assert_eq!(codec::decode(&json_wire).unwrap(), codec::decode(&thunder_wire).unwrap());
}
