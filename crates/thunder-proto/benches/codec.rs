//! Encode/decode throughput for both header codecs.

use std::{collections::HashMap, hint::black_box};

use bytes::Bytes;
use criterion::{Criterion, criterion_group, criterion_main};
use thunder_proto::{CodecType, Packet, codec};

fn bench_packet() -> Packet {
    let mut ext_data = HashMap::new();
    ext_data.insert("route".to_string(), "primary".to_string());
    ext_data.insert("tenant".to_string(), "bench".to_string());

    let mut packet = Packet::new(1, Bytes::from(vec![0xabu8; 256]));
    packet.message = "benchmark request".to_string();
    packet.ext_data = ext_data;
    packet
}

fn codec_benches(c: &mut Criterion) {
    let packet = bench_packet();
    let json_wire = codec::encode(&packet, CodecType::Json).unwrap();
    let thunder_wire = codec::encode(&packet, CodecType::Thunder).unwrap();

    c.bench_function("encode_json", |b| {
        b.iter(|| codec::encode(black_box(&packet), CodecType::Json).unwrap());
    });
    c.bench_function("encode_thunder", |b| {
        b.iter(|| codec::encode(black_box(&packet), CodecType::Thunder).unwrap());
    });
    c.bench_function("decode_json", |b| {
        b.iter(|| codec::decode(black_box(&json_wire)).unwrap());
    });
    c.bench_function("decode_thunder", |b| {
        b.iter(|| codec::decode(black_box(&thunder_wire)).unwrap());
    });
}

criterion_group!(benches, codec_benches);
criterion_main!(benches);
