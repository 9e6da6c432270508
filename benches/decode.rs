#![allow(clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use cbor_lens::{
    decode, decode_with_source_map, encode, CborValue, DecodeOptions, EncodeOptions, Limits,
};

fn sample_small() -> Vec<u8> {
    vec![0xa1, 0x61, 0x61, 0x01] // {"a":1}
}

fn sample_medium() -> Vec<u8> {
    let entries = (0..64_i64)
        .map(|i| {
            let row = CborValue::Array(vec![i.into(), CborValue::bytes(vec![0xab; 16])]);
            (CborValue::text(format!("k{i:03}")), row)
        })
        .collect();
    encode(&CborValue::map(entries), &EncodeOptions::canonical()).unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let small = sample_small();
    let small_opts = DecodeOptions::strict().with_limits(Limits::for_bytes(small.len()));

    c.bench_function("decode_strict_small", |b| {
        b.iter(|| {
            decode(black_box(&small), &small_opts).unwrap();
        })
    });

    let medium = sample_medium();
    let relaxed = DecodeOptions::default().with_limits(Limits::for_bytes(medium.len()));
    let strict = DecodeOptions::strict().with_limits(Limits::for_bytes(medium.len()));

    c.bench_function("decode_medium", |b| {
        b.iter(|| {
            let v = decode(black_box(&medium), &relaxed).unwrap();
            black_box(v);
        })
    });

    c.bench_function("decode_strict_medium", |b| {
        b.iter(|| {
            let v = decode(black_box(&medium), &strict).unwrap();
            black_box(v);
        })
    });

    c.bench_function("decode_source_map_medium", |b| {
        b.iter(|| {
            let v = decode_with_source_map(black_box(&medium), &relaxed).unwrap();
            black_box(v);
        })
    });

    let decoded = decode(&medium, &relaxed).unwrap().value;
    c.bench_function("encode_canonical_medium", |b| {
        b.iter(|| {
            let bytes = encode(black_box(&decoded), &EncodeOptions::canonical()).unwrap();
            black_box(bytes);
        })
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
