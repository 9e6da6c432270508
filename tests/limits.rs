#![allow(clippy::unwrap_used)]

use cbor_lens::{
    decode, decode_sequence, encode, CborValue, DecodeOptions, EncodeOptions, ErrorCode,
    ErrorContext, Limits, DEFAULT_MAX_DEPTH, DEFAULT_MAX_TAG_DEPTH,
};

fn hex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

fn with_limits(limits: Limits) -> DecodeOptions {
    DecodeOptions::default().with_limits(limits)
}

fn nested_arrays(k: usize) -> Vec<u8> {
    let mut out = vec![0x81; k];
    out.push(0x00);
    out
}

fn nested_tags(k: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 * k + 1);
    for _ in 0..k {
        out.extend_from_slice(&[0xd8, 0x64]); // tag 100
    }
    out.push(0x00);
    out
}

#[test]
fn defaults_match_documented_values() {
    let l = Limits::default();
    assert_eq!(l.max_input_size, 10 * 1024 * 1024);
    assert_eq!(l.max_output_size, 100 * 1024 * 1024);
    assert_eq!(l.max_string_length, 1024 * 1024);
    assert_eq!(l.max_array_length, 10_000);
    assert_eq!(l.max_map_size, 10_000);
    assert_eq!(l.max_depth, 64);
    assert_eq!(l.max_tag_depth, 64);
    assert_eq!(l.max_bignum_bytes, 1024);
    assert_eq!(l.max_parse_time_ms, 1_000);
}

#[test]
fn array_depth_bound() {
    let opts = DecodeOptions::default();
    assert!(decode(&nested_arrays(DEFAULT_MAX_DEPTH), &opts).is_ok());

    let err = decode(&nested_arrays(DEFAULT_MAX_DEPTH + 1), &opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::MaxDepthExceeded);
    assert_eq!(err.offset, DEFAULT_MAX_DEPTH);
    assert_eq!(
        err.context,
        ErrorContext::Limit {
            max: DEFAULT_MAX_DEPTH as u64,
            actual: DEFAULT_MAX_DEPTH as u64 + 1,
        }
    );
}

#[test]
fn empty_containers_count_toward_depth() {
    let opts = with_limits(Limits {
        max_depth: 2,
        ..Limits::default()
    });
    assert!(decode(&hex("8180"), &opts).is_ok());
    assert_eq!(
        decode(&hex("818180"), &opts).unwrap_err().code,
        ErrorCode::MaxDepthExceeded
    );
    assert_eq!(
        decode(&hex("8181a0"), &opts).unwrap_err().code,
        ErrorCode::MaxDepthExceeded
    );
}

#[test]
fn tag_depth_bound() {
    let opts = DecodeOptions::default();
    assert!(decode(&nested_tags(DEFAULT_MAX_TAG_DEPTH), &opts).is_ok());
    assert_eq!(
        decode(&nested_tags(DEFAULT_MAX_TAG_DEPTH + 1), &opts)
            .unwrap_err()
            .code,
        ErrorCode::TagDepthExceeded
    );
}

#[test]
fn tag_depth_is_tracked_separately() {
    let opts = with_limits(Limits {
        max_tag_depth: 3,
        ..Limits::default()
    });
    assert!(decode(&nested_tags(3), &opts).is_ok());
    assert_eq!(
        decode(&nested_tags(4), &opts).unwrap_err().code,
        ErrorCode::TagDepthExceeded
    );

    // Arrays between tags do not reset the tag counter.
    let mut bytes = Vec::new();
    for _ in 0..4 {
        bytes.extend_from_slice(&[0xd8, 0x64, 0x81]);
    }
    bytes.push(0x00);
    assert_eq!(decode(&bytes, &opts).unwrap_err().code, ErrorCode::TagDepthExceeded);

    // Tags also count toward the shared depth.
    let opts = with_limits(Limits {
        max_depth: 3,
        ..Limits::default()
    });
    assert_eq!(
        decode(&nested_tags(4), &opts).unwrap_err().code,
        ErrorCode::MaxDepthExceeded
    );
}

#[test]
fn sibling_tags_do_not_accumulate() {
    let opts = with_limits(Limits {
        max_tag_depth: 1,
        ..Limits::default()
    });
    // [100(0), 100(0), 100(0)]
    assert!(decode(&hex("83d86400d86400d86400"), &opts).is_ok());
}

#[test]
fn hostile_lengths_fail_before_allocation() {
    let opts = DecodeOptions::default();
    let cases = [
        ("9bffffffffffffffff", ErrorCode::ArrayLenLimitExceeded),
        ("bbffffffffffffffff", ErrorCode::MapLenLimitExceeded),
        ("5bffffffffffffffff", ErrorCode::StringLenLimitExceeded),
        ("7bffffffffffffffff", ErrorCode::StringLenLimitExceeded),
    ];
    for (input, code) in cases {
        let err = decode(&hex(input), &opts).unwrap_err();
        assert_eq!(err.code, code, "{input}");
        assert_eq!(err.offset, 0, "{input}");
    }

    // Declared length within limits but larger than the input.
    assert_eq!(
        decode(&hex("9a00002710"), &opts).unwrap_err().code,
        ErrorCode::Truncated
    );
    assert_eq!(
        decode(&hex("5a000fffff"), &opts).unwrap_err().code,
        ErrorCode::Truncated
    );
}

#[test]
fn collection_length_limits() {
    let opts = with_limits(Limits {
        max_array_length: 2,
        max_map_size: 1,
        ..Limits::default()
    });
    assert!(decode(&hex("820102"), &opts).is_ok());
    assert_eq!(
        decode(&hex("83010203"), &opts).unwrap_err().code,
        ErrorCode::ArrayLenLimitExceeded
    );
    assert_eq!(
        decode(&hex("9f010203ff"), &opts).unwrap_err().code,
        ErrorCode::ArrayLenLimitExceeded
    );
    assert_eq!(
        decode(&hex("a2616101616202"), &opts).unwrap_err().code,
        ErrorCode::MapLenLimitExceeded
    );
    assert_eq!(
        decode(&hex("bf616101616202ff"), &opts).unwrap_err().code,
        ErrorCode::MapLenLimitExceeded
    );
}

#[test]
fn string_length_limit_covers_indefinite_totals() {
    let opts = with_limits(Limits {
        max_string_length: 3,
        ..Limits::default()
    });
    assert!(decode(&hex("63616263"), &opts).is_ok());
    assert_eq!(
        decode(&hex("6449455446"), &opts).unwrap_err().code,
        ErrorCode::StringLenLimitExceeded
    );
    // "ab" + "cd"
    assert_eq!(
        decode(&hex("7f626162626364ff"), &opts).unwrap_err().code,
        ErrorCode::StringLenLimitExceeded
    );
}

#[test]
fn bignum_limit() {
    let opts = with_limits(Limits {
        max_bignum_bytes: 4,
        ..Limits::default()
    });
    assert!(decode(&hex("c24401020304"), &opts).is_ok());
    let err = decode(&hex("c2450102030405"), &opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::BignumTooLarge);
    assert_eq!(err.context, ErrorContext::Limit { max: 4, actual: 5 });

    // Indefinite-length bignum payloads are checked after concatenation.
    assert_eq!(
        decode(&hex("c25f4301020343040506ff"), &opts).unwrap_err().code,
        ErrorCode::BignumTooLarge
    );
}

#[test]
fn input_size_limit() {
    let opts = with_limits(Limits {
        max_input_size: 3,
        ..Limits::default()
    });
    assert!(decode(&hex("820102"), &opts).is_ok());
    let err = decode(&hex("83010203"), &opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::InputTooLarge);
    assert_eq!(err.context, ErrorContext::Limit { max: 3, actual: 4 });
    assert_eq!(
        decode_sequence(&hex("01020304"), &opts).unwrap_err().code,
        ErrorCode::InputTooLarge
    );
}

/// A sequence of `count` maximal arrays of zeros: `count * 10_003` bytes.
fn wide_arrays(count: usize) -> Vec<u8> {
    let mut one = vec![0x99, 0x27, 0x10]; // array(10000)
    one.resize(3 + 10_000, 0x00);
    one.repeat(count)
}

#[test]
fn parse_deadline() {
    let bytes = wide_arrays(1_000);
    assert!(bytes.len() <= Limits::default().max_input_size);

    let opts = with_limits(Limits {
        max_parse_time_ms: 1,
        ..Limits::default()
    });
    let err = decode_sequence(&bytes, &opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::ParseTimeout);
    assert!(err.offset > 0 && err.offset < bytes.len());
    match err.context {
        ErrorContext::Limit { max, actual } => {
            assert_eq!(max, 1);
            assert!(actual > max, "elapsed {actual} ms");
        }
        other => panic!("unexpected context {other:?}"),
    }
}

#[test]
fn unusable_limits_are_rejected() {
    let opts = with_limits(Limits {
        max_parse_time_ms: 0,
        ..Limits::default()
    });
    assert_eq!(decode(&hex("00"), &opts).unwrap_err().code, ErrorCode::InvalidLimits);
}

#[test]
fn for_bytes_tracks_message_size() {
    let l = Limits::for_bytes(64);
    assert_eq!(l.max_input_size, 64);
    assert_eq!(l.max_string_length, 64);
    assert_eq!(l.max_depth, DEFAULT_MAX_DEPTH);
}

#[test]
fn output_size_limit() {
    let opts = EncodeOptions::default().with_limits(Limits {
        max_output_size: 4,
        ..Limits::default()
    });
    assert_eq!(encode(&CborValue::text("abc"), &opts).unwrap(), hex("63616263"));
    let err = encode(&CborValue::text("hello"), &opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::OutputSizeExceeded);

    // The bound applies to map entries buffered for sorting too.
    let canonical = EncodeOptions::canonical().with_limits(Limits {
        max_output_size: 4,
        ..Limits::default()
    });
    let map = CborValue::map(vec![(CborValue::text("key"), CborValue::text("value"))]);
    assert_eq!(
        encode(&map, &canonical).unwrap_err().code,
        ErrorCode::OutputSizeExceeded
    );
}

#[test]
fn encoder_depth_limit() {
    let mut v = CborValue::from(0);
    for _ in 0..=DEFAULT_MAX_DEPTH {
        v = CborValue::Array(vec![v]);
    }
    assert_eq!(
        encode(&v, &EncodeOptions::default()).unwrap_err().code,
        ErrorCode::MaxDepthExceeded
    );
}
