#![allow(clippy::unwrap_used)]

use cbor_lens::{
    decode, CborValue, Constructor, DecodeOptions, DupMapKeyMode, ErrorCode, FloatWidth, Limits,
};
use tracing_test::traced_test;

fn hex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

fn decode_default(s: &str) -> CborValue {
    decode(&hex(s), &DecodeOptions::default()).unwrap().value
}

fn decode_err(s: &str, opts: &DecodeOptions) -> (ErrorCode, usize) {
    let err = decode(&hex(s), opts).unwrap_err();
    (err.code, err.offset)
}

fn float_of(v: &CborValue) -> (f64, FloatWidth) {
    match v {
        CborValue::Float(f) => (f.value(), f.width()),
        other => panic!("expected float, got {other:?}"),
    }
}

#[test]
fn reference_examples() {
    let out = decode(&hex("1864"), &DecodeOptions::default()).unwrap();
    assert_eq!(out.value.as_i64(), Some(100));
    assert_eq!(out.bytes_consumed, 2);

    let out = decode(&hex("6449455446"), &DecodeOptions::default()).unwrap();
    assert_eq!(out.value.as_text(), Some("IETF"));
    assert_eq!(out.bytes_consumed, 5);

    assert_eq!(
        decode_default("83010203"),
        CborValue::Array(vec![1.into(), 2.into(), 3.into()])
    );

    let map = decode(&hex("a1616101"), &DecodeOptions::canonical()).unwrap().value;
    assert_eq!(map.as_map().unwrap().get_text("a").and_then(CborValue::as_i64), Some(1));

    assert_eq!(
        decode_err("b802616101616202", &DecodeOptions::canonical()),
        (ErrorCode::NonCanonicalEncoding, 0)
    );

    assert_eq!(
        decode_default("d87980"),
        CborValue::Constructor(Constructor {
            index: 0,
            fields: Vec::new(),
        })
    );

    let mut bignum = hex("c2590800");
    bignum.extend(std::iter::repeat(0u8).take(2048));
    let opts = DecodeOptions::default().with_limits(Limits {
        max_bignum_bytes: 1024,
        ..Limits::default()
    });
    assert_eq!(decode(&bignum, &opts).unwrap_err().code, ErrorCode::BignumTooLarge);
}

#[test]
fn trailing_bytes_are_not_consumed() {
    let out = decode(&hex("0102"), &DecodeOptions::default()).unwrap();
    assert_eq!(out.value.as_i64(), Some(1));
    assert_eq!(out.bytes_consumed, 1);
}

#[test]
fn negative_integers() {
    assert_eq!(decode_default("20").as_i64(), Some(-1));
    assert_eq!(decode_default("37").as_i64(), Some(-24));
    assert_eq!(decode_default("3818").as_i64(), Some(-25));
    assert_eq!(decode_default("3903e7").as_i64(), Some(-1000));
}

#[test]
fn safe_integer_boundary_is_symmetric() {
    // 2^53 - 1
    let v = decode_default("1b001fffffffffffff");
    assert_eq!(v.as_i64(), Some(9_007_199_254_740_991));

    // 2^53
    let v = decode_default("1b0020000000000000");
    let i = v.as_integer().unwrap();
    assert!(i.is_big());
    assert_eq!(i.to_string(), "9007199254740992");

    // -(2^53 - 1)
    let v = decode_default("3b001ffffffffffffe");
    assert_eq!(v.as_i64(), Some(-9_007_199_254_740_991));

    // -(2^53)
    let v = decode_default("3b001fffffffffffff");
    let i = v.as_integer().unwrap();
    assert!(i.is_big());
    assert_eq!(i.to_string(), "-9007199254740992");

    let v = decode_default("3bffffffffffffffff");
    assert_eq!(v.as_integer().unwrap().to_string(), "-18446744073709551616");
    let v = decode_default("1bffffffffffffffff");
    assert_eq!(v.as_integer().unwrap().to_string(), "18446744073709551615");
}

#[test]
fn half_precision_floats() {
    assert_eq!(float_of(&decode_default("f90000")), (0.0, FloatWidth::Half));
    let (neg_zero, _) = float_of(&decode_default("f98000"));
    assert_eq!(neg_zero.to_bits(), (-0.0f64).to_bits());
    assert_eq!(float_of(&decode_default("f93c00")).0, 1.0);
    assert_eq!(float_of(&decode_default("f93e00")).0, 1.5);
    assert_eq!(float_of(&decode_default("f97bff")).0, 65504.0);
    assert_eq!(float_of(&decode_default("f90001")).0, 5.960_464_477_539_063e-8);
    assert_eq!(float_of(&decode_default("f90400")).0, 6.103_515_625e-5);
    assert_eq!(float_of(&decode_default("f9c400")).0, -4.0);
    assert_eq!(float_of(&decode_default("f97c00")).0, f64::INFINITY);
    assert_eq!(float_of(&decode_default("f9fc00")).0, f64::NEG_INFINITY);
    assert!(float_of(&decode_default("f97e00")).0.is_nan());
}

#[test]
fn single_and_double_floats() {
    assert_eq!(
        float_of(&decode_default("fa47c35000")),
        (100_000.0, FloatWidth::Single)
    );
    assert_eq!(float_of(&decode_default("fa7f800000")).0, f64::INFINITY);
    assert_eq!(
        float_of(&decode_default("fb3ff199999999999a")),
        (1.1, FloatWidth::Double)
    );
    assert_eq!(float_of(&decode_default("fbc010666666666666")).0, -4.1);
}

#[test]
fn simple_values() {
    assert_eq!(decode_default("f4"), CborValue::Bool(false));
    assert_eq!(decode_default("f5"), CborValue::Bool(true));
    assert_eq!(decode_default("f6"), CborValue::Null);
    assert_eq!(decode_default("f7"), CborValue::Undefined);
    assert_eq!(decode_default("f0"), CborValue::Simple(16));
    assert_eq!(decode_default("f820"), CborValue::Simple(32));
    assert_eq!(decode_default("f8ff"), CborValue::Simple(255));

    let opts = DecodeOptions::default();
    assert_eq!(decode_err("f818", &opts).0, ErrorCode::InvalidSimpleValue);
    assert_eq!(decode_err("f813", &opts).0, ErrorCode::InvalidSimpleValue);
}

#[test]
fn malformed_heads() {
    let opts = DecodeOptions::default();
    assert_eq!(decode_err("", &opts), (ErrorCode::Truncated, 0));
    assert_eq!(decode_err("18", &opts), (ErrorCode::Truncated, 1));
    assert_eq!(decode_err("1c", &opts).0, ErrorCode::InvalidAdditionalInfo);
    assert_eq!(decode_err("fe", &opts).0, ErrorCode::InvalidAdditionalInfo);
    assert_eq!(decode_err("1f", &opts).0, ErrorCode::InvalidAdditionalInfo);
    assert_eq!(decode_err("df00", &opts).0, ErrorCode::InvalidAdditionalInfo);
    assert_eq!(decode_err("ff", &opts), (ErrorCode::UnexpectedBreak, 0));
    assert_eq!(decode_err("8201ff", &opts), (ErrorCode::UnexpectedBreak, 2));
    assert_eq!(decode_err("6449", &opts).0, ErrorCode::Truncated);
}

#[test]
fn indefinite_strings_keep_chunks() {
    let v = decode_default("5f42010243030405ff");
    let CborValue::Bytes(b) = v else {
        panic!("expected bytes");
    };
    assert_eq!(b.as_slice(), &[1, 2, 3, 4, 5]);
    assert_eq!(b.chunks().unwrap().len(), 2);

    let v = decode_default("7f657374726561646d696e67ff");
    assert_eq!(v.as_text(), Some("streaming"));

    let v = decode_default("5fff");
    assert_eq!(v.as_bytes(), Some(&[][..]));
}

#[test]
fn indefinite_string_errors() {
    let opts = DecodeOptions::default();
    assert_eq!(decode_err("5f4101", &opts), (ErrorCode::MissingBreakCode, 3));
    assert_eq!(decode_err("5f5f4101ffff", &opts), (ErrorCode::NestedIndefiniteString, 1));
    assert_eq!(decode_err("5f6161ff", &opts), (ErrorCode::NestedIndefiniteString, 1));
}

#[test]
fn indefinite_collections() {
    assert_eq!(decode_default("9fff"), CborValue::Array(Vec::new()));
    assert_eq!(
        decode_default("9f018202039f0405ffff"),
        CborValue::Array(vec![
            1.into(),
            CborValue::Array(vec![2.into(), 3.into()]),
            CborValue::Array(vec![4.into(), 5.into()]),
        ])
    );

    let v = decode_default("bf61610161629f0203ffff");
    let m = v.as_map().unwrap();
    assert_eq!(m.len(), 2);
    assert_eq!(m.get_text("a").and_then(CborValue::as_i64), Some(1));
    assert_eq!(
        m.get_text("b"),
        Some(&CborValue::Array(vec![2.into(), 3.into()]))
    );

    let opts = DecodeOptions::default();
    assert_eq!(decode_err("bf6161ff", &opts), (ErrorCode::OddLengthMap, 3));
    assert_eq!(decode_err("9f01", &opts), (ErrorCode::MissingBreakCode, 2));
    assert_eq!(decode_err("bf", &opts), (ErrorCode::MissingBreakCode, 1));
}

#[test]
fn allow_indefinite_false_rejects_indefinite_items() {
    let opts = DecodeOptions {
        allow_indefinite: false,
        ..DecodeOptions::default()
    };
    assert_eq!(decode_err("9fff", &opts), (ErrorCode::IndefiniteNotAllowed, 0));
    assert_eq!(decode_err("5fff", &opts), (ErrorCode::IndefiniteNotAllowed, 0));
    assert_eq!(decode_err("81bfff", &opts), (ErrorCode::IndefiniteNotAllowed, 1));
}

#[test]
fn canonical_validation() {
    let opts = DecodeOptions::canonical();
    assert_eq!(decode_err("1817", &opts), (ErrorCode::NonCanonicalEncoding, 0));
    assert_eq!(decode_err("190017", &opts).0, ErrorCode::NonCanonicalEncoding);
    assert_eq!(decode_err("1a0000ffff", &opts).0, ErrorCode::NonCanonicalEncoding);
    assert_eq!(decode_err("1b00000000ffffffff", &opts).0, ErrorCode::NonCanonicalEncoding);
    assert_eq!(decode_err("9fff", &opts), (ErrorCode::IndefiniteNotAllowed, 0));

    // {"b": 1, "a": 2}
    assert_eq!(
        decode_err("a2616201616102", &opts),
        (ErrorCode::KeysNotInCanonicalOrder, 4)
    );
    // {"a": 1, "a": 2}
    assert_eq!(decode_err("a2616101616102", &opts), (ErrorCode::DuplicateMapKey, 4));
    // {10: 1, "a": 2}: shorter key first.
    assert!(decode(&hex("a20a01616102"), &opts).is_ok());
    // {"a": 1, 10: 2}
    assert_eq!(
        decode_err("a26161010a02", &opts),
        (ErrorCode::KeysNotInCanonicalOrder, 4)
    );

    // The same inputs are fine without validation.
    assert_eq!(decode_default("1817").as_i64(), Some(23));
    assert!(decode(&hex("a2616201616102"), &DecodeOptions::default()).is_ok());
}

#[test]
fn floats_are_exempt_from_shortest_head_rule() {
    let v = decode(&hex("fb3ff8000000000000"), &DecodeOptions::canonical())
        .unwrap()
        .value;
    assert_eq!(float_of(&v), (1.5, FloatWidth::Double));
}

#[test]
fn strict_utf8() {
    let strict = DecodeOptions {
        validate_utf8_strict: true,
        ..DecodeOptions::default()
    };
    assert_eq!(decode_err("62c328", &strict), (ErrorCode::InvalidUtf8, 1));
    // Encoded surrogate U+D800.
    assert_eq!(decode_err("63eda080", &strict).0, ErrorCode::InvalidUtf8);
    // Overlong "/".
    assert_eq!(decode_err("62c0af", &strict).0, ErrorCode::InvalidUtf8);
    // Above U+10FFFF.
    assert_eq!(decode_err("64f4908080", &strict).0, ErrorCode::InvalidUtf8);
    // Truncated sequence.
    assert_eq!(decode_err("62e282", &strict).0, ErrorCode::InvalidUtf8);

    assert_eq!(decode_default("62c328").as_text(), Some("\u{fffd}("));
}

#[test]
fn duplicate_keys_last_write_wins_by_default() {
    let v = decode_default("a2616101616102");
    let m = v.as_map().unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m.get_text("a").and_then(CborValue::as_i64), Some(2));

    let reject = DecodeOptions {
        dup_map_key_mode: DupMapKeyMode::Reject,
        ..DecodeOptions::default()
    };
    assert_eq!(decode_err("a2616101616102", &reject), (ErrorCode::DuplicateMapKey, 4));
}

#[test]
#[traced_test]
fn warn_mode_reports_each_duplicate() {
    let warn = DecodeOptions {
        dup_map_key_mode: DupMapKeyMode::Warn,
        ..DecodeOptions::default()
    };
    let v = decode(&hex("a2616101616102"), &warn).unwrap().value;
    let m = v.as_map().unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m.get_text("a").and_then(CborValue::as_i64), Some(2));
    assert!(logs_contain("duplicate map key, later value wins"));
    assert!(logs_contain("offset=4"));
}

#[test]
#[traced_test]
fn allow_mode_overwrites_silently() {
    decode(&hex("a2616101616102"), &DecodeOptions::default()).unwrap();
    assert!(!logs_contain("duplicate map key"));
}

#[test]
fn duplicate_keys_compare_canonical_encoding() {
    // {1: 10, 1: 11} with the second key written in the one-byte-argument form.
    let reject = DecodeOptions {
        dup_map_key_mode: DupMapKeyMode::Reject,
        ..DecodeOptions::default()
    };
    assert_eq!(decode_err("a2010a18010b", &reject), (ErrorCode::DuplicateMapKey, 3));

    let v = decode_default("a2010a18010b");
    let m = v.as_map().unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(&CborValue::from(1)).and_then(CborValue::as_i64), Some(11));

    // Composite keys: [1, 2] twice, the second with an indefinite-length array.
    assert_eq!(
        decode_err("a2820102f59f0102fff4", &reject),
        (ErrorCode::DuplicateMapKey, 5)
    );
}

#[test]
fn strict_implies_every_check() {
    let strict = DecodeOptions::strict();
    assert_eq!(decode_err("1817", &strict).0, ErrorCode::NonCanonicalEncoding);
    assert_eq!(decode_err("9fff", &strict).0, ErrorCode::IndefiniteNotAllowed);
    assert_eq!(decode_err("62c328", &strict).0, ErrorCode::InvalidUtf8);
    assert_eq!(decode_err("c16161", &strict).0, ErrorCode::InvalidTagContent);
    assert_eq!(
        decode_err("d90102820101", &strict).0,
        ErrorCode::DuplicateSetElement
    );
    assert!(decode(&hex("a1616101"), &strict).is_ok());
}
