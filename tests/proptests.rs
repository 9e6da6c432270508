// Property-based tests for canonical round trips and decoder robustness.
//
// Sizes and depths stay small to keep CI fast.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;

use cbor_lens::{
    decode, decode_with_source_map, encode, BigInt, CborInteger, CborValue, DecodeOptions,
    EncodeOptions, Encoder, MAX_SAFE_INTEGER_I64, MIN_SAFE_INTEGER,
};

fn arb_key() -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::char::range('a', 'z'), 0..32)
        .prop_map(|chars| chars.into_iter().collect())
}

fn arb_bigint() -> impl Strategy<Value = CborInteger> {
    // A magnitude of 8+ bytes with a nonzero lead byte is always outside the safe range.
    (
        any::<bool>(),
        proptest::collection::vec(any::<u8>(), 8..24).prop_map(|mut v| {
            if v[0] == 0 {
                v[0] = 1;
            }
            v
        }),
    )
        .prop_map(|(neg, mag)| CborInteger::from(BigInt::new(neg, &mag)))
}

fn arb_leaf() -> impl Strategy<Value = CborValue> {
    prop_oneof![
        (MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER_I64).prop_map(CborValue::from),
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(CborValue::bytes),
        arb_key().prop_map(CborValue::text),
        any::<bool>().prop_map(CborValue::Bool),
        Just(CborValue::Null),
        Just(CborValue::Undefined),
        any::<f64>().prop_map(CborValue::from),
        arb_bigint().prop_map(CborValue::Integer),
    ]
}

/// Text-keyed maps with unique keys, entries already in canonical key order.
fn arb_value() -> impl Strategy<Value = CborValue> {
    arb_leaf().prop_recursive(4, 256, 10, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..16).prop_map(CborValue::Array),
            proptest::collection::vec((arb_key(), inner), 0..16).prop_map(|pairs| {
                let mut pairs = pairs;
                pairs.sort_by(|a, b| (a.0.len(), &a.0).cmp(&(b.0.len(), &b.0)));
                pairs.dedup_by(|a, b| a.0 == b.0);
                CborValue::map(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (CborValue::text(k), v))
                        .collect(),
                )
            }),
        ]
    })
}

proptest! {
    #[test]
    fn canonical_roundtrip(v in arb_value()) {
        let bytes = encode(&v, &EncodeOptions::canonical()).unwrap();
        let out = decode(&bytes, &DecodeOptions::strict()).unwrap();
        prop_assert_eq!(out.bytes_consumed, bytes.len());
        prop_assert_eq!(&out.value, &v);

        let again = encode(&out.value, &EncodeOptions::canonical()).unwrap();
        prop_assert_eq!(again, bytes);
    }

    #[test]
    fn default_roundtrip(v in arb_value()) {
        let bytes = encode(&v, &EncodeOptions::default()).unwrap();
        let out = decode(&bytes, &DecodeOptions::default()).unwrap();
        prop_assert_eq!(out.value, v);
    }

    #[test]
    fn source_map_ranges_stay_in_bounds(v in arb_value()) {
        let bytes = encode(&v, &EncodeOptions::canonical()).unwrap();
        let out = decode_with_source_map(&bytes, &DecodeOptions::default()).unwrap();
        prop_assert!(!out.source_map.is_empty());
        prop_assert_eq!(out.source_map[0].path.as_str(), "");
        let mut paths = std::collections::HashSet::new();
        for e in &out.source_map {
            prop_assert!(e.start <= e.end && e.end <= bytes.len());
            prop_assert!(paths.insert(e.path.as_str()), "duplicate path {:?}", e.path);
        }
    }

    #[test]
    fn arbitrary_bytes_do_not_panic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(out) = decode(&data, &DecodeOptions::default()) {
            prop_assert!(out.bytes_consumed <= data.len());
            prop_assert!(out.bytes_consumed > 0);
        }
        let _ = decode(&data, &DecodeOptions::strict());
        let _ = decode_with_source_map(&data, &DecodeOptions::default());
    }

    #[test]
    fn uint_heads_are_shortest(n in any::<u64>()) {
        let mut e = Encoder::new();
        e.uint(n).unwrap();
        let expected = match n {
            0..=23 => 1,
            24..=0xff => 2,
            0x100..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        };
        prop_assert_eq!(e.len(), expected);
        let back = decode(e.as_bytes(), &DecodeOptions::canonical()).unwrap();
        prop_assert_eq!(back.value, CborValue::from(n));
    }
}
