#![no_main]

use libfuzzer_sys::fuzz_target;

use cbor_lens::{decode, encode, DecodeOptions, EncodeOptions};

fuzz_target!(|data: &[u8]| {
    let strict = DecodeOptions::strict();
    if let Ok(out) = decode(data, &strict) {
        // Canonical output must decode under strict rules to the same value, and re-encode
        // to the same bytes.
        let bytes = encode(&out.value, &EncodeOptions::canonical()).expect("re-encode");
        let again = decode(&bytes, &strict).expect("decode re-encoded");
        assert_eq!(again.value, out.value);
        assert_eq!(again.bytes_consumed, bytes.len());

        let twice = encode(&again.value, &EncodeOptions::canonical()).expect("re-encode twice");
        assert_eq!(twice, bytes);
    }
});
