#![no_main]

use libfuzzer_sys::fuzz_target;

use cbor_lens::{decode, decode_sequence, DecodeOptions, Limits};

fuzz_target!(|data: &[u8]| {
    let relaxed = DecodeOptions::default().with_limits(Limits::for_bytes(data.len()));
    let _ = decode(data, &relaxed);
    let _ = decode_sequence(data, &relaxed);

    let strict = DecodeOptions::strict().with_limits(Limits::for_bytes(data.len()));
    let _ = decode(data, &strict);
});
