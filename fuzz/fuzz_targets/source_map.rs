#![no_main]

use std::collections::HashSet;

use libfuzzer_sys::fuzz_target;

use cbor_lens::{decode_with_source_map, DecodeOptions, Limits};

fuzz_target!(|data: &[u8]| {
    let opts = DecodeOptions::default().with_limits(Limits::for_bytes(data.len()));
    if let Ok(out) = decode_with_source_map(data, &opts) {
        let mut paths = HashSet::new();
        for e in &out.source_map {
            assert!(e.start <= e.end && e.end <= out.bytes_consumed);
            assert!(paths.insert(e.path.as_str()), "duplicate path {:?}", e.path);
        }
    }
});
