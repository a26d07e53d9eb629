#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;

use cbor_compat::{decode_with, encode_to_vec_with, CborDecode, CborEncode, Config};

#[derive(Debug, PartialEq, CborEncode, CborDecode)]
struct Record {
    id: u64,
    name: String,
    ratio: Option<f64>,
    items: Vec<i32>,
    extra: BTreeMap<String, bool>,
}

fuzz_target!(|data: &[u8]| {
    if let Ok(r) = decode_with::<Record>(data, Config::new()) {
        for config in [Config::new(), Config::keyed()] {
            let out = encode_to_vec_with(&r, config).expect("re-encode");
            let back: Record = decode_with(&out, config).expect("decode re-encoded");
            assert_eq!(back.id, r.id);
            assert_eq!(back.items, r.items);
            assert_eq!(back.extra, r.extra);
        }
    }
});
