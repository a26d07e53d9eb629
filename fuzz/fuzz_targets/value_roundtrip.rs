#![no_main]

use libfuzzer_sys::fuzz_target;

use cbor_compat::{decode_value, Config, DecodeLimits};

fn fuzz_limits(input_len: usize) -> DecodeLimits {
    // Tight enough to avoid pathological allocations while still exploring structure.
    let max = input_len.min(1 << 20);
    DecodeLimits {
        max_input_bytes: max,
        max_depth: 64,
        max_total_items: 1 << 16,
        max_array_len: 1 << 12,
        max_map_len: 1 << 12,
        max_bytes_len: max,
        max_text_len: max,
    }
}

fuzz_target!(|data: &[u8]| {
    let config = Config::new().with_limits(fuzz_limits(data.len()));
    if let Ok(v) = decode_value(data, config) {
        // Re-encoding normalizes widths and indefinite lengths, so compare values, not bytes.
        let out = v.encode_to_vec().expect("re-encode");
        let again = decode_value(&out, Config::new().deny_trailing_bytes()).expect("decode re-encoded");
        assert_eq!(again, v);
        assert_eq!(again.encode_to_vec().expect("second encode"), out);
    }
});
