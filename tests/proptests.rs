// Property-based round trips.
//
// Sizes and depth are kept small so the suite stays fast.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use cbor_compat::{
    decode, decode_value, encode_to_vec, encode_to_vec_with, CborDecode, CborEncode, Config,
    ErrorCode, Value,
};
use proptest::prelude::*;

fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<char>(), 0..16).prop_map(|chars| chars.into_iter().collect())
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<u64>().prop_map(Value::Unsigned),
        any::<u64>().prop_map(Value::Negative),
        any::<u32>().prop_map(|bits| Value::Float32(f32::from_bits(bits))),
        any::<u64>().prop_map(|bits| Value::Float64(f64::from_bits(bits))),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
        arb_text().prop_map(Value::Text),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            proptest::collection::vec((inner.clone(), inner), 0..8).prop_map(Value::Map),
        ]
    })
}

#[derive(Debug, Clone, PartialEq, CborEncode, CborDecode)]
struct Sample {
    id: u64,
    delta: i32,
    ratio: f64,
    label: String,
    note: Option<String>,
    parts: Vec<i16>,
    index: BTreeMap<String, u8>,
}

fn arb_sample() -> impl Strategy<Value = Sample> {
    (
        any::<u64>(),
        any::<i32>(),
        any::<u64>().prop_map(f64::from_bits),
        arb_text(),
        proptest::option::of(arb_text()),
        proptest::collection::vec(any::<i16>(), 0..8),
        proptest::collection::btree_map(arb_text(), any::<u8>(), 0..4),
    )
        .prop_map(|(id, delta, ratio, label, note, parts, index)| Sample {
            id,
            delta,
            ratio,
            label,
            note,
            parts,
            index,
        })
}

fn same_sample(a: &Sample, b: &Sample) -> bool {
    a.ratio.to_bits() == b.ratio.to_bits()
        && Sample { ratio: 0.0, ..a.clone() } == Sample { ratio: 0.0, ..b.clone() }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn value_roundtrip(value in arb_value()) {
        let bytes = value.encode_to_vec().unwrap();
        let back = decode_value(&bytes, Config::new().deny_trailing_bytes()).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn record_roundtrip_both_layouts(sample in arb_sample()) {
        for config in [Config::new(), Config::keyed()] {
            let bytes = encode_to_vec_with(&sample, config).unwrap();
            let back: Sample = decode(&bytes).unwrap();
            prop_assert!(same_sample(&back, &sample));
        }
    }

    #[test]
    fn integers_roundtrip_minimally(v in any::<i64>()) {
        let bytes = encode_to_vec(&v).unwrap();
        let magnitude = if v < 0 { (!v).unsigned_abs() } else { v.unsigned_abs() };
        let expected_len = match magnitude {
            0..=23 => 1,
            24..=0xff => 2,
            0x100..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        };
        prop_assert_eq!(bytes.len(), expected_len);
        prop_assert_eq!(decode::<i64>(&bytes).unwrap(), v);
    }

    #[test]
    fn f32_bits_survive(bits in any::<u32>()) {
        let v = f32::from_bits(bits);
        let bytes = encode_to_vec(&v).unwrap();
        prop_assert_eq!(bytes.len(), 5);
        prop_assert_eq!(decode::<f32>(&bytes).unwrap().to_bits(), bits);
    }

    #[test]
    fn truncated_prefixes_never_succeed(value in arb_value()) {
        let bytes = value.encode_to_vec().unwrap();
        for cut in 0..bytes.len() {
            let err = decode_value(&bytes[..cut], Config::new()).unwrap_err();
            prop_assert!(
                matches!(
                    err.code,
                    ErrorCode::UnexpectedEndOfInput | ErrorCode::TruncatedStructure
                ),
                "cut {} gave {:?}",
                cut,
                err
            );
        }
    }

    #[test]
    fn arbitrary_input_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_value(&bytes, Config::new());
        let _ = decode::<Sample>(&bytes);
    }
}
