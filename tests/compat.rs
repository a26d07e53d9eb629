// Interop with an independent CBOR implementation.
#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;

use cbor_compat::{decode, encode_to_vec, encode_to_vec_with, CborDecode, CborEncode, Config};
use hex_literal::hex;
use serde::{Deserialize, Serialize};

fn reference<T: Serialize>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).unwrap();
    out
}

fn reference_decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> T {
    ciborium::from_reader(bytes).unwrap()
}

#[derive(Debug, PartialEq, Serialize, Deserialize, CborEncode, CborDecode)]
struct Reading {
    sensor: String,
    value: i64,
    tags: Vec<String>,
    raw: Option<u32>,
}

fn sample() -> Reading {
    Reading {
        sensor: "t1".into(),
        value: -40,
        tags: vec!["a".into(), "bb".into()],
        raw: None,
    }
}

#[test]
fn integers_match_reference() {
    for v in [
        0i64,
        1,
        23,
        24,
        255,
        256,
        65_535,
        65_536,
        u32::MAX.into(),
        i64::MAX,
        -1,
        -24,
        -25,
        -256,
        -257,
        i64::MIN,
    ] {
        assert_eq!(encode_to_vec(&v).unwrap(), reference(&v), "value {v}");
    }
    assert_eq!(encode_to_vec(&u64::MAX).unwrap(), reference(&u64::MAX));
}

#[test]
fn strings_and_collections_match_reference() {
    assert_eq!(encode_to_vec("").unwrap(), reference(&""));
    assert_eq!(encode_to_vec("IETF").unwrap(), reference(&"IETF"));
    let long = "x".repeat(300);
    assert_eq!(encode_to_vec(&long).unwrap(), reference(&long));

    let list = vec![1u8, 2, 3];
    // A Vec<u8> is a byte string here; the reference writes a sequence of integers.
    assert_eq!(encode_to_vec(&list).unwrap(), hex!("43 01 02 03"));
    assert_eq!(reference(&list), hex!("83 01 02 03"));

    let words = vec!["a".to_string(), "b".to_string()];
    assert_eq!(encode_to_vec(&words).unwrap(), reference(&words));

    let mut map = BTreeMap::new();
    map.insert("a".to_string(), 1u32);
    map.insert("b".to_string(), 2u32);
    assert_eq!(encode_to_vec(&map).unwrap(), reference(&map));

    assert_eq!(encode_to_vec(&true).unwrap(), reference(&true));
    assert_eq!(encode_to_vec(&Option::<u8>::None).unwrap(), reference(&Option::<u8>::None));
}

#[test]
fn keyed_records_match_reference_structs() {
    let value = sample();
    let ours = encode_to_vec_with(&value, Config::keyed()).unwrap();
    assert_eq!(ours, reference(&value));
    assert_eq!(reference_decode::<Reading>(&ours), value);
}

#[test]
fn positional_records_decode_reference_maps() {
    let bytes = reference(&sample());
    assert_eq!(decode::<Reading>(&bytes).unwrap(), sample());
}

#[test]
fn reference_reads_our_floats() {
    for v in [0.0f64, -0.0, 1.5, -1.0, f64::MAX, f64::MIN_POSITIVE, f64::INFINITY] {
        let ours = encode_to_vec(&v).unwrap();
        let back: f64 = reference_decode(&ours);
        assert_eq!(back.to_bits(), v.to_bits());
    }
    let ours = encode_to_vec(&f64::NAN).unwrap();
    assert!(reference_decode::<f64>(&ours).is_nan());

    let ours = encode_to_vec(&3.25f32).unwrap();
    assert_eq!(ours, hex!("fa 40 50 00 00"));
    assert_eq!(reference_decode::<f32>(&ours), 3.25);
}

#[test]
fn we_read_reference_short_floats() {
    // The reference narrows floats to the shortest exact width, including half precision.
    for v in [0.0f64, 1.0, 1.5, 65_504.0, 100_000.0, 1.1, f64::INFINITY] {
        let theirs = reference(&v);
        let back: f64 = decode(&theirs).unwrap();
        assert_eq!(back.to_bits(), v.to_bits(), "value {v}");
    }
}

#[test]
fn reference_reads_our_structures() {
    let mut map = BTreeMap::new();
    map.insert(7u64, vec!["x".to_string()]);
    map.insert(1u64, Vec::new());
    let ours = encode_to_vec(&map).unwrap();
    assert_eq!(reference_decode::<BTreeMap<u64, Vec<String>>>(&ours), map);

    let tuple = (1u8, "two".to_string(), false);
    let ours = encode_to_vec(&tuple).unwrap();
    assert_eq!(ours, reference(&tuple));
}

#[test]
fn rfc8949_appendix_a_vectors() {
    assert_eq!(decode::<u64>(&hex!("1b 00 00 00 e8 d4 a5 10 00")).unwrap(), 1_000_000_000_000);
    assert_eq!(decode::<i128>(&hex!("3b ff ff ff ff ff ff ff ff")).unwrap(), -18_446_744_073_709_551_616);
    assert_eq!(decode::<f64>(&hex!("fb 3f f1 99 99 99 99 99 9a")).unwrap(), 1.1);
    assert_eq!(decode::<f64>(&hex!("fa 47 c3 50 00")).unwrap(), 100_000.0);
    assert_eq!(decode::<f64>(&hex!("f9 c4 00")).unwrap(), -4.0);
    assert_eq!(decode::<String>(&hex!("62 c3 bc")).unwrap(), "\u{fc}");
    assert!(decode::<Vec<u32>>(&hex!("9f 01 82 02 03 9f 04 05 ff ff")).is_err());
    assert_eq!(decode::<Vec<u32>>(&hex!("9f 01 02 03 ff")).unwrap(), vec![1, 2, 3]);
    assert_eq!(
        decode::<String>(&hex!("7f 65 73 74 72 65 61 64 6d 69 6e 67 ff")).unwrap(),
        "streaming"
    );
    assert_eq!(
        decode::<Vec<u8>>(&hex!("5f 42 01 02 43 03 04 05 ff")).unwrap(),
        vec![1, 2, 3, 4, 5]
    );
}
