use std::collections::{BTreeMap, HashMap};

use cbor_compat::{
    decode, decode_with, encode_to_vec, encode_to_vec_with, CborDecode, CborEncode, Config,
    ErrorCode, ErrorDetail,
};

#[derive(Debug, Clone, PartialEq, CborEncode, CborDecode)]
struct Prop {
    prop: i32,
}

#[derive(Debug, Clone, PartialEq, CborEncode, CborDecode)]
struct IntValue {
    #[cbor(rename = "intV")]
    int_v: i64,
}

#[derive(Debug, Clone, PartialEq, CborEncode, CborDecode)]
struct Other {
    data: String,
}

#[derive(Debug, Clone, PartialEq, CborEncode, CborDecode)]
struct Nested<T> {
    boxed: Vec<T>,
    #[cbor(rename = "otherClass")]
    other_class: Other,
    primitive: i32,
    map: BTreeMap<String, IntValue>,
}

fn roundtrip<T>(value: &T, config: Config) -> T
where
    T: CborEncode + for<'de> CborDecode<'de>,
{
    let bytes = encode_to_vec_with(value, config).unwrap();
    decode_with(&bytes, config).unwrap()
}

#[test]
fn single_field_record() {
    let value = Prop { prop: 0 };
    let bytes = encode_to_vec(&value).unwrap();
    assert_eq!(bytes, [0x81, 0x00]);
    assert_eq!(decode::<Prop>(&bytes).unwrap(), value);

    let keyed = encode_to_vec_with(&value, Config::keyed()).unwrap();
    assert_eq!(keyed, [0xa1, 0x64, b'p', b'r', b'o', b'p', 0x00]);
    assert_eq!(decode::<Prop>(&keyed).unwrap(), value);
}

#[test]
fn list_of_records_keeps_order() {
    let list = vec![Prop { prop: 1 }, Prop { prop: 2 }, Prop { prop: 3 }];
    let bytes = encode_to_vec(&list).unwrap();
    assert_eq!(bytes, [0x83, 0x81, 0x01, 0x81, 0x02, 0x81, 0x03]);
    assert_eq!(decode::<Vec<Prop>>(&bytes).unwrap(), list);
    assert_eq!(roundtrip(&list, Config::keyed()), list);
}

#[test]
fn f64_edge_cases_are_bit_exact() {
    let cases = [
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::MAX,
        f64::MIN_POSITIVE,
        0.0,
        -0.0,
        -1.0,
    ];
    for v in cases {
        let bytes = encode_to_vec(&v).unwrap();
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[0], 0xfb);
        assert_eq!(&bytes[1..], &v.to_bits().to_be_bytes());
        let back: f64 = decode(&bytes).unwrap();
        assert_eq!(back.to_bits(), v.to_bits(), "value {v}");
    }
}

#[test]
fn f32_edge_cases_are_bit_exact() {
    let cases = [
        f32::NAN,
        f32::INFINITY,
        f32::NEG_INFINITY,
        f32::MAX,
        f32::MIN_POSITIVE,
        0.0,
        -0.0,
        -1.0,
    ];
    for v in cases {
        let bytes = encode_to_vec(&v).unwrap();
        assert_eq!(bytes.len(), 5);
        assert_eq!(bytes[0], 0xfa);
        let back: f32 = decode(&bytes).unwrap();
        assert_eq!(back.to_bits(), v.to_bits(), "value {v}");
    }
}

#[test]
fn half_precision_input_widens() {
    // smallest positive subnormal, negative zero, one, infinity
    assert_eq!(decode::<f64>(&[0xf9, 0x00, 0x01]).unwrap(), 2f64.powi(-24));
    assert_eq!(
        decode::<f64>(&[0xf9, 0x80, 0x00]).unwrap().to_bits(),
        (-0.0f64).to_bits()
    );
    assert_eq!(decode::<f32>(&[0xf9, 0x3c, 0x00]).unwrap(), 1.0);
    assert_eq!(decode::<f32>(&[0xf9, 0x7c, 0x00]).unwrap(), f32::INFINITY);
    assert!(decode::<f64>(&[0xf9, 0x7e, 0x00]).unwrap().is_nan());
}

#[test]
fn nested_generic_record() {
    let mut map = BTreeMap::new();
    map.insert("40".to_string(), IntValue { int_v: 40 });
    map.insert("50".to_string(), IntValue { int_v: 50 });
    let value = Nested {
        boxed: vec![10i64],
        other_class: Other {
            data: "20".to_string(),
        },
        primitive: 30,
        map,
    };
    assert_eq!(roundtrip(&value, Config::new()), value);
    assert_eq!(roundtrip(&value, Config::keyed()), value);

    let keyed = encode_to_vec_with(&value, Config::keyed()).unwrap();
    let dynamic = cbor_compat::decode_value(&keyed, Config::new()).unwrap();
    assert_eq!(
        dynamic.get("otherClass").and_then(|o| o.get("data")).and_then(|d| d.as_str()),
        Some("20")
    );
    assert_eq!(
        dynamic.get("map").and_then(|m| m.get("50")).and_then(|v| v.get("intV")),
        Some(&cbor_compat::Value::Unsigned(50))
    );
}

#[test]
fn truncated_array_is_truncated_structure() {
    let err = decode::<Vec<i64>>(&[0x83, 0x01]).unwrap_err();
    assert_eq!(err.code, ErrorCode::TruncatedStructure);
    assert_eq!(err.offset, 2);
    assert_eq!(
        err.detail,
        ErrorDetail::Length {
            declared: 3,
            actual: 1
        }
    );
}

#[test]
fn truncated_inside_item_is_unexpected_end() {
    let err = decode::<Vec<i64>>(&[0x82, 0x01, 0x19, 0x01]).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedEndOfInput);

    let err = decode::<String>(&[0x63, b'a']).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedEndOfInput);

    let err = decode::<u8>(&[]).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedEndOfInput);
}

#[test]
fn map_order_does_not_matter() {
    let a = [0xa2, 0x0a, 0x0a, 0x14, 0x14];
    let b = [0xa2, 0x14, 0x14, 0x0a, 0x0a];
    let ma: HashMap<u32, u32> = decode(&a).unwrap();
    let mb: HashMap<u32, u32> = decode(&b).unwrap();
    assert_eq!(ma, mb);

    let va = cbor_compat::decode_value(&a, Config::new()).unwrap();
    let vb = cbor_compat::decode_value(&b, Config::new()).unwrap();
    assert_eq!(va, vb);
}

#[test]
fn empty_collections() {
    let empty_map: BTreeMap<String, i64> = BTreeMap::new();
    let bytes = encode_to_vec(&empty_map).unwrap();
    assert_eq!(bytes, [0xa0]);
    assert_eq!(decode::<BTreeMap<String, i64>>(&bytes).unwrap(), empty_map);

    let empty_vec: Vec<String> = Vec::new();
    let bytes = encode_to_vec(&empty_vec).unwrap();
    assert_eq!(bytes, [0x80]);
    assert_eq!(decode::<Vec<String>>(&bytes).unwrap(), empty_vec);
}

#[test]
fn large_collections_roundtrip_with_default_limits() {
    let list: Vec<u32> = (0..70_000).collect();
    let bytes = encode_to_vec(&list).unwrap();
    assert_eq!(bytes[..5], [0x9a, 0x00, 0x01, 0x11, 0x70]);
    assert_eq!(decode::<Vec<u32>>(&bytes).unwrap(), list);

    let map: BTreeMap<u32, bool> = (0..70_000).map(|i| (i, i % 3 == 0)).collect();
    let bytes = encode_to_vec(&map).unwrap();
    assert_eq!(bytes[..5], [0xba, 0x00, 0x01, 0x11, 0x70]);
    assert_eq!(decode::<BTreeMap<u32, bool>>(&bytes).unwrap(), map);

    let value = cbor_compat::decode_value(&bytes, Config::new()).unwrap();
    assert_eq!(value.as_map().map(<[_]>::len), Some(70_000));
}
