use std::borrow::Cow;

use cbor_compat::{
    decode, decode_shaped, encode_shaped, encode_to_vec, encode_to_vec_with, CborDecode,
    CborEncode, CborShape, Config, ErrorCode, RecordDescriptor, RecordEncoding, Shape,
};
use hex_literal::hex;

#[derive(Debug, PartialEq, CborEncode, CborDecode, CborShape)]
struct User {
    id: u32,
    #[cbor(rename = "displayName")]
    name: String,
    email: Option<String>,
    #[cbor(default)]
    score: i16,
    #[cbor(skip)]
    cached: bool,
}

#[derive(Debug, PartialEq, CborEncode, CborDecode, CborShape)]
#[cbor(keyed)]
struct AlwaysKeyed {
    a: u8,
}

#[derive(Debug, PartialEq, CborEncode, CborDecode, CborShape)]
#[cbor(positional)]
struct AlwaysPositional {
    a: u8,
}

#[derive(Debug, PartialEq, CborEncode, CborDecode, CborShape)]
struct Meters(f64);

#[derive(Debug, PartialEq, CborEncode, CborDecode)]
struct Pair(u8, String);

#[derive(Debug, PartialEq, CborEncode, CborDecode, CborShape)]
struct Marker;

#[derive(Debug, PartialEq, CborEncode, CborDecode, CborShape)]
struct Borrowed<'a> {
    name: Cow<'a, str>,
    raw: Cow<'a, [u8]>,
}

#[derive(Debug, PartialEq, CborEncode, CborDecode)]
struct Tree {
    label: String,
    children: Vec<Tree>,
}

fn user() -> User {
    User {
        id: 7,
        name: "ana".into(),
        email: None,
        score: -3,
        cached: false,
    }
}

#[test]
fn positional_layout_bytes() {
    let bytes = encode_to_vec(&user()).unwrap();
    assert_eq!(bytes, hex!("84 07 63 61 6e 61 f6 22"));
    assert_eq!(decode::<User>(&bytes).unwrap(), user());
}

#[test]
fn keyed_layout_uses_renamed_keys() {
    let bytes = encode_to_vec_with(&user(), Config::keyed()).unwrap();
    let v = cbor_compat::decode_value(&bytes, Config::new()).unwrap();
    assert_eq!(v.get("displayName").and_then(|n| n.as_str()), Some("ana"));
    assert!(v.get("name").is_none());
    assert!(v.get("cached").is_none());
    assert_eq!(decode::<User>(&bytes).unwrap(), user());
}

#[test]
fn skipped_fields_come_back_default() {
    let mut u = user();
    u.cached = true;
    let back: User = decode(&encode_to_vec(&u).unwrap()).unwrap();
    assert!(!back.cached);
}

#[test]
fn short_positional_array_fills_defaults() {
    // id and name only: email and score are defaultable.
    let back: User = decode(&hex!("82 01 61 62")).unwrap();
    assert_eq!(back.email, None);
    assert_eq!(back.score, 0);

    let err = decode::<User>(&hex!("81 01")).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingField);
    assert_eq!(err.offset, 0);
}

#[test]
fn surplus_positional_elements_are_skipped() {
    let back: User = decode(&hex!("86 01 61 62 f6 02 82 01 02 a0")).unwrap();
    assert_eq!(back.id, 1);
    assert_eq!(back.score, 2);
}

#[test]
fn keyed_input_in_any_order_with_unknown_keys() {
    let bytes = hex!("a3 65 65 78 74 72 61 01 6b 64 69 73 70 6c 61 79 4e 61 6d 65 61 7a 62 69 64 09");
    let back: User = decode(&bytes).unwrap();
    assert_eq!(back.id, 9);
    assert_eq!(back.name, "z");

    let err = decode::<User>(&hex!("a1 62 69 64 01")).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingField);

    let err = decode::<AlwaysPositional>(&hex!("a2 61 61 01 61 61 02")).unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateMapKey);
}

#[test]
fn struct_attribute_pins_layout() {
    let v = AlwaysKeyed { a: 1 };
    assert_eq!(encode_to_vec(&v).unwrap(), hex!("a1 61 61 01"));
    let v = AlwaysPositional { a: 1 };
    assert_eq!(encode_to_vec_with(&v, Config::keyed()).unwrap(), hex!("81 01"));
}

#[test]
fn tuple_and_unit_structs() {
    assert_eq!(encode_to_vec(&Meters(1.0)).unwrap(), hex!("fb 3f f0 00 00 00 00 00 00"));
    assert_eq!(decode::<Meters>(&hex!("f9 3c 00")).unwrap(), Meters(1.0));

    let pair = Pair(1, "x".into());
    let bytes = encode_to_vec(&pair).unwrap();
    assert_eq!(bytes, hex!("82 01 61 78"));
    assert_eq!(decode::<Pair>(&bytes).unwrap(), pair);
    let err = decode::<Pair>(&hex!("83 01 61 78 00")).unwrap_err();
    assert_eq!(err.code, ErrorCode::LengthMismatch);

    assert_eq!(encode_to_vec(&Marker).unwrap(), [0xf6]);
    assert_eq!(decode::<Marker>(&[0xf6]).unwrap(), Marker);
}

#[test]
fn borrowed_fields_point_into_input() {
    let bytes = hex!("82 62 68 69 42 00 01");
    let back: Borrowed<'_> = decode(&bytes).unwrap();
    assert!(matches!(back.name, Cow::Borrowed("hi")));
    assert!(matches!(back.raw, Cow::Borrowed(&[0, 1])));
    assert_eq!(encode_to_vec(&back).unwrap(), bytes);
}

#[test]
fn recursive_records() {
    let tree = Tree {
        label: "root".into(),
        children: vec![Tree {
            label: "leaf".into(),
            children: Vec::new(),
        }],
    };
    let bytes = encode_to_vec(&tree).unwrap();
    assert_eq!(decode::<Tree>(&bytes).unwrap(), tree);
    let keyed = encode_to_vec_with(&tree, Config::keyed()).unwrap();
    assert_eq!(decode::<Tree>(&keyed).unwrap(), tree);
}

#[test]
fn derived_shapes() {
    let expected = Shape::Record(
        RecordDescriptor::new("User")
            .field("id", Shape::UInt)
            .field("displayName", Shape::Text)
            .field("email", Shape::optional(Shape::Text))
            .field("score", Shape::Int),
    );
    assert_eq!(User::shape(), expected);
    assert_eq!(Meters::shape(), Shape::Float64);
    assert_eq!(Marker::shape(), Shape::Null);

    let keyed = RecordDescriptor::new("AlwaysKeyed")
        .field("a", Shape::UInt)
        .layout(RecordEncoding::Keyed);
    assert_eq!(AlwaysKeyed::shape(), Shape::Record(keyed));
}

#[derive(Debug, PartialEq, CborEncode, CborDecode, CborShape)]
struct Wide {
    low: i128,
    high: u128,
}

#[test]
fn wide_and_borrowed_fields_have_shapes() {
    let expected = RecordDescriptor::new("Wide")
        .field("low", Shape::Int)
        .field("high", Shape::UInt);
    assert_eq!(Wide::shape(), Shape::Record(expected));

    let expected = RecordDescriptor::new("Borrowed")
        .field("name", Shape::Text)
        .field("raw", Shape::Bytes);
    assert_eq!(Borrowed::shape(), Shape::Record(expected));

    let wide = Wide {
        low: -(1i128 << 64),
        high: u128::from(u64::MAX),
    };
    let typed = encode_to_vec(&wide).unwrap();
    let dynamic = decode_shaped(&typed, &Wide::shape(), Config::new()).unwrap();
    assert_eq!(encode_shaped(&dynamic, &Wide::shape(), Config::new()).unwrap(), typed);
    assert_eq!(decode::<Wide>(&typed).unwrap(), wide);
}

#[test]
fn pinned_layout_carries_into_shapes() {
    for config in [Config::new(), Config::keyed()] {
        let typed = encode_to_vec_with(&AlwaysKeyed { a: 1 }, config).unwrap();
        let dynamic = decode_shaped(&typed, &AlwaysKeyed::shape(), config).unwrap();
        let shaped = encode_shaped(&dynamic, &AlwaysKeyed::shape(), config).unwrap();
        assert_eq!(shaped, hex!("a1 61 61 01"));
        assert_eq!(shaped, typed);

        let typed = encode_to_vec_with(&AlwaysPositional { a: 1 }, config).unwrap();
        let dynamic = decode_shaped(&typed, &AlwaysPositional::shape(), config).unwrap();
        let shaped = encode_shaped(&dynamic, &AlwaysPositional::shape(), config).unwrap();
        assert_eq!(shaped, hex!("81 01"));
        assert_eq!(shaped, typed);
    }
}
