#![cfg(feature = "serde")]

use std::collections::BTreeMap;

use cbor_compat::{from_slice, from_slice_with, to_vec, to_vec_with, Config, ErrorCode, Value};
use hex_literal::hex;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Account {
    id: u64,
    owner: String,
    balance: f64,
    #[serde(default)]
    tags: Vec<String>,
    parent: Option<Box<Account>>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
enum Event {
    Opened,
    Deposit(u32),
    Move(i8, i8),
    Rename { from: String, to: String },
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Borrowing<'a> {
    #[serde(borrow)]
    name: &'a str,
    #[serde(with = "serde_bytes_compat")]
    raw: Vec<u8>,
}

mod serde_bytes_compat {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        struct Visit;
        impl<'de> serde::de::Visitor<'de> for Visit {
            type Value = Vec<u8>;
            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("bytes")
            }
            fn visit_bytes<E>(self, v: &[u8]) -> Result<Vec<u8>, E> {
                Ok(v.to_vec())
            }
            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
                Ok(v)
            }
        }
        d.deserialize_bytes(Visit)
    }
}

fn account() -> Account {
    Account {
        id: 3,
        owner: "kim".into(),
        balance: 12.5,
        tags: vec!["vip".into()],
        parent: Some(Box::new(Account {
            id: 1,
            owner: "root".into(),
            balance: 0.0,
            tags: Vec::new(),
            parent: None,
        })),
    }
}

fn reference<T: Serialize>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).unwrap();
    out
}

#[test]
fn structs_default_to_positional() {
    let leaf = Account {
        id: 1,
        owner: "a".into(),
        balance: 1.0,
        tags: Vec::new(),
        parent: None,
    };
    let bytes = to_vec(&leaf).unwrap();
    assert_eq!(bytes, hex!("85 01 61 61 fb 3f f0 00 00 00 00 00 00 80 f6"));
    assert_eq!(from_slice::<Account>(&bytes).unwrap(), leaf);
}

#[test]
fn nested_structs_roundtrip_in_both_layouts() {
    for config in [Config::new(), Config::keyed()] {
        let bytes = to_vec_with(&account(), config).unwrap();
        assert_eq!(from_slice::<Account>(&bytes).unwrap(), account());
    }
}

#[test]
fn keyed_layout_reads_reference_output() {
    // The reference narrows floats; both widths decode to the same value.
    let theirs = reference(&account());
    assert_eq!(from_slice::<Account>(&theirs).unwrap(), account());

    let ours = to_vec_with(&account(), Config::keyed()).unwrap();
    let back: Account = ciborium::from_reader(ours.as_slice()).unwrap();
    assert_eq!(back, account());
}

#[test]
fn enum_variants() {
    assert_eq!(to_vec(&Event::Opened).unwrap(), hex!("66 4f 70 65 6e 65 64"));
    assert_eq!(
        to_vec(&Event::Deposit(5)).unwrap(),
        hex!("a1 67 44 65 70 6f 73 69 74 05")
    );
    assert_eq!(to_vec(&Event::Move(1, -1)).unwrap(), hex!("a1 64 4d 6f 76 65 82 01 20"));

    let events = vec![
        Event::Opened,
        Event::Deposit(5),
        Event::Move(-3, 4),
        Event::Rename {
            from: "a".into(),
            to: "b".into(),
        },
    ];
    for config in [Config::new(), Config::keyed()] {
        let bytes = to_vec_with(&events, config).unwrap();
        assert_eq!(from_slice::<Vec<Event>>(&bytes).unwrap(), events);
    }
    let bytes = to_vec_with(&events, Config::keyed()).unwrap();
    assert_eq!(bytes, reference(&events));
}

#[test]
fn unknown_variant_is_a_serde_error() {
    let err = from_slice::<Event>(&hex!("63 6e 6f 70")).unwrap_err();
    assert_eq!(err.code, ErrorCode::Serde);
}

#[test]
fn borrowed_strings_and_bytes() {
    let value = Borrowing {
        name: "hello",
        raw: vec![0xde, 0xad],
    };
    let bytes = to_vec_with(&value, Config::keyed()).unwrap();
    let back: Borrowing<'_> = from_slice(&bytes).unwrap();
    assert_eq!(back, value);
    assert_eq!(bytes, reference(&value));
}

#[test]
fn collections_and_tuples() {
    let mut map = BTreeMap::new();
    map.insert("x".to_string(), vec![1u16, 500]);
    map.insert("y".to_string(), Vec::new());
    let bytes = to_vec(&map).unwrap();
    assert_eq!(bytes, reference(&map));
    assert_eq!(from_slice::<BTreeMap<String, Vec<u16>>>(&bytes).unwrap(), map);

    let tuple = (1u8, 'c', Some(-7i64), ());
    let bytes = to_vec(&tuple).unwrap();
    assert_eq!(bytes, hex!("84 01 61 63 26 f6"));
    assert_eq!(from_slice::<(u8, char, Option<i64>, ())>(&bytes).unwrap(), tuple);
}

#[test]
fn integer_targets_are_range_checked() {
    let err = from_slice::<u8>(&hex!("19 01 00")).unwrap_err();
    assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    assert_eq!(from_slice::<i128>(&hex!("3b ff ff ff ff ff ff ff ff")).unwrap(), -(1i128 << 64));
}

#[test]
fn missing_struct_field_is_reported() {
    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Need {
        a: u8,
        b: u8,
    }
    let err = from_slice::<Need>(&hex!("a1 61 61 01")).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingField);
    assert_eq!(err.offset, 4);
}

#[test]
fn trailing_bytes_follow_config() {
    assert_eq!(from_slice::<u8>(&hex!("01 02")).unwrap(), 1);
    let err = from_slice_with::<u8>(&hex!("01 02"), Config::new().deny_trailing_bytes()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TrailingBytes);
}

#[test]
fn dynamic_value_through_serde() {
    let value = Value::Map(vec![
        (Value::text("n"), Value::Negative(9)),
        (Value::text("f"), Value::Float32(0.5)),
        (Value::text("b"), Value::Bytes(vec![1])),
        (Value::text("l"), Value::Array(vec![Value::Null, Value::Bool(true)])),
    ]);
    let bytes = to_vec(&value).unwrap();
    assert_eq!(bytes, value.encode_to_vec().unwrap());
    assert_eq!(from_slice::<Value>(&bytes).unwrap(), value);
}
