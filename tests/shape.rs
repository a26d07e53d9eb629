use cbor_compat::{
    decode_shaped, encode_shaped, encode_to_vec_with, CborEncode, CborShape, Config, ErrorCode,
    RecordDescriptor, Shape, Value,
};
use hex_literal::hex;

fn person_shape() -> Shape {
    Shape::Record(
        RecordDescriptor::new("Person")
            .field("name", Shape::Text)
            .field("age", Shape::UInt)
            .field("nick", Shape::optional(Shape::Text))
            .field("scores", Shape::list(Shape::Float32)),
    )
}

fn person() -> Value {
    Value::Map(vec![
        (Value::text("name"), Value::text("bo")),
        (Value::text("age"), Value::Unsigned(41)),
        (Value::text("scores"), Value::Array(vec![Value::Float32(1.5)])),
    ])
}

#[test]
fn record_positional_fills_missing_optionals() {
    let bytes = encode_shaped(&person(), &person_shape(), Config::new()).unwrap();
    assert_eq!(bytes, hex!("84 62 62 6f 18 29 f6 81 fa 3f c0 00 00"));

    let back = decode_shaped(&bytes, &person_shape(), Config::new()).unwrap();
    assert_eq!(back.get("nick"), Some(&Value::Null));
    assert_eq!(back.get("age"), Some(&Value::Unsigned(41)));
}

#[test]
fn record_keyed_layout() {
    let bytes = encode_shaped(&person(), &person_shape(), Config::keyed()).unwrap();
    let generic = cbor_compat::decode_value(&bytes, Config::new()).unwrap();
    assert_eq!(generic.get("name").and_then(Value::as_str), Some("bo"));

    // Keys may come in any order and unknown keys are ignored.
    let reordered =
        hex!("a4 66 73 63 6f 72 65 73 80 63 61 67 65 05 63 7a 7a 7a f5 64 6e 61 6d 65 61 78");
    let back = decode_shaped(&reordered, &person_shape(), Config::new()).unwrap();
    assert_eq!(back.get("name").and_then(Value::as_str), Some("x"));
    assert_eq!(back.get("nick"), Some(&Value::Null));
    assert_eq!(back.get("scores"), Some(&Value::Array(Vec::new())));
    assert_eq!(back.get("zzz"), None);
}

#[test]
fn missing_required_field() {
    let value = Value::Map(vec![(Value::text("name"), Value::text("bo"))]);
    let err = encode_shaped(&value, &person_shape(), Config::new()).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingField);
}

#[test]
fn decoding_short_record_reports_missing_field() {
    let err = decode_shaped(&hex!("81 61 61"), &person_shape(), Config::new()).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingField);
}

#[test]
fn shape_mismatches() {
    let err = encode_shaped(&Value::text("x"), &Shape::UInt, Config::new()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TypeMismatch);

    let err = encode_shaped(&Value::Negative(0), &Shape::UInt, Config::new()).unwrap_err();
    assert_eq!(err.code, ErrorCode::ValueOutOfRange);

    let err = encode_shaped(&Value::Float64(1.1), &Shape::Float32, Config::new()).unwrap_err();
    assert_eq!(err.code, ErrorCode::ValueOutOfRange);

    let err = decode_shaped(&hex!("61 61"), &Shape::Bool, Config::new()).unwrap_err();
    assert_eq!(err.code, ErrorCode::TypeMismatch);
}

#[test]
fn floats_follow_shape_width() {
    let bytes = encode_shaped(&Value::Float32(2.0), &Shape::Float64, Config::new()).unwrap();
    assert_eq!(bytes, hex!("fb 40 00 00 00 00 00 00 00"));
    let bytes = encode_shaped(&Value::Float64(2.0), &Shape::Float32, Config::new()).unwrap();
    assert_eq!(bytes, hex!("fa 40 00 00 00"));

    let v = decode_shaped(&hex!("f9 3e 00"), &Shape::Float32, Config::new()).unwrap();
    assert_eq!(v, Value::Float32(1.5));
}

#[test]
fn maps_and_any() {
    let shape = Shape::map(Shape::Text, Shape::Any);
    let value = Value::Map(vec![
        (Value::text("a"), Value::Array(vec![Value::Null])),
        (Value::text("b"), Value::Negative(4)),
    ]);
    let bytes = encode_shaped(&value, &shape, Config::new()).unwrap();
    assert_eq!(bytes, hex!("a2 61 61 81 f6 61 62 24"));
    assert_eq!(decode_shaped(&bytes, &shape, Config::new()).unwrap(), value);
}

#[derive(Debug, PartialEq, CborEncode, CborShape)]
struct Item {
    sku: String,
    qty: u16,
    price: f64,
    note: Option<String>,
}

#[test]
fn derived_shape_agrees_with_derived_encoding() {
    let item = Item {
        sku: "A-1".into(),
        qty: 3,
        price: 9.5,
        note: None,
    };
    for config in [Config::new(), Config::keyed()] {
        let typed = encode_to_vec_with(&item, config).unwrap();
        let dynamic = decode_shaped(&typed, &Item::shape(), config).unwrap();
        let reencoded = encode_shaped(&dynamic, &Item::shape(), config).unwrap();
        assert_eq!(reencoded, typed);
    }
}
