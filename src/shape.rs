//! Runtime type descriptors and shape-driven encode/decode.
//!
//! A [`Shape`] describes a value's type without a Rust type to drive the codec, which lets a
//! caller walk arbitrary object graphs known only at run time. Records are represented as
//! [`Value::Map`]s keyed by field name.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::codec::{log_failure, CborArrayElem, CborDecode};
use crate::config::{Config, RecordEncoding};
use crate::decode::{narrow_f64, Decoder};
use crate::encode::Encoder;
use crate::value::Value;
use crate::wire::CborKind;
use crate::{CborError, ErrorCode};

/// Closed set of value shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Always `null`.
    Null,
    /// Boolean.
    Bool,
    /// Signed integer (either major type 0 or 1).
    Int,
    /// Non-negative integer.
    UInt,
    /// Single precision float, written as 4 bytes.
    Float32,
    /// Double precision float, written as 8 bytes.
    Float64,
    /// Text string.
    Text,
    /// Byte string.
    Bytes,
    /// `null` or the inner shape.
    Optional(Box<Shape>),
    /// Homogeneous array.
    List(Box<Shape>),
    /// Map with uniform key and value shapes.
    Map(Box<Shape>, Box<Shape>),
    /// Record with named fields.
    Record(RecordDescriptor),
    /// Any data item, handled as a dynamic [`Value`].
    Any,
}

impl Shape {
    /// `Optional(inner)`.
    #[must_use]
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// `List(item)`.
    #[must_use]
    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    /// `Map(key, value)`.
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    const fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_) | Self::Null | Self::Any)
    }
}

/// One field of a [`RecordDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, used as the key in the keyed layout.
    pub name: Cow<'static, str>,
    /// Field shape.
    pub shape: Shape,
}

/// Ordered field names and shapes of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    /// Record type name, for diagnostics.
    pub name: Cow<'static, str>,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Layout pinned for this record. `None` follows the encoder's configuration.
    pub layout: Option<RecordEncoding>,
}

impl RecordDescriptor {
    /// An empty record descriptor.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            layout: None,
        }
    }

    /// Pin the wire layout, ignoring the configured one on encode.
    #[must_use]
    pub fn layout(mut self, layout: RecordEncoding) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Append a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<Cow<'static, str>>, shape: Shape) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            shape,
        });
        self
    }

    /// Position of the field called `name`.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Types that can describe their own [`Shape`]. Derivable for structs.
///
/// Implemented for the scalar types, `String`, `Cow<str>`, `Vec<u8>`, `Cow<[u8]>`, [`Value`],
/// `Option`, `Box`, `Vec` and the map types. Tuples have no shape since [`Shape::List`] is
/// homogeneous; wrap them in a struct to describe them.
pub trait CborShape {
    /// The shape of `Self`.
    fn shape() -> Shape;
}

macro_rules! leaf_shapes {
    ($($t:ty => $shape:expr),* $(,)?) => {$(
        impl CborShape for $t {
            fn shape() -> Shape {
                $shape
            }
        }
    )*};
}

leaf_shapes! {
    () => Shape::Null,
    bool => Shape::Bool,
    i8 => Shape::Int,
    i16 => Shape::Int,
    i32 => Shape::Int,
    i64 => Shape::Int,
    i128 => Shape::Int,
    isize => Shape::Int,
    u8 => Shape::UInt,
    u16 => Shape::UInt,
    u32 => Shape::UInt,
    u64 => Shape::UInt,
    u128 => Shape::UInt,
    usize => Shape::UInt,
    f32 => Shape::Float32,
    f64 => Shape::Float64,
    String => Shape::Text,
    Cow<'_, str> => Shape::Text,
    Vec<u8> => Shape::Bytes,
    Cow<'_, [u8]> => Shape::Bytes,
    Value => Shape::Any,
}

impl<T: CborShape> CborShape for Option<T> {
    fn shape() -> Shape {
        Shape::optional(T::shape())
    }
}

impl<T: CborShape> CborShape for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }
}

impl<T: CborShape + CborArrayElem> CborShape for Vec<T> {
    fn shape() -> Shape {
        Shape::list(T::shape())
    }
}

impl<K: CborShape, V: CborShape> CborShape for BTreeMap<K, V> {
    fn shape() -> Shape {
        Shape::map(K::shape(), V::shape())
    }
}

#[cfg(feature = "std")]
impl<K: CborShape, V: CborShape, S> CborShape for std::collections::HashMap<K, V, S> {
    fn shape() -> Shape {
        Shape::map(K::shape(), V::shape())
    }
}

fn mismatch(expected: CborKind, value: &Value, enc: &Encoder) -> CborError {
    CborError::type_mismatch(expected, value.major_type(), enc.len())
}

static NULL: Value = Value::Null;

/// Encode `value` as described by `shape`.
///
/// Records are taken from a [`Value::Map`] keyed by field name and written in the configured
/// layout. Missing optional fields are written as `null`.
///
/// # Errors
///
/// Returns `TypeMismatch` if `value` does not fit `shape`, `MissingField` for an absent
/// required record field, or `ValueOutOfRange` for numbers that do not fit.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
pub fn encode_shaped(value: &Value, shape: &Shape, config: Config) -> Result<Vec<u8>, CborError> {
    let mut enc = Encoder::with_config(config);
    log_failure(write_shaped(&mut enc, value, shape).and_then(|()| enc.finish()))
}

/// Decode one item as described by `shape`.
///
/// # Errors
///
/// Returns any decode error, `MissingField` for an absent required record field, or
/// `TrailingBytes` if the configuration denies them.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(len = bytes.len())))]
pub fn decode_shaped(bytes: &[u8], shape: &Shape, config: Config) -> Result<Value, CborError> {
    let mut dec = Decoder::with_config(bytes, &config)?;
    let res = read_shaped(&mut dec, shape)
        .and_then(|value| dec.finish(config.deny_trailing_bytes).map(|()| value));
    log_failure(res)
}

fn write_shaped(enc: &mut Encoder, value: &Value, shape: &Shape) -> Result<(), CborError> {
    match (shape, value) {
        (Shape::Any, v) => enc.value(v),
        (Shape::Null, Value::Null) => enc.null(),
        (Shape::Null, v) => Err(mismatch(CborKind::Null, v, enc)),
        (Shape::Bool, Value::Bool(b)) => enc.bool(*b),
        (Shape::Bool, v) => Err(mismatch(CborKind::Bool, v, enc)),
        (Shape::Int | Shape::UInt, Value::Unsigned(u)) => enc.unsigned(*u),
        (Shape::Int, Value::Negative(_)) => enc.value(value),
        (Shape::UInt, Value::Negative(_)) => {
            Err(CborError::new(ErrorCode::ValueOutOfRange, enc.len()))
        }
        (Shape::Int | Shape::UInt, v) => Err(mismatch(CborKind::Integer, v, enc)),
        (Shape::Float32, Value::Float32(f)) => enc.f32(*f),
        (Shape::Float32, Value::Float64(d)) => match narrow_f64(*d) {
            Some(f) => enc.f32(f),
            None => Err(CborError::new(ErrorCode::ValueOutOfRange, enc.len())),
        },
        (Shape::Float64, Value::Float64(d)) => enc.f64(*d),
        (Shape::Float64, Value::Float32(f)) => enc.f64(f64::from(*f)),
        (Shape::Float32 | Shape::Float64, v) => Err(mismatch(CborKind::Float, v, enc)),
        (Shape::Text, Value::Text(s)) => enc.text(s),
        (Shape::Text, v) => Err(mismatch(CborKind::Text, v, enc)),
        (Shape::Bytes, Value::Bytes(b)) => enc.bytes(b),
        (Shape::Bytes, v) => Err(mismatch(CborKind::Bytes, v, enc)),
        (Shape::Optional(_), Value::Null) => enc.null(),
        (Shape::Optional(inner), v) => write_shaped(enc, v, inner),
        (Shape::List(item), Value::Array(items)) => enc.atomic(|enc| {
            enc.begin_array(items.len())?;
            for v in items {
                write_shaped(enc, v, item)?;
            }
            enc.end_array()
        }),
        (Shape::List(_), v) => Err(mismatch(CborKind::Array, v, enc)),
        (Shape::Map(ks, vs), Value::Map(entries)) => enc.atomic(|enc| {
            enc.begin_map(entries.len())?;
            for (k, v) in entries {
                write_shaped(enc, k, ks)?;
                write_shaped(enc, v, vs)?;
            }
            enc.end_map()
        }),
        (Shape::Map(..), v) => Err(mismatch(CborKind::Map, v, enc)),
        (Shape::Record(desc), Value::Map(_)) => write_record(enc, value, desc),
        (Shape::Record(_), v) => Err(mismatch(CborKind::Map, v, enc)),
    }
}

fn write_record(enc: &mut Encoder, value: &Value, desc: &RecordDescriptor) -> Result<(), CborError> {
    let start = enc.len();
    let layout = desc.layout.unwrap_or(enc.records());
    enc.record_as(layout, desc.fields.len(), |r| {
        for field in &desc.fields {
            let v = match value.get(&field.name) {
                Some(v) => v,
                None if field.shape.is_optional() => &NULL,
                None => return Err(CborError::new(ErrorCode::MissingField, start)),
            };
            r.field_with(&field.name, |enc| write_shaped(enc, v, &field.shape))?;
        }
        Ok(())
    })
}

fn read_shaped(dec: &mut Decoder<'_>, shape: &Shape) -> Result<Value, CborError> {
    match shape {
        Shape::Any => Value::decode(dec),
        Shape::Null => dec.null().map(|()| Value::Null),
        Shape::Bool => dec.bool().map(Value::Bool),
        Shape::Int => {
            let v = dec.i128()?;
            // Every CBOR integer fits one of the two variants.
            Value::integer(v).ok_or_else(|| CborError::new(ErrorCode::ValueOutOfRange, dec.position()))
        }
        Shape::UInt => dec.u64().map(Value::Unsigned),
        Shape::Float32 => dec.f32().map(Value::Float32),
        Shape::Float64 => dec.f64().map(Value::Float64),
        Shape::Text => dec.text().map(|s| Value::Text(s.into_owned())),
        Shape::Bytes => dec.bytes().map(|b| Value::Bytes(b.into_owned())),
        Shape::Optional(inner) => {
            if dec.is_null()? {
                dec.null()?;
                Ok(Value::Null)
            } else {
                read_shaped(dec, inner)
            }
        }
        Shape::List(item) => {
            dec.begin_array()?;
            let mut items = Vec::new();
            while dec.has_next()? {
                items.push(read_shaped(dec, item)?);
            }
            dec.end_array()?;
            Ok(Value::Array(items))
        }
        Shape::Map(ks, vs) => {
            dec.begin_map()?;
            let mut entries = Vec::new();
            while dec.has_next()? {
                let k = read_shaped(dec, ks)?;
                let v = read_shaped(dec, vs)?;
                entries.push((k, v));
            }
            dec.end_map()?;
            Ok(Value::Map(entries))
        }
        Shape::Record(desc) => read_record(dec, desc),
    }
}

fn read_record(dec: &mut Decoder<'_>, desc: &RecordDescriptor) -> Result<Value, CborError> {
    let names: Vec<&str> = desc.fields.iter().map(|f| f.name.as_ref()).collect();
    let mut slots: Vec<Option<Value>> = desc.fields.iter().map(|_| None).collect();
    dec.record(&names, |idx, dec| {
        let off = dec.position();
        if slots[idx].is_some() {
            return Err(CborError::new(ErrorCode::DuplicateMapKey, off));
        }
        slots[idx] = Some(read_shaped(dec, &desc.fields[idx].shape)?);
        Ok(())
    })?;
    let mut entries = Vec::with_capacity(slots.len());
    for (field, slot) in desc.fields.iter().zip(slots) {
        let v = match slot {
            Some(v) => v,
            None if field.shape.is_optional() => Value::Null,
            None => return Err(CborError::new(ErrorCode::MissingField, dec.position())),
        };
        entries.push((Value::Text(String::from(field.name.as_ref())), v));
    }
    Ok(Value::Map(entries))
}
