use alloc::string::String;
use alloc::vec::Vec;

use crate::codec::{CborArrayElem, CborDecode, CborEncode};
use crate::config::Config;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::wire::{
    Arg, CborKind, Header, MajorType, AI_U16, AI_U32, AI_U64, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE,
    SIMPLE_UNDEFINED,
};
use crate::{CborError, ErrorCode};

/// A dynamically typed CBOR data item.
///
/// Floats keep their wire width and compare by bit pattern, so `NaN == NaN` when the payloads
/// match and `0.0 != -0.0`. Maps keep insertion order but compare without regard to order.
#[derive(Debug, Clone)]
pub enum Value {
    /// `null` (also produced for `undefined`).
    Null,
    /// `false` / `true`.
    Bool(bool),
    /// Major type 0.
    Unsigned(u64),
    /// Major type 1: the value is `-1 - n`.
    Negative(u64),
    /// Single precision float. Half precision input decodes to this variant.
    Float32(f32),
    /// Double precision float.
    Float64(f64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string.
    Text(String),
    /// Array.
    Array(Vec<Value>),
    /// Map entries in insertion order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Build an integer value, or `None` if `v` is outside the CBOR integer range.
    #[must_use]
    pub fn integer(v: i128) -> Option<Self> {
        if v >= 0 {
            u64::try_from(v).ok().map(Self::Unsigned)
        } else {
            u64::try_from(-1 - v).ok().map(Self::Negative)
        }
    }

    /// Build a text value.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// The kind of this value.
    #[must_use]
    pub const fn kind(&self) -> CborKind {
        match self {
            Self::Null => CborKind::Null,
            Self::Bool(_) => CborKind::Bool,
            Self::Unsigned(_) | Self::Negative(_) => CborKind::Integer,
            Self::Float32(_) | Self::Float64(_) => CborKind::Float,
            Self::Bytes(_) => CborKind::Bytes,
            Self::Text(_) => CborKind::Text,
            Self::Array(_) => CborKind::Array,
            Self::Map(_) => CborKind::Map,
        }
    }

    /// The major type this value encodes to.
    #[must_use]
    pub const fn major_type(&self) -> MajorType {
        match self {
            Self::Unsigned(_) => MajorType::Unsigned,
            Self::Negative(_) => MajorType::Negative,
            Self::Bytes(_) => MajorType::Bytes,
            Self::Text(_) => MajorType::Text,
            Self::Array(_) => MajorType::Array,
            Self::Map(_) => MajorType::Map,
            Self::Null | Self::Bool(_) | Self::Float32(_) | Self::Float64(_) => MajorType::Simple,
        }
    }

    /// Returns `true` for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer value, for either major type 0 or 1.
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Unsigned(v) => Some(i128::from(*v)),
            Self::Negative(n) => Some(-1 - i128::from(*n)),
            _ => None,
        }
    }

    /// The integer value, if it fits `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// The value of a non-negative integer.
    #[must_use]
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    /// The float value widened to `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(f) => Some(f64::from(*f)),
            Self::Float64(d) => Some(*d),
            _ => None,
        }
    }

    /// The text content.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The byte string content.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The array items.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The map entries in insertion order.
    #[must_use]
    pub fn as_map(&self) -> Option<&[(Self, Self)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a text key in a map value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Encode this value with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, CborError> {
        crate::encode_to_vec(self)
    }
}

/// Decode any single data item into a [`Value`].
///
/// Tags are skipped and their content returned.
///
/// # Errors
///
/// Returns an error if the input is malformed, truncated, or exceeds the configured limits.
pub fn decode_value(bytes: &[u8], config: Config) -> Result<Value, CborError> {
    crate::decode_with(bytes, config)
}

fn maps_equal(a: &[(Value, Value)], b: &[(Value, Value)]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used: Vec<bool> = b.iter().map(|_| false).collect();
    a.iter().all(|(ka, va)| {
        let hit = b
            .iter()
            .enumerate()
            .position(|(i, (kb, vb))| !used[i] && ka == kb && va == vb);
        match hit {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Unsigned(a), Self::Unsigned(b)) | (Self::Negative(a), Self::Negative(b)) => {
                a == b
            }
            (Self::Float32(a), Self::Float32(b)) => a.to_bits() == b.to_bits(),
            (Self::Float64(a), Self::Float64(b)) => a.to_bits() == b.to_bits(),
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => maps_equal(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        match u64::try_from(v) {
            Ok(u) => Self::Unsigned(u),
            Err(_) => Self::Negative((!v).unsigned_abs()),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Unsigned(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<Self>> for Value {
    fn from(v: Vec<Self>) -> Self {
        Self::Array(v)
    }
}

impl CborEncode for Value {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        match self {
            Self::Null => enc.null(),
            Self::Bool(b) => enc.bool(*b),
            Self::Unsigned(v) => enc.unsigned(*v),
            Self::Negative(n) => enc.int_i128(-1 - i128::from(*n)),
            Self::Float32(f) => enc.f32(*f),
            Self::Float64(d) => enc.f64(*d),
            Self::Bytes(b) => enc.bytes(b),
            Self::Text(s) => enc.text(s),
            Self::Array(items) => enc.array(items.len(), |a| {
                for item in items {
                    a.value(item)?;
                }
                Ok(())
            }),
            Self::Map(entries) => enc.map(entries.len(), |m| {
                for (k, v) in entries {
                    m.pair(k, v)?;
                }
                Ok(())
            }),
        }
    }
}

impl<'de> CborDecode<'de> for Value {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        let h = decoder.item_header()?;
        let h = decoder.skip_tags(h)?;
        match (h.major, h.arg) {
            (MajorType::Unsigned, Arg::Value(v)) => Ok(Self::Unsigned(v)),
            (MajorType::Negative, Arg::Value(n)) => Ok(Self::Negative(n)),
            (MajorType::Bytes, _) => decoder.bytes_payload(h).map(|b| Self::Bytes(b.into_owned())),
            (MajorType::Text, _) => decoder.text_payload(h).map(|s| Self::Text(s.into_owned())),
            (MajorType::Array, _) => {
                decoder.enter(h)?;
                let mut items = Vec::new();
                while decoder.has_next()? {
                    items.push(Self::decode(decoder)?);
                }
                decoder.end_array()?;
                Ok(Self::Array(items))
            }
            (MajorType::Map, _) => {
                decoder.enter(h)?;
                let mut entries = Vec::new();
                while decoder.has_next()? {
                    let k = Self::decode(decoder)?;
                    let v = Self::decode(decoder)?;
                    entries.push((k, v));
                }
                decoder.end_map()?;
                Ok(Self::Map(entries))
            }
            (MajorType::Simple, _) => decode_simple(h),
            _ => Err(CborError::new(ErrorCode::TypeMismatch, h.offset)),
        }
    }
}

fn decode_simple(h: Header) -> Result<Value, CborError> {
    match h.ai {
        SIMPLE_FALSE => Ok(Value::Bool(false)),
        SIMPLE_TRUE => Ok(Value::Bool(true)),
        SIMPLE_NULL | SIMPLE_UNDEFINED => Ok(Value::Null),
        AI_U16 | AI_U32 => Decoder::f32_payload(h).map(Value::Float32),
        AI_U64 => Decoder::f64_payload(h).map(Value::Float64),
        // Unassigned simple values have no Rust counterpart.
        _ => Err(CborError::new(ErrorCode::TypeMismatch, h.offset)),
    }
}

impl CborArrayElem for Value {}
