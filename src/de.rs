//! `serde::Deserializer` on top of [`Decoder`].
//!
//! Structs accept both record layouts: an array is matched positionally and a map by field name.
//! Tags are skipped wherever an item is expected.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    self, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess,
    Visitor,
};
use serde::{Deserialize, Deserializer};

use crate::codec::log_failure;
use crate::config::Config;
use crate::decode::Decoder;
use crate::value::Value;
use crate::wire::{
    Arg, CborKind, Header, MajorType, AI_U16, AI_U32, AI_U64, SIMPLE_FALSE, SIMPLE_NULL,
    SIMPLE_TRUE, SIMPLE_UNDEFINED,
};
use crate::{CborError, ErrorCode};

/// Deserialize a `T` from `bytes` with the default configuration.
///
/// # Errors
///
/// Returns an error if the input is malformed or does not match `T`.
pub fn from_slice<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T, CborError> {
    from_slice_with(bytes, Config::new())
}

/// Deserialize a `T` from `bytes` with an explicit configuration.
///
/// # Errors
///
/// Returns an error if the input is malformed, does not match `T`, or exceeds the configured
/// limits. Errors raised by `T` itself report the offset where decoding stopped.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(len = bytes.len())))]
pub fn from_slice_with<'de, T: Deserialize<'de>>(
    bytes: &'de [u8],
    config: Config,
) -> Result<T, CborError> {
    let mut dec = match Decoder::with_config(bytes, &config) {
        Ok(dec) => dec,
        Err(err) => return log_failure(Err(err)),
    };
    let res = T::deserialize(&mut dec).map_err(|mut err| {
        if err.offset == 0
            && matches!(
                err.code,
                ErrorCode::Serde | ErrorCode::MissingField | ErrorCode::LengthMismatch
            )
        {
            err.offset = dec.position();
        }
        err
    });
    log_failure(res.and_then(|v| dec.finish(config.deny_trailing_bytes).map(|()| v)))
}

impl<'de> Decoder<'de> {
    /// Next item header with any tags in front of it removed.
    fn untagged_header(&mut self) -> Result<Header, CborError> {
        let h = self.item_header()?;
        self.skip_tags(h)
    }

    fn visit_header<V: Visitor<'de>>(
        &mut self,
        h: Header,
        visitor: V,
    ) -> Result<V::Value, CborError> {
        match (h.major, h.arg) {
            (MajorType::Unsigned, Arg::Value(v)) => visitor.visit_u64(v),
            (MajorType::Negative, Arg::Value(n)) => match i64::try_from(n) {
                Ok(n) => visitor.visit_i64(-1 - n),
                Err(_) => visitor.visit_i128(-1 - i128::from(n)),
            },
            (MajorType::Bytes, _) => match self.bytes_payload(h)? {
                Cow::Borrowed(b) => visitor.visit_borrowed_bytes(b),
                Cow::Owned(b) => visitor.visit_byte_buf(b),
            },
            (MajorType::Text, _) => match self.text_payload(h)? {
                Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
                Cow::Owned(s) => visitor.visit_string(s),
            },
            (MajorType::Array, _) => {
                self.enter(h)?;
                let value = visitor.visit_seq(Access { de: self })?;
                self.end_array()?;
                Ok(value)
            }
            (MajorType::Map, _) => {
                self.enter(h)?;
                let value = visitor.visit_map(Access { de: self })?;
                self.end_map()?;
                Ok(value)
            }
            (MajorType::Simple, _) => match h.ai {
                SIMPLE_FALSE => visitor.visit_bool(false),
                SIMPLE_TRUE => visitor.visit_bool(true),
                SIMPLE_NULL | SIMPLE_UNDEFINED => visitor.visit_unit(),
                AI_U16 | AI_U32 => visitor.visit_f32(Self::f32_payload(h)?),
                AI_U64 => visitor.visit_f64(Self::f64_payload(h)?),
                _ => Err(CborError::new(ErrorCode::TypeMismatch, h.offset)),
            },
            _ => Err(CborError::new(ErrorCode::TypeMismatch, h.offset)),
        }
    }

    fn expect(&mut self, expected: CborKind) -> Result<Header, CborError> {
        let h = self.untagged_header()?;
        if h.kind() == expected {
            Ok(h)
        } else {
            Err(CborError::type_mismatch(expected, h.major, h.offset))
        }
    }

    fn int_header(&mut self) -> Result<(i128, usize), CborError> {
        let h = self.untagged_header()?;
        Self::int_payload(h).map(|v| (v, h.offset))
    }
}

macro_rules! deserialize_ints {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
            let (v, off) = self.int_header()?;
            let v = <$ty>::try_from(v)
                .map_err(|_| CborError::new(ErrorCode::ValueOutOfRange, off))?;
            visitor.$visit(v)
        }
    )*};
}

impl<'de> Deserializer<'de> for &mut Decoder<'de> {
    type Error = CborError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        let h = self.untagged_header()?;
        self.visit_header(h, visitor)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        let h = self.expect(CborKind::Bool)?;
        visitor.visit_bool(h.ai == SIMPLE_TRUE)
    }

    deserialize_ints! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        let h = self.untagged_header()?;
        visitor.visit_f32(Decoder::f32_payload(h)?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        let h = self.untagged_header()?;
        visitor.visit_f64(Decoder::f64_payload(h)?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        let h = self.expect(CborKind::Text)?;
        self.visit_header(h, visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        let h = self.expect(CborKind::Bytes)?;
        self.visit_header(h, visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        if self.is_null()? {
            self.null()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        self.null()?;
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CborError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CborError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        let h = self.expect(CborKind::Array)?;
        self.visit_header(h, visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CborError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CborError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        let h = self.expect(CborKind::Map)?;
        self.visit_header(h, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CborError> {
        let h = self.untagged_header()?;
        match h.major {
            MajorType::Array => {
                self.enter(h)?;
                let value = visitor.visit_seq(Access { de: self })?;
                // Elements past the last known field are ignored.
                while self.has_next()? {
                    self.skip_value()?;
                }
                self.end_array()?;
                Ok(value)
            }
            MajorType::Map => self.visit_header(h, visitor),
            _ => Err(CborError::type_mismatch(CborKind::Map, h.major, h.offset)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CborError> {
        let h = self.untagged_header()?;
        match h.major {
            MajorType::Text => match self.text_payload(h)? {
                Cow::Borrowed(s) => visitor.visit_enum(BorrowedStrDeserializer::new(s)),
                Cow::Owned(s) => {
                    visitor.visit_enum(<String as IntoDeserializer<'de, CborError>>::into_deserializer(s))
                },
            },
            MajorType::Map => {
                if self.enter(h)? != Some(1) {
                    return Err(CborError::new(ErrorCode::TypeMismatch, h.offset));
                }
                let value = visitor.visit_enum(Enum { de: self })?;
                self.end_map()?;
                Ok(value)
            }
            _ => Err(CborError::type_mismatch(CborKind::Text, h.major, h.offset)),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        if self.peek_kind()? == CborKind::Integer {
            self.deserialize_u64(visitor)
        } else {
            self.deserialize_str(visitor)
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CborError> {
        self.skip_value()?;
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// Sequence and map access; both read until the open container reports no more items.
struct Access<'a, 'de> {
    de: &'a mut Decoder<'de>,
}

impl<'de> SeqAccess<'de> for Access<'_, 'de> {
    type Error = CborError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CborError> {
        if !self.de.has_next()? {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

impl<'de> MapAccess<'de> for Access<'_, 'de> {
    type Error = CborError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CborError> {
        if !self.de.has_next()? {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<T::Value, CborError> {
        seed.deserialize(&mut *self.de)
    }
}

/// `{variant: content}` with the map already entered.
struct Enum<'a, 'de> {
    de: &'a mut Decoder<'de>,
}

impl<'a, 'de> EnumAccess<'de> for Enum<'a, 'de> {
    type Error = CborError;
    type Variant = Self;

    fn variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<(T::Value, Self), CborError> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'de> VariantAccess<'de> for Enum<'_, 'de> {
    type Error = CborError;

    fn unit_variant(self) -> Result<(), CborError> {
        self.de.null()
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, CborError> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, CborError> {
        self.de.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CborError> {
        self.de.deserialize_struct("", fields, visitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any CBOR data item")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Value, E> {
        Value::integer(v).ok_or_else(|| E::custom("integer out of CBOR range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Unsigned(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Value, E> {
        u64::try_from(v)
            .map(Value::Unsigned)
            .map_err(|_| E::custom("integer out of CBOR range"))
    }

    fn visit_f32<E: de::Error>(self, v: f32) -> Result<Value, E> {
        Ok(Value::Float32(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.into()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = Vec::new();
        while let Some(entry) = map.next_entry()? {
            entries.push(entry);
        }
        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
