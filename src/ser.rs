//! Streaming `serde::Serializer` on top of [`Encoder`].
//!
//! Structs follow the record layout of the encoder's [`Config`]. Unit variants are written as
//! their name; other variants as a single-entry map `{variant: content}`.

use alloc::vec::Vec;

use serde::ser::{
    SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant, SerializeTuple,
    SerializeTupleStruct, SerializeTupleVariant,
};
use serde::{Serialize, Serializer};

use crate::codec::log_failure;
use crate::config::{Config, RecordEncoding};
use crate::encode::Encoder;
use crate::value::Value;
use crate::CborError;

/// Serialize `value` with the default configuration.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CborError> {
    to_vec_with(value, Config::new())
}

/// Serialize `value` with an explicit configuration.
///
/// # Errors
///
/// Returns an error if serialization fails. Errors raised by the data structure carry the
/// `Serde` code and the output length at the time of failure.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(records = ?config.records)))]
pub fn to_vec_with<T: Serialize + ?Sized>(value: &T, config: Config) -> Result<Vec<u8>, CborError> {
    let mut enc = Encoder::with_config(config);
    let res = value.serialize(&mut enc).map_err(|mut err| {
        if err.is_serde() {
            err.offset = enc.len();
        }
        err
    });
    log_failure(res.and_then(|()| enc.finish()))
}

/// State for compound serde values: what to close and whether a variant map wraps it.
pub struct Compound<'a> {
    enc: &'a mut Encoder,
    keyed: bool,
    variant: bool,
}

impl<'a> Compound<'a> {
    fn array(enc: &'a mut Encoder, variant: bool) -> Self {
        Self {
            enc,
            keyed: false,
            variant,
        }
    }

    fn map(enc: &'a mut Encoder, variant: bool) -> Self {
        Self {
            enc,
            keyed: true,
            variant,
        }
    }

    fn open_record(
        enc: &'a mut Encoder,
        len: usize,
        variant: bool,
    ) -> Result<Self, CborError> {
        match enc.records() {
            RecordEncoding::Positional => {
                enc.begin_array(len)?;
                Ok(Self::array(enc, variant))
            }
            RecordEncoding::Keyed => {
                enc.begin_map(len)?;
                Ok(Self::map(enc, variant))
            }
        }
    }

    fn close(self) -> Result<(), CborError> {
        if self.keyed {
            self.enc.end_map()?;
        } else {
            self.enc.end_array()?;
        }
        if self.variant {
            self.enc.end_map()?;
        }
        Ok(())
    }

    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CborError> {
        value.serialize(&mut *self.enc)
    }

    fn field<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), CborError> {
        if self.keyed {
            self.enc.text(key)?;
        }
        value.serialize(&mut *self.enc)
    }
}

fn begin_seq(enc: &mut Encoder, len: Option<usize>) -> Result<(), CborError> {
    match len {
        Some(len) => enc.begin_array(len),
        None => enc.begin_array_indefinite(),
    }
}

impl<'a> Serializer for &'a mut Encoder {
    type Ok = ();
    type Error = CborError;

    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Compound<'a>;
    type SerializeMap = Compound<'a>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Compound<'a>;

    fn serialize_bool(self, v: bool) -> Result<(), CborError> {
        self.bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<(), CborError> {
        self.int(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<(), CborError> {
        self.int(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<(), CborError> {
        self.int(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<(), CborError> {
        self.int(v)
    }

    fn serialize_i128(self, v: i128) -> Result<(), CborError> {
        self.int_i128(v)
    }

    fn serialize_u8(self, v: u8) -> Result<(), CborError> {
        self.unsigned(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<(), CborError> {
        self.unsigned(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<(), CborError> {
        self.unsigned(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<(), CborError> {
        self.unsigned(v)
    }

    fn serialize_u128(self, v: u128) -> Result<(), CborError> {
        self.int_u128(v)
    }

    fn serialize_f32(self, v: f32) -> Result<(), CborError> {
        self.f32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<(), CborError> {
        self.f64(v)
    }

    fn serialize_char(self, v: char) -> Result<(), CborError> {
        let mut buf = [0u8; 4];
        self.text(v.encode_utf8(&mut buf))
    }

    fn serialize_str(self, v: &str) -> Result<(), CborError> {
        self.text(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), CborError> {
        self.bytes(v)
    }

    fn serialize_none(self) -> Result<(), CborError> {
        self.null()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), CborError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), CborError> {
        self.null()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), CborError> {
        self.null()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<(), CborError> {
        self.text(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), CborError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), CborError> {
        self.begin_map(1)?;
        self.text(variant)?;
        value.serialize(&mut *self)?;
        self.end_map()
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Compound<'a>, CborError> {
        begin_seq(self, len)?;
        Ok(Compound::array(self, false))
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a>, CborError> {
        self.begin_array(len)?;
        Ok(Compound::array(self, false))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, CborError> {
        self.begin_array(len)?;
        Ok(Compound::array(self, false))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, CborError> {
        self.begin_map(1)?;
        self.text(variant)?;
        self.begin_array(len)?;
        Ok(Compound::array(self, true))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Compound<'a>, CborError> {
        match len {
            Some(len) => self.begin_map(len)?,
            None => self.begin_map_indefinite()?,
        }
        Ok(Compound::map(self, false))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, CborError> {
        Compound::open_record(self, len, false)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, CborError> {
        self.begin_map(1)?;
        self.text(variant)?;
        Compound::open_record(self, len, true)
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl SerializeSeq for Compound<'_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CborError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CborError> {
        self.close()
    }
}

impl SerializeTuple for Compound<'_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CborError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CborError> {
        self.close()
    }
}

impl SerializeTupleStruct for Compound<'_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CborError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CborError> {
        self.close()
    }
}

impl SerializeTupleVariant for Compound<'_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CborError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CborError> {
        self.close()
    }
}

impl SerializeMap for Compound<'_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), CborError> {
        self.element(key)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CborError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CborError> {
        self.close()
    }
}

// Skipped fields write nothing: in the positional layout they shift later fields, so
// `skip_serializing_if` is only safe on trailing fields there.
impl SerializeStruct for Compound<'_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CborError> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), CborError> {
        self.close()
    }
}

impl SerializeStructVariant for Compound<'_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CborError> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), CborError> {
        self.close()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Unsigned(v) => serializer.serialize_u64(*v),
            Self::Negative(n) => match i64::try_from(*n) {
                Ok(n) => serializer.serialize_i64(-1 - n),
                Err(_) => serializer.serialize_i128(-1 - i128::from(*n)),
            },
            Self::Float32(f) => serializer.serialize_f32(*f),
            Self::Float64(d) => serializer.serialize_f64(*d),
            Self::Bytes(b) => serializer.serialize_bytes(b),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut m = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}
