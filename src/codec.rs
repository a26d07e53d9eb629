use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::alloc_util::{try_string_from_str, try_vec_from_slice, try_vec_with_capacity};
use crate::config::Config;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::{CborError, ErrorCode};

/// Decode a value from a streaming decoder.
pub trait CborDecode<'de>: Sized {
    /// Decode `Self` from a streaming decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the CBOR item does not match the expected type or is out of range.
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError>;
}

/// Encode a value using the streaming encoder.
pub trait CborEncode {
    /// Encode `self` into the provided encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError>;
}

/// Marker trait for values that can appear as CBOR array elements.
///
/// `u8` does not implement it, so `Vec<u8>` and `[u8]` encode as byte strings.
pub trait CborArrayElem {}

pub(crate) fn log_failure<T>(res: Result<T, CborError>) -> Result<T, CborError> {
    #[cfg(feature = "tracing")]
    if let Err(err) = &res {
        tracing::debug!(code = ?err.code, offset = err.offset, detail = ?err.detail, "cbor codec failed");
    }
    res
}

/// Encode a value with the default configuration (positional records).
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_to_vec<T: CborEncode + ?Sized>(value: &T) -> Result<Vec<u8>, CborError> {
    encode_to_vec_with(value, Config::new())
}

/// Encode a value with an explicit configuration.
///
/// # Errors
///
/// Returns an error if encoding fails or a container opened by `begin_*` was left open.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(records = ?config.records)))]
pub fn encode_to_vec_with<T: CborEncode + ?Sized>(
    value: &T,
    config: Config,
) -> Result<Vec<u8>, CborError> {
    let mut enc = Encoder::with_config(config);
    log_failure(value.encode(&mut enc).and_then(|()| enc.finish()))
}

/// Decode a single item with the default configuration.
///
/// Bytes after the item are ignored; use [`decode_with`] and
/// [`Config::deny_trailing_bytes`] to reject them.
///
/// # Errors
///
/// Returns an error if decoding fails.
pub fn decode<'de, T: CborDecode<'de>>(bytes: &'de [u8]) -> Result<T, CborError> {
    decode_with(bytes, Config::new())
}

/// Decode a single item with an explicit configuration.
///
/// # Errors
///
/// Returns an error if decoding fails, or `TrailingBytes` if the configuration denies them.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(len = bytes.len())))]
pub fn decode_with<'de, T: CborDecode<'de>>(
    bytes: &'de [u8],
    config: Config,
) -> Result<T, CborError> {
    log_failure(decode_inner(bytes, &config, config.deny_trailing_bytes).map(|(v, _)| v))
}

/// Decode the first item of `bytes` and return it with the number of bytes consumed.
///
/// Trailing bytes are always allowed here.
///
/// # Errors
///
/// Returns an error if decoding fails.
pub fn decode_prefix<'de, T: CborDecode<'de>>(
    bytes: &'de [u8],
    config: Config,
) -> Result<(T, usize), CborError> {
    log_failure(decode_inner(bytes, &config, false))
}

fn decode_inner<'de, T: CborDecode<'de>>(
    bytes: &'de [u8],
    config: &Config,
    deny_trailing_bytes: bool,
) -> Result<(T, usize), CborError> {
    let mut decoder = Decoder::with_config(bytes, config)?;
    let value = T::decode(&mut decoder)?;
    decoder.finish(deny_trailing_bytes)?;
    Ok((value, decoder.position()))
}

// ---- unit, bool ----

impl CborEncode for () {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.null()
    }
}

impl<'de> CborDecode<'de> for () {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        decoder.null()
    }
}

impl CborEncode for bool {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.bool(*self)
    }
}

impl<'de> CborDecode<'de> for bool {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        decoder.bool()
    }
}

// ---- integers ----

macro_rules! signed_impls {
    ($($t:ty),*) => {$(
        impl CborEncode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
                enc.int(i64::from(*self))
            }
        }

        impl<'de> CborDecode<'de> for $t {
            fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
                let off = decoder.position();
                let v = decoder.i128()?;
                Self::try_from(v).map_err(|_| CborError::new(ErrorCode::ValueOutOfRange, off))
            }
        }

        impl CborArrayElem for $t {}
    )*};
}

macro_rules! unsigned_impls {
    ($($t:ty),*) => {$(
        impl CborEncode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
                enc.unsigned(u64::from(*self))
            }
        }

        impl<'de> CborDecode<'de> for $t {
            fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
                let off = decoder.position();
                let v = decoder.u64()?;
                Self::try_from(v).map_err(|_| CborError::new(ErrorCode::ValueOutOfRange, off))
            }
        }
    )*};
}

signed_impls!(i8, i16, i32, i64);
unsigned_impls!(u8, u16, u32, u64);

impl CborArrayElem for u16 {}
impl CborArrayElem for u32 {}
impl CborArrayElem for u64 {}

impl CborEncode for isize {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        let v = i64::try_from(*self)
            .map_err(|_| CborError::new(ErrorCode::ValueOutOfRange, enc.len()))?;
        enc.int(v)
    }
}

impl<'de> CborDecode<'de> for isize {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        let off = decoder.position();
        let v = decoder.i128()?;
        Self::try_from(v).map_err(|_| CborError::new(ErrorCode::ValueOutOfRange, off))
    }
}

impl CborEncode for usize {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        let v = u64::try_from(*self)
            .map_err(|_| CborError::new(ErrorCode::ValueOutOfRange, enc.len()))?;
        enc.unsigned(v)
    }
}

impl<'de> CborDecode<'de> for usize {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        let off = decoder.position();
        let v = decoder.u64()?;
        Self::try_from(v).map_err(|_| CborError::new(ErrorCode::ValueOutOfRange, off))
    }
}

impl CborEncode for i128 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.int_i128(*self)
    }
}

impl<'de> CborDecode<'de> for i128 {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        decoder.i128()
    }
}

impl CborEncode for u128 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.int_u128(*self)
    }
}

impl<'de> CborDecode<'de> for u128 {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        decoder.u64().map(Self::from)
    }
}

impl CborArrayElem for isize {}
impl CborArrayElem for usize {}
impl CborArrayElem for i128 {}
impl CborArrayElem for u128 {}

// ---- floats ----

impl CborEncode for f32 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.f32(*self)
    }
}

impl<'de> CborDecode<'de> for f32 {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        decoder.f32()
    }
}

impl CborEncode for f64 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.f64(*self)
    }
}

impl<'de> CborDecode<'de> for f64 {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        decoder.f64()
    }
}

impl CborArrayElem for f32 {}
impl CborArrayElem for f64 {}

// ---- strings ----

impl CborEncode for str {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.text(self)
    }
}

impl CborEncode for String {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.text(self)
    }
}

impl<'de> CborDecode<'de> for String {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        let off = decoder.position();
        match decoder.text()? {
            Cow::Borrowed(s) => try_string_from_str(s, off),
            Cow::Owned(s) => Ok(s),
        }
    }
}

impl<'de> CborDecode<'de> for Cow<'de, str> {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        decoder.text()
    }
}

impl CborEncode for Cow<'_, str> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.text(self)
    }
}

impl CborArrayElem for str {}
impl CborArrayElem for String {}
impl CborArrayElem for Cow<'_, str> {}

impl CborEncode for [u8] {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.bytes(self)
    }
}

impl CborEncode for Vec<u8> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.bytes(self)
    }
}

impl<'de> CborDecode<'de> for Vec<u8> {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        let off = decoder.position();
        match decoder.bytes()? {
            Cow::Borrowed(b) => try_vec_from_slice(b, off),
            Cow::Owned(b) => Ok(b),
        }
    }
}

impl<'de> CborDecode<'de> for Cow<'de, [u8]> {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        decoder.bytes()
    }
}

impl CborEncode for Cow<'_, [u8]> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.bytes(self)
    }
}

// ---- wrappers ----

impl<T: CborEncode + ?Sized> CborEncode for &T {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        (**self).encode(enc)
    }
}

impl<T: CborArrayElem + ?Sized> CborArrayElem for &T {}

impl<T: CborEncode + ?Sized> CborEncode for Box<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        (**self).encode(enc)
    }
}

impl<'de, T: CborDecode<'de>> CborDecode<'de> for Box<T> {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        T::decode(decoder).map(Box::new)
    }
}

impl<T: CborArrayElem + ?Sized> CborArrayElem for Box<T> {}

impl<T: CborEncode> CborEncode for Option<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        match self {
            Some(v) => v.encode(enc),
            None => enc.null(),
        }
    }
}

impl<'de, T: CborDecode<'de>> CborDecode<'de> for Option<T> {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        if decoder.is_null()? {
            decoder.null()?;
            Ok(None)
        } else {
            T::decode(decoder).map(Some)
        }
    }
}

impl<T> CborArrayElem for Option<T> {}

// ---- sequences ----

impl<T: CborEncode + CborArrayElem> CborEncode for [T] {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        enc.array(self.len(), |a| {
            for item in self {
                a.value(item)?;
            }
            Ok(())
        })
    }
}

impl<T: CborEncode + CborArrayElem> CborEncode for Vec<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        self.as_slice().encode(enc)
    }
}

impl<'de, T: CborDecode<'de> + CborArrayElem> CborDecode<'de> for Vec<T> {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        let off = decoder.position();
        let len = decoder.begin_array()?;
        let mut out = try_vec_with_capacity(len.unwrap_or(0), decoder.remaining(), off)?;
        while decoder.has_next()? {
            out.push(T::decode(decoder)?);
        }
        decoder.end_array()?;
        Ok(out)
    }
}

impl<T> CborArrayElem for Vec<T> {}
impl<T> CborArrayElem for [T] {}

macro_rules! tuple_impls {
    ($($len:literal => ($($name:ident $idx:tt),+))*) => {$(
        impl<$($name: CborEncode),+> CborEncode for ($($name,)+) {
            fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
                enc.array($len, |a| {
                    $(a.value(&self.$idx)?;)+
                    Ok(())
                })
            }
        }

        impl<'de, $($name: CborDecode<'de>),+> CborDecode<'de> for ($($name,)+) {
            fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
                decoder.begin_array()?;
                let value = ($($name::decode(decoder)?,)+);
                decoder.end_array()?;
                Ok(value)
            }
        }

        impl<$($name),+> CborArrayElem for ($($name,)+) {}
    )*};
}

tuple_impls! {
    2 => (A 0, B 1)
    3 => (A 0, B 1, C 2)
    4 => (A 0, B 1, C 2, D 3)
}

// ---- maps ----

fn encode_entries<'a, K, V, I>(enc: &mut Encoder, len: usize, entries: I) -> Result<(), CborError>
where
    K: CborEncode + 'a,
    V: CborEncode + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    enc.map(len, |m| {
        for (k, v) in entries {
            m.pair(k, v)?;
        }
        Ok(())
    })
}

/// Decode map entries, calling `insert` for each; `insert` returns `false` on a duplicate key.
fn decode_entries<'de, K, V, F>(decoder: &mut Decoder<'de>, mut insert: F) -> Result<(), CborError>
where
    K: CborDecode<'de>,
    V: CborDecode<'de>,
    F: FnMut(K, V) -> bool,
{
    decoder.begin_map()?;
    while decoder.has_next()? {
        let key_off = decoder.position();
        let key = K::decode(decoder)?;
        let value = V::decode(decoder)?;
        if !insert(key, value) {
            return Err(CborError::new(ErrorCode::DuplicateMapKey, key_off));
        }
    }
    decoder.end_map()
}

impl<K: CborEncode, V: CborEncode> CborEncode for BTreeMap<K, V> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        encode_entries(enc, self.len(), self)
    }
}

impl<'de, K: CborDecode<'de> + Ord, V: CborDecode<'de>> CborDecode<'de> for BTreeMap<K, V> {
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        let mut out = Self::new();
        decode_entries(decoder, |k, v| out.insert(k, v).is_none())?;
        Ok(out)
    }
}

impl<K, V> CborArrayElem for BTreeMap<K, V> {}

#[cfg(feature = "std")]
impl<K, V, S> CborEncode for std::collections::HashMap<K, V, S>
where
    K: CborEncode,
    V: CborEncode,
{
    fn encode(&self, enc: &mut Encoder) -> Result<(), CborError> {
        encode_entries(enc, self.len(), self)
    }
}

#[cfg(feature = "std")]
impl<'de, K, V, S> CborDecode<'de> for std::collections::HashMap<K, V, S>
where
    K: CborDecode<'de> + Eq + core::hash::Hash,
    V: CborDecode<'de>,
    S: core::hash::BuildHasher + Default,
{
    fn decode(decoder: &mut Decoder<'de>) -> Result<Self, CborError> {
        let mut out = Self::default();
        decode_entries(decoder, |k, v| out.insert(k, v).is_none())?;
        Ok(out)
    }
}

#[cfg(feature = "std")]
impl<K, V, S> CborArrayElem for std::collections::HashMap<K, V, S> {}
