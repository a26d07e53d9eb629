use alloc::vec::Vec;

use crate::codec::CborEncode;
use crate::config::{Config, RecordEncoding};
use crate::sink::{write_break, write_header, write_indefinite, write_len, Sink, VecSink};
use crate::wire::{MajorType, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE};
use crate::{CborError, ErrorCode};

const FLOAT32: u8 = 0xfa;
const FLOAT64: u8 = 0xfb;

#[derive(Debug, Clone, Copy)]
struct Frame {
    major: MajorType,
    indefinite: bool,
}

/// Streaming encoder that writes CBOR directly into a `Vec<u8>`.
///
/// Integers and lengths always use the shortest argument width. `f32` is always written as a
/// 4-byte float and `f64` as an 8-byte float, bit for bit.
pub struct Encoder {
    sink: VecSink,
    records: RecordEncoding,
    open: Vec<Frame>,
}

impl Encoder {
    /// Create a new encoder with default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sink: VecSink::new(),
            records: RecordEncoding::Positional,
            open: Vec::new(),
        }
    }

    /// Create an encoder that follows `config` (record layout).
    #[must_use]
    pub const fn with_config(config: Config) -> Self {
        Self {
            sink: VecSink::new(),
            records: config.records,
            open: Vec::new(),
        }
    }

    /// Create an encoder with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sink: VecSink::with_capacity(capacity),
            records: RecordEncoding::Positional,
            open: Vec::new(),
        }
    }

    /// The record layout this encoder writes.
    #[must_use]
    pub const fn records(&self) -> RecordEncoding {
        self.records
    }

    /// Return the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sink.position()
    }

    /// Returns `true` if no bytes have been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sink.position() == 0
    }

    /// Borrow the bytes emitted so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.sink.as_slice()
    }

    /// Consume and return the encoded bytes, whether or not all containers were closed.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.sink.into_vec()
    }

    /// Consume and return the encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedContainer` if a container opened with `begin_*` was never ended.
    pub fn finish(self) -> Result<Vec<u8>, CborError> {
        if !self.open.is_empty() {
            return Err(self.err(ErrorCode::UnbalancedContainer));
        }
        Ok(self.sink.into_vec())
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.sink.truncate(len);
    }

    fn err(&self, code: ErrorCode) -> CborError {
        CborError::new(code, self.sink.position())
    }

    /// Run `f`, removing whatever it wrote if it fails.
    pub(crate) fn atomic<F>(&mut self, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut Self) -> Result<(), CborError>,
    {
        let start = self.sink.position();
        let depth = self.open.len();
        let res = f(self);
        if res.is_err() {
            self.sink.truncate(start);
            self.open.truncate(depth);
        }
        res
    }

    /// Encode CBOR null.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn null(&mut self) -> Result<(), CborError> {
        self.sink.write_u8(0xe0 | SIMPLE_NULL)
    }

    /// Encode a CBOR boolean.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn bool(&mut self, v: bool) -> Result<(), CborError> {
        self.sink
            .write_u8(0xe0 | if v { SIMPLE_TRUE } else { SIMPLE_FALSE })
    }

    /// Encode a non-negative integer (major 0).
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn unsigned(&mut self, v: u64) -> Result<(), CborError> {
        write_header(&mut self.sink, MajorType::Unsigned, v)
    }

    /// Encode a signed integer: major 0 when non-negative, major 1 with argument `-1 - v` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn int(&mut self, v: i64) -> Result<(), CborError> {
        match u64::try_from(v) {
            Ok(u) => write_header(&mut self.sink, MajorType::Unsigned, u),
            // `!v` is `-1 - v` in two's complement and never overflows.
            Err(_) => write_header(&mut self.sink, MajorType::Negative, (!v).unsigned_abs()),
        }
    }

    /// Encode a 128-bit signed integer.
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` if `v` is outside `-2^64..=2^64-1`.
    pub fn int_i128(&mut self, v: i128) -> Result<(), CborError> {
        if v >= 0 {
            let u = u64::try_from(v).map_err(|_| self.err(ErrorCode::ValueOutOfRange))?;
            return self.unsigned(u);
        }
        let n = u64::try_from(-1 - v).map_err(|_| self.err(ErrorCode::ValueOutOfRange))?;
        write_header(&mut self.sink, MajorType::Negative, n)
    }

    /// Encode a 128-bit unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` if `v` exceeds `u64::MAX`.
    pub fn int_u128(&mut self, v: u128) -> Result<(), CborError> {
        let u = u64::try_from(v).map_err(|_| self.err(ErrorCode::ValueOutOfRange))?;
        self.unsigned(u)
    }

    /// Encode a single-precision float as `0xfa` + 4 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn f32(&mut self, v: f32) -> Result<(), CborError> {
        let mut buf = [FLOAT32, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_bits().to_be_bytes());
        self.sink.write(&buf)
    }

    /// Encode a double-precision float as `0xfb` + 8 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn f64(&mut self, v: f64) -> Result<(), CborError> {
        let mut buf = [FLOAT64, 0, 0, 0, 0, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v.to_bits().to_be_bytes());
        self.sink.write(&buf)
    }

    /// Encode a byte string.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn bytes(&mut self, b: &[u8]) -> Result<(), CborError> {
        self.atomic(|enc| {
            write_len(&mut enc.sink, MajorType::Bytes, b.len())?;
            enc.sink.write(b)
        })
    }

    /// Encode a text string.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn text(&mut self, s: &str) -> Result<(), CborError> {
        self.atomic(|enc| {
            write_len(&mut enc.sink, MajorType::Text, s.len())?;
            enc.sink.write(s.as_bytes())
        })
    }

    /// Encode a value using the native `CborEncode` trait.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails. Nothing written for the value remains in the buffer.
    pub fn value<T: CborEncode + ?Sized>(&mut self, value: &T) -> Result<(), CborError> {
        self.atomic(|enc| value.encode(enc))
    }

    /// Open a definite-length array of `len` elements.
    ///
    /// The encoder trusts `len`: the caller must write exactly `len` items before `end_array`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn begin_array(&mut self, len: usize) -> Result<(), CborError> {
        self.begin(MajorType::Array, Some(len))
    }

    /// Open an indefinite-length array, closed by `end_array` with a break byte.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn begin_array_indefinite(&mut self) -> Result<(), CborError> {
        self.begin(MajorType::Array, None)
    }

    /// Close the innermost open array.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedContainer` if the innermost open container is not an array.
    pub fn end_array(&mut self) -> Result<(), CborError> {
        self.end(MajorType::Array)
    }

    /// Open a definite-length map of `len` key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn begin_map(&mut self, len: usize) -> Result<(), CborError> {
        self.begin(MajorType::Map, Some(len))
    }

    /// Open an indefinite-length map, closed by `end_map` with a break byte.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the underlying buffer fails.
    pub fn begin_map_indefinite(&mut self) -> Result<(), CborError> {
        self.begin(MajorType::Map, None)
    }

    /// Close the innermost open map.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedContainer` if the innermost open container is not a map.
    pub fn end_map(&mut self) -> Result<(), CborError> {
        self.end(MajorType::Map)
    }

    fn begin(&mut self, major: MajorType, len: Option<usize>) -> Result<(), CborError> {
        let start = self.sink.position();
        let res = match len {
            Some(len) => write_len(&mut self.sink, major, len),
            None => write_indefinite(&mut self.sink, major),
        };
        if let Err(err) = res {
            self.sink.truncate(start);
            return Err(err);
        }
        self.open.push(Frame {
            major,
            indefinite: len.is_none(),
        });
        Ok(())
    }

    fn end(&mut self, major: MajorType) -> Result<(), CborError> {
        match self.open.last() {
            Some(frame) if frame.major == major => {
                if frame.indefinite {
                    write_break(&mut self.sink)?;
                }
                self.open.pop();
                Ok(())
            }
            _ => Err(self.err(ErrorCode::UnbalancedContainer)),
        }
    }

    /// Encode a definite-length array and fill it via the provided builder.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or if the builder emits a different number of items.
    /// On error the partially written array is removed.
    pub fn array<F>(&mut self, len: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut ArrayEncoder<'_>) -> Result<(), CborError>,
    {
        self.atomic(|enc| {
            write_len(&mut enc.sink, MajorType::Array, len)?;
            let mut a = ArrayEncoder {
                enc,
                remaining: len,
            };
            f(&mut a)?;
            if a.remaining != 0 {
                let written = (len - a.remaining) as u64;
                return Err(CborError::length(
                    ErrorCode::LengthMismatch,
                    len as u64,
                    written,
                    a.enc.sink.position(),
                ));
            }
            Ok(())
        })
    }

    /// Encode a definite-length map and fill it via the provided builder.
    ///
    /// Entries are written in the order the builder supplies them.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or if the builder emits a different number of entries.
    /// On error the partially written map is removed.
    pub fn map<F>(&mut self, len: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut MapEncoder<'_>) -> Result<(), CborError>,
    {
        self.atomic(|enc| {
            write_len(&mut enc.sink, MajorType::Map, len)?;
            let mut m = MapEncoder {
                enc,
                remaining: len,
            };
            f(&mut m)?;
            if m.remaining != 0 {
                let written = (len - m.remaining) as u64;
                return Err(CborError::length(
                    ErrorCode::LengthMismatch,
                    len as u64,
                    written,
                    m.enc.sink.position(),
                ));
            }
            Ok(())
        })
    }

    /// Encode a record of `fields` fields in this encoder's configured layout.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or if the builder writes a different number of fields.
    pub fn record<F>(&mut self, fields: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut RecordEncoder<'_>) -> Result<(), CborError>,
    {
        self.record_as(self.records, fields, f)
    }

    /// Encode a record in an explicit layout, ignoring the configured one.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or if the builder writes a different number of fields.
    pub fn record_as<F>(
        &mut self,
        layout: RecordEncoding,
        fields: usize,
        f: F,
    ) -> Result<(), CborError>
    where
        F: FnOnce(&mut RecordEncoder<'_>) -> Result<(), CborError>,
    {
        let major = match layout {
            RecordEncoding::Positional => MajorType::Array,
            RecordEncoding::Keyed => MajorType::Map,
        };
        self.atomic(|enc| {
            write_len(&mut enc.sink, major, fields)?;
            let mut r = RecordEncoder {
                enc,
                layout,
                remaining: fields,
            };
            f(&mut r)?;
            if r.remaining != 0 {
                return Err(CborError::length(
                    ErrorCode::LengthMismatch,
                    fields as u64,
                    (fields - r.remaining) as u64,
                    r.enc.sink.position(),
                ));
            }
            Ok(())
        })
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for writing array elements.
pub struct ArrayEncoder<'a> {
    enc: &'a mut Encoder,
    remaining: usize,
}

#[allow(missing_docs)]
impl ArrayEncoder<'_> {
    fn consume_one(&mut self) -> Result<(), CborError> {
        if self.remaining == 0 {
            return Err(self.enc.err(ErrorCode::LengthMismatch));
        }
        self.remaining -= 1;
        Ok(())
    }

    /// Encode CBOR null.
    ///
    /// # Errors
    ///
    /// Returns an error if the array length is exceeded or if encoding fails.
    pub fn null(&mut self) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.null()
    }

    pub fn bool(&mut self, v: bool) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.bool(v)
    }

    pub fn int(&mut self, v: i64) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.int(v)
    }

    pub fn unsigned(&mut self, v: u64) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.unsigned(v)
    }

    pub fn f32(&mut self, v: f32) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.f32(v)
    }

    pub fn f64(&mut self, v: f64) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.f64(v)
    }

    pub fn bytes(&mut self, b: &[u8]) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.bytes(b)
    }

    pub fn text(&mut self, s: &str) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.text(s)
    }

    /// Encode a value using the native `CborEncode` trait.
    ///
    /// # Errors
    ///
    /// Returns an error if the array length is exceeded or if encoding fails.
    pub fn value<T: CborEncode + ?Sized>(&mut self, value: &T) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.value(value)
    }

    pub fn array<F>(&mut self, len: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut ArrayEncoder<'_>) -> Result<(), CborError>,
    {
        self.consume_one()?;
        self.enc.array(len, f)
    }

    pub fn map<F>(&mut self, len: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut MapEncoder<'_>) -> Result<(), CborError>,
    {
        self.consume_one()?;
        self.enc.map(len, f)
    }
}

/// Builder for writing map entries. Entries keep insertion order.
pub struct MapEncoder<'a> {
    enc: &'a mut Encoder,
    remaining: usize,
}

impl MapEncoder<'_> {
    fn write_entry<K, F>(&mut self, key: K, f: F) -> Result<(), CborError>
    where
        K: FnOnce(&mut Encoder) -> Result<(), CborError>,
        F: FnOnce(&mut Encoder) -> Result<(), CborError>,
    {
        if self.remaining == 0 {
            return Err(self.enc.err(ErrorCode::LengthMismatch));
        }
        self.enc.atomic(|enc| {
            key(enc)?;
            f(enc)
        })?;
        self.remaining -= 1;
        Ok(())
    }

    /// Insert an entry with a text key; `f` writes exactly one value.
    ///
    /// # Errors
    ///
    /// Returns an error if the map length is exceeded or if encoding fails.
    pub fn entry<F>(&mut self, key: &str, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut Encoder) -> Result<(), CborError>,
    {
        self.write_entry(|enc| enc.text(key), f)
    }

    /// Insert an entry with an arbitrary encodable key.
    ///
    /// # Errors
    ///
    /// Returns an error if the map length is exceeded or if encoding fails.
    pub fn entry_with<K, F>(&mut self, key: &K, f: F) -> Result<(), CborError>
    where
        K: CborEncode + ?Sized,
        F: FnOnce(&mut Encoder) -> Result<(), CborError>,
    {
        self.write_entry(|enc| key.encode(enc), f)
    }

    /// Insert a key/value pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the map length is exceeded or if encoding fails.
    pub fn pair<K, V>(&mut self, key: &K, value: &V) -> Result<(), CborError>
    where
        K: CborEncode + ?Sized,
        V: CborEncode + ?Sized,
    {
        self.write_entry(|enc| key.encode(enc), |enc| value.encode(enc))
    }
}

/// Builder for writing record fields in declaration order.
pub struct RecordEncoder<'a> {
    enc: &'a mut Encoder,
    layout: RecordEncoding,
    remaining: usize,
}

impl RecordEncoder<'_> {
    /// The layout this record is being written in.
    #[must_use]
    pub const fn layout(&self) -> RecordEncoding {
        self.layout
    }

    /// Write the next field. `name` is only emitted in the keyed layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the field count is exceeded or if encoding fails.
    pub fn field<T: CborEncode + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), CborError> {
        self.field_with(name, |enc| value.encode(enc))
    }

    /// Write the next field with a custom value writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the field count is exceeded or if encoding fails.
    pub fn field_with<F>(&mut self, name: &str, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut Encoder) -> Result<(), CborError>,
    {
        if self.remaining == 0 {
            return Err(self.enc.err(ErrorCode::LengthMismatch));
        }
        let layout = self.layout;
        self.enc.atomic(|enc| {
            if layout == RecordEncoding::Keyed {
                enc.text(name)?;
            }
            f(enc)
        })?;
        self.remaining -= 1;
        Ok(())
    }
}
