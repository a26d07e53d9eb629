use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

use half::f16;

use crate::alloc_util::try_reserve;
use crate::config::Config;
use crate::limits::DecodeLimits;
use crate::utf8;
use crate::wire::{
    len_to_usize, Arg, CborKind, Cursor, Header, MajorType, AI_U16, AI_U32, AI_U64, BREAK,
    SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE, SIMPLE_UNDEFINED,
};
use crate::{CborError, ErrorCode};

#[derive(Debug, Clone, Copy)]
struct Frame {
    major: MajorType,
    /// Declared child items (keys and values both count for maps); `None` if indefinite.
    declared: Option<u64>,
    read: u64,
}

impl Frame {
    const fn is_complete(&self) -> bool {
        match self.declared {
            Some(n) => self.read >= n,
            None => false,
        }
    }
}

/// Streaming decoder over a complete CBOR buffer.
///
/// The decoder tracks how many direct children of every open array or map have been read. If the
/// input ends at an item boundary while a container still expects children, reads fail with
/// `TruncatedStructure`; if it ends in the middle of an item they fail with `UnexpectedEndOfInput`.
pub struct Decoder<'de> {
    cursor: Cursor<'de>,
    limits: DecodeLimits,
    frames: Vec<Frame>,
    items_seen: usize,
}

impl<'de> Decoder<'de> {
    /// Construct a decoder with explicit limits.
    ///
    /// # Errors
    ///
    /// Returns `MessageLenLimitExceeded` if `bytes` exceeds the input limit.
    pub const fn new(bytes: &'de [u8], limits: DecodeLimits) -> Result<Self, CborError> {
        if bytes.len() > limits.max_input_bytes {
            return Err(CborError::new(ErrorCode::MessageLenLimitExceeded, 0));
        }
        Ok(Self {
            cursor: Cursor::new(bytes),
            limits,
            frames: Vec::new(),
            items_seen: 0,
        })
    }

    /// Construct a decoder using the limits of `config`.
    ///
    /// # Errors
    ///
    /// Returns `MessageLenLimitExceeded` if `bytes` exceeds the input limit.
    pub fn with_config(bytes: &'de [u8], config: &Config) -> Result<Self, CborError> {
        Self::new(bytes, config.limits_for(bytes.len()))
    }

    /// Return the current byte offset in the input.
    #[must_use]
    #[inline]
    pub const fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Returns `true` once every input byte has been consumed.
    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    /// Number of input bytes not yet consumed.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Number of containers currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check that every container was closed, and optionally that no input remains.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedContainer` if a container is still open, or `TrailingBytes` if
    /// `deny_trailing_bytes` is set and input remains.
    pub fn finish(&self, deny_trailing_bytes: bool) -> Result<(), CborError> {
        if !self.frames.is_empty() {
            return Err(CborError::new(
                ErrorCode::UnbalancedContainer,
                self.position(),
            ));
        }
        if deny_trailing_bytes && !self.cursor.is_at_end() {
            return Err(CborError::new(ErrorCode::TrailingBytes, self.position()));
        }
        Ok(())
    }

    fn err(&self, code: ErrorCode) -> CborError {
        CborError::new(code, self.position())
    }

    fn truncated(&self, frame: &Frame) -> CborError {
        match frame.declared {
            Some(declared) => CborError::length(
                ErrorCode::TruncatedStructure,
                declared,
                frame.read,
                self.position(),
            ),
            None => self.err(ErrorCode::TruncatedStructure),
        }
    }

    /// Errors that apply before the next item of the innermost container can be read.
    fn check_item_start(&self) -> Result<(), CborError> {
        let Some(frame) = self.frames.last() else {
            if self.cursor.is_at_end() {
                return Err(self.err(ErrorCode::UnexpectedEndOfInput));
            }
            return Ok(());
        };
        if frame.is_complete() {
            return Err(CborError::length(
                ErrorCode::LengthMismatch,
                frame.declared.unwrap_or(frame.read),
                frame.read + 1,
                self.position(),
            ));
        }
        if self.cursor.is_at_end() {
            return Err(self.truncated(frame));
        }
        if frame.declared.is_none() && self.cursor.peek_u8()? == BREAK {
            // A break where a map value belongs is malformed input, not an over-read.
            let code = if frame.major == MajorType::Map && frame.read % 2 == 1 {
                ErrorCode::MalformedHeader
            } else {
                ErrorCode::LengthMismatch
            };
            return Err(self.err(code));
        }
        Ok(())
    }

    fn bump_items(&mut self, add: usize, off: usize) -> Result<(), CborError> {
        self.items_seen = self
            .items_seen
            .checked_add(add)
            .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, off))?;
        if self.items_seen > self.limits.max_total_items {
            return Err(CborError::new(ErrorCode::TotalItemsLimitExceeded, off));
        }
        Ok(())
    }

    /// Read the header of the next item and count it against the enclosing container.
    pub(crate) fn item_header(&mut self) -> Result<Header, CborError> {
        self.check_item_start()?;
        let h = self.cursor.read_header()?;
        if h.is_break() {
            return Err(CborError::new(ErrorCode::MalformedHeader, h.offset));
        }
        let limits = self.limits;
        let mut bump = false;
        if let Some(frame) = self.frames.last_mut() {
            frame.read += 1;
            if frame.declared.is_none() {
                let (len, max, code) = match frame.major {
                    MajorType::Map => (
                        frame.read.div_ceil(2),
                        limits.max_map_len,
                        ErrorCode::MapLenLimitExceeded,
                    ),
                    _ => (
                        frame.read,
                        limits.max_array_len,
                        ErrorCode::ArrayLenLimitExceeded,
                    ),
                };
                if len > max as u64 {
                    return Err(CborError::new(code, h.offset));
                }
                bump = true;
            }
        }
        if bump {
            self.bump_items(1, h.offset)?;
        }
        Ok(h)
    }

    /// Peek at the next item's header without consuming input.
    ///
    /// # Errors
    ///
    /// Returns the same end-of-input errors a read would.
    pub fn peek_header(&self) -> Result<Header, CborError> {
        self.check_item_start()?;
        let mut probe = self.cursor;
        probe.read_header()
    }

    /// Kind of the next item.
    ///
    /// # Errors
    ///
    /// Returns the same end-of-input errors a read would.
    pub fn peek_kind(&self) -> Result<CborKind, CborError> {
        self.peek_header().map(|h| h.kind())
    }

    /// Returns `true` if the next item is `null` or `undefined`.
    ///
    /// # Errors
    ///
    /// Returns the same end-of-input errors a read would.
    pub fn is_null(&self) -> Result<bool, CborError> {
        Ok(self.peek_kind()? == CborKind::Null)
    }

    /// Skip any number of tags in front of an item. Tag content is not counted as a child.
    pub(crate) fn skip_tags(&mut self, mut h: Header) -> Result<Header, CborError> {
        while h.major == MajorType::Tag {
            h = self.cursor.read_header()?;
            if h.is_break() {
                return Err(CborError::new(ErrorCode::MalformedHeader, h.offset));
            }
        }
        Ok(h)
    }

    // ---- scalars ----

    /// Decode an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` for negative integers and `TypeMismatch` for non-integers.
    pub fn u64(&mut self) -> Result<u64, CborError> {
        let h = self.item_header()?;
        match (h.major, h.arg) {
            (MajorType::Unsigned, Arg::Value(v)) => Ok(v),
            (MajorType::Negative, _) => Err(CborError::new(ErrorCode::ValueOutOfRange, h.offset)),
            _ => Err(CborError::type_mismatch(CborKind::Integer, h.major, h.offset)),
        }
    }

    /// Decode a signed integer.
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` if the value does not fit `i64`.
    pub fn i64(&mut self) -> Result<i64, CborError> {
        let off = self.position();
        let v = self.i128()?;
        i64::try_from(v).map_err(|_| CborError::new(ErrorCode::ValueOutOfRange, off))
    }

    /// Decode any CBOR integer, covering the full `-2^64..=2^64-1` range.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-integers.
    pub fn i128(&mut self) -> Result<i128, CborError> {
        let h = self.item_header()?;
        Self::int_payload(h)
    }

    pub(crate) fn int_payload(h: Header) -> Result<i128, CborError> {
        match (h.major, h.arg) {
            (MajorType::Unsigned, Arg::Value(v)) => Ok(i128::from(v)),
            (MajorType::Negative, Arg::Value(n)) => Ok(-1 - i128::from(n)),
            _ => Err(CborError::type_mismatch(CborKind::Integer, h.major, h.offset)),
        }
    }

    /// Decode a float as `f64`. Half and single precision widen exactly.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the item is not a float.
    pub fn f64(&mut self) -> Result<f64, CborError> {
        let h = self.item_header()?;
        Self::f64_payload(h)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn f64_payload(h: Header) -> Result<f64, CborError> {
        match float_bits(&h) {
            Some((AI_U16, bits)) => Ok(f16::from_bits(bits as u16).to_f64()),
            Some((AI_U32, bits)) => Ok(f64::from(f32::from_bits(bits as u32))),
            Some((_, bits)) => Ok(f64::from_bits(bits)),
            None => Err(CborError::type_mismatch(CborKind::Float, h.major, h.offset)),
        }
    }

    /// Decode a float as `f32`.
    ///
    /// Half precision widens exactly. A double is accepted only if it narrows to `f32` without
    /// loss. For NaN that means the low 29 payload bits must be zero; sign and the remaining
    /// payload bits are kept.
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` for a lossy double and `TypeMismatch` for non-floats.
    pub fn f32(&mut self) -> Result<f32, CborError> {
        let h = self.item_header()?;
        Self::f32_payload(h)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn f32_payload(h: Header) -> Result<f32, CborError> {
        match float_bits(&h) {
            Some((AI_U16, bits)) => Ok(f16::from_bits(bits as u16).to_f32()),
            Some((AI_U32, bits)) => Ok(f32::from_bits(bits as u32)),
            Some((_, bits)) => narrow_f64(f64::from_bits(bits))
                .ok_or_else(|| CborError::new(ErrorCode::ValueOutOfRange, h.offset)),
            None => Err(CborError::type_mismatch(CborKind::Float, h.major, h.offset)),
        }
    }

    /// Decode a boolean.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the item is not `false` or `true`.
    pub fn bool(&mut self) -> Result<bool, CborError> {
        let h = self.item_header()?;
        match (h.major, h.ai) {
            (MajorType::Simple, SIMPLE_FALSE) => Ok(false),
            (MajorType::Simple, SIMPLE_TRUE) => Ok(true),
            _ => Err(CborError::type_mismatch(CborKind::Bool, h.major, h.offset)),
        }
    }

    /// Decode `null` (or `undefined`).
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for any other item.
    pub fn null(&mut self) -> Result<(), CborError> {
        let h = self.item_header()?;
        match (h.major, h.ai) {
            (MajorType::Simple, SIMPLE_NULL | SIMPLE_UNDEFINED) => Ok(()),
            _ => Err(CborError::type_mismatch(CborKind::Null, h.major, h.offset)),
        }
    }

    // ---- strings ----

    /// Decode a byte string. Definite strings borrow from the input; indefinite strings are
    /// concatenated into an owned buffer.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the item is not a byte string.
    pub fn bytes(&mut self) -> Result<Cow<'de, [u8]>, CborError> {
        let h = self.item_header()?;
        self.bytes_payload(h)
    }

    pub(crate) fn bytes_payload(&mut self, h: Header) -> Result<Cow<'de, [u8]>, CborError> {
        if h.major != MajorType::Bytes {
            return Err(CborError::type_mismatch(CborKind::Bytes, h.major, h.offset));
        }
        match h.arg {
            Arg::Value(len) => self.read_chunk(len, h.offset, MajorType::Bytes).map(Cow::Borrowed),
            Arg::Indefinite => {
                let mut out = Vec::new();
                self.read_chunks(MajorType::Bytes, |chunk, off| {
                    try_reserve(&mut out, chunk.len(), off)?;
                    out.extend_from_slice(chunk);
                    Ok(())
                })?;
                Ok(Cow::Owned(out))
            }
        }
    }

    /// Decode a text string. Definite strings borrow from the input; indefinite strings are
    /// concatenated into an owned buffer.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the item is not a text string and `InvalidUtf8` if a chunk is
    /// not valid UTF-8.
    pub fn text(&mut self) -> Result<Cow<'de, str>, CborError> {
        let h = self.item_header()?;
        self.text_payload(h)
    }

    pub(crate) fn text_payload(&mut self, h: Header) -> Result<Cow<'de, str>, CborError> {
        if h.major != MajorType::Text {
            return Err(CborError::type_mismatch(CborKind::Text, h.major, h.offset));
        }
        match h.arg {
            Arg::Value(len) => {
                let raw = self.read_chunk(len, h.offset, MajorType::Text)?;
                let payload_off = self.position() - raw.len();
                utf8::validate(raw, payload_off).map(Cow::Borrowed)
            }
            Arg::Indefinite => {
                let mut out = String::new();
                self.read_chunks(MajorType::Text, |chunk, off| {
                    let s = utf8::validate(chunk, off)?;
                    out.try_reserve(s.len())
                        .map_err(|_| CborError::new(ErrorCode::AllocationFailed, off))?;
                    out.push_str(s);
                    Ok(())
                })?;
                Ok(Cow::Owned(out))
            }
        }
    }

    fn read_chunk(&mut self, len: u64, off: usize, major: MajorType) -> Result<&'de [u8], CborError> {
        let len = len_to_usize(len, off)?;
        if len > self.cursor.remaining() {
            // Truncation is reported ahead of any size limit.
            return self.cursor.read_exact(len);
        }
        let (max, code) = match major {
            MajorType::Text => (self.limits.max_text_len, ErrorCode::TextLenLimitExceeded),
            _ => (self.limits.max_bytes_len, ErrorCode::BytesLenLimitExceeded),
        };
        if len > max {
            return Err(CborError::new(code, off));
        }
        self.cursor.read_exact(len)
    }

    /// Read definite chunks of an indefinite string until the break byte.
    fn read_chunks<F>(&mut self, major: MajorType, mut sink: F) -> Result<(), CborError>
    where
        F: FnMut(&'de [u8], usize) -> Result<(), CborError>,
    {
        let mut total = 0usize;
        loop {
            let h = self.cursor.read_header()?;
            if h.is_break() {
                return Ok(());
            }
            let Arg::Value(len) = h.arg else {
                return Err(CborError::new(ErrorCode::MalformedHeader, h.offset));
            };
            if h.major != major {
                return Err(CborError::new(ErrorCode::MalformedHeader, h.offset));
            }
            let chunk = self.read_chunk(len, h.offset, major)?;
            total = total
                .checked_add(chunk.len())
                .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, h.offset))?;
            let (max, code) = match major {
                MajorType::Text => (self.limits.max_text_len, ErrorCode::TextLenLimitExceeded),
                _ => (self.limits.max_bytes_len, ErrorCode::BytesLenLimitExceeded),
            };
            if total > max {
                return Err(CborError::new(code, h.offset));
            }
            sink(chunk, self.position() - chunk.len())?;
        }
    }

    // ---- containers ----

    /// Open an array. Returns its length, or `None` for an indefinite-length array.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the item is not an array, or a limit error.
    pub fn begin_array(&mut self) -> Result<Option<usize>, CborError> {
        let h = self.item_header()?;
        if h.major != MajorType::Array {
            return Err(CborError::type_mismatch(CborKind::Array, h.major, h.offset));
        }
        self.enter(h)
    }

    /// Open a map. Returns its number of entries, or `None` for an indefinite-length map.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the item is not a map, or a limit error.
    pub fn begin_map(&mut self) -> Result<Option<usize>, CborError> {
        let h = self.item_header()?;
        if h.major != MajorType::Map {
            return Err(CborError::type_mismatch(CborKind::Map, h.major, h.offset));
        }
        self.enter(h)
    }

    /// Push a frame for an array or map header that was already read.
    pub(crate) fn enter(&mut self, h: Header) -> Result<Option<usize>, CborError> {
        if self.frames.len() >= self.limits.max_depth {
            return Err(CborError::new(ErrorCode::DepthLimitExceeded, h.offset));
        }
        let len = match h.arg {
            Arg::Value(len) => Some(len_to_usize(len, h.offset)?),
            Arg::Indefinite => None,
        };
        let declared = match (h.major, len) {
            (_, None) => None,
            (MajorType::Map, Some(len)) => {
                if len > self.limits.max_map_len {
                    return Err(CborError::new(ErrorCode::MapLenLimitExceeded, h.offset));
                }
                let items = len
                    .checked_mul(2)
                    .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, h.offset))?;
                self.bump_items(items, h.offset)?;
                Some(items as u64)
            }
            (_, Some(len)) => {
                if len > self.limits.max_array_len {
                    return Err(CborError::new(ErrorCode::ArrayLenLimitExceeded, h.offset));
                }
                self.bump_items(len, h.offset)?;
                Some(len as u64)
            }
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(offset = h.offset, major = h.major.bits(), len = ?len, "enter container");

        self.frames.push(Frame {
            major: h.major,
            declared,
            read: 0,
        });
        Ok(len)
    }

    /// Returns `true` if the innermost open container has another item to read.
    ///
    /// With no open container, returns `true` while input remains.
    ///
    /// # Errors
    ///
    /// Returns `TruncatedStructure` if an indefinite container runs out of input.
    pub fn has_next(&self) -> Result<bool, CborError> {
        let Some(frame) = self.frames.last() else {
            return Ok(!self.cursor.is_at_end());
        };
        match frame.declared {
            Some(n) => Ok(frame.read < n),
            None => {
                if self.cursor.is_at_end() {
                    return Err(self.truncated(frame));
                }
                Ok(self.cursor.peek_u8()? != BREAK)
            }
        }
    }

    /// Close the innermost open array.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedContainer` if the innermost container is not an array and
    /// `LengthMismatch` if children remain unread.
    pub fn end_array(&mut self) -> Result<(), CborError> {
        self.exit(MajorType::Array)
    }

    /// Close the innermost open map.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedContainer` if the innermost container is not a map and
    /// `LengthMismatch` if entries remain unread.
    pub fn end_map(&mut self) -> Result<(), CborError> {
        self.exit(MajorType::Map)
    }

    fn exit(&mut self, major: MajorType) -> Result<(), CborError> {
        let frame = match self.frames.last() {
            Some(frame) if frame.major == major => *frame,
            _ => return Err(self.err(ErrorCode::UnbalancedContainer)),
        };
        match frame.declared {
            Some(declared) if frame.read != declared => {
                return Err(CborError::length(
                    ErrorCode::LengthMismatch,
                    declared,
                    frame.read,
                    self.position(),
                ));
            }
            Some(_) => {}
            None => {
                if self.cursor.is_at_end() {
                    return Err(self.truncated(&frame));
                }
                if self.cursor.peek_u8()? != BREAK {
                    return Err(self.err(ErrorCode::LengthMismatch));
                }
                if major == MajorType::Map && frame.read % 2 != 0 {
                    return Err(self.err(ErrorCode::MalformedHeader));
                }
                self.cursor.read_u8()?;
            }
        }
        self.frames.pop();
        Ok(())
    }

    /// Skip the next item, including all nested content.
    ///
    /// # Errors
    ///
    /// Returns any error that reading the item would produce.
    pub fn skip_value(&mut self) -> Result<(), CborError> {
        let h = self.item_header()?;
        self.skip_payload(h)
    }

    pub(crate) fn skip_payload(&mut self, h: Header) -> Result<(), CborError> {
        let h = self.skip_tags(h)?;
        match h.major {
            MajorType::Unsigned | MajorType::Negative | MajorType::Simple | MajorType::Tag => {
                Ok(())
            }
            MajorType::Bytes | MajorType::Text => match h.arg {
                Arg::Value(len) => self.read_chunk(len, h.offset, h.major).map(|_| ()),
                Arg::Indefinite => self.read_chunks(h.major, |_, _| Ok(())),
            },
            MajorType::Array | MajorType::Map => {
                self.enter(h)?;
                while self.has_next()? {
                    self.skip_value()?;
                }
                self.exit(h.major)
            }
        }
    }

    /// Decode a record whose field names are `fields`, in declaration order.
    ///
    /// The layout is recognised from the input: an array is read positionally (element `i` goes
    /// to field `i`, surplus elements are skipped), a map is read by text key (unknown keys are
    /// skipped). `f` is called once per matched field with its index and must consume exactly
    /// one item.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the item is neither an array nor a map, or any error from `f`.
    pub fn record<F>(&mut self, fields: &[&str], mut f: F) -> Result<(), CborError>
    where
        F: FnMut(usize, &mut Self) -> Result<(), CborError>,
    {
        let h = self.item_header()?;
        match h.major {
            MajorType::Array => {
                self.enter(h)?;
                let mut idx = 0;
                while self.has_next()? {
                    if idx < fields.len() {
                        f(idx, self)?;
                    } else {
                        self.skip_value()?;
                    }
                    idx += 1;
                }
                self.end_array()
            }
            MajorType::Map => {
                self.enter(h)?;
                while self.has_next()? {
                    let key_header = self.item_header()?;
                    if key_header.major != MajorType::Text {
                        self.skip_payload(key_header)?;
                        self.skip_value()?;
                        continue;
                    }
                    let key = self.text_payload(key_header)?;
                    match fields.iter().position(|name| *name == key) {
                        Some(idx) => f(idx, self)?,
                        None => self.skip_value()?,
                    }
                }
                self.end_map()
            }
            _ => Err(CborError::type_mismatch(CborKind::Array, h.major, h.offset)),
        }
    }
}

/// Narrow a double to single precision if no bits are lost.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn narrow_f64(d: f64) -> Option<f32> {
    if d.is_nan() {
        let bits = d.to_bits();
        let payload = bits & ((1 << 52) - 1);
        if payload & ((1 << 29) - 1) != 0 {
            return None;
        }
        let sign = ((bits >> 63) as u32) << 31;
        return Some(f32::from_bits(sign | 0x7f80_0000 | (payload >> 29) as u32));
    }
    let f = d as f32;
    (f64::from(f) == d).then_some(f)
}

fn float_bits(h: &Header) -> Option<(u8, u64)> {
    match (h.major, h.ai, h.arg) {
        (MajorType::Simple, ai @ (AI_U16 | AI_U32 | AI_U64), Arg::Value(bits)) => Some((ai, bits)),
        _ => None,
    }
}
