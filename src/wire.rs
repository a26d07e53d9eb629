//! Byte source and CBOR header reader.

use core::fmt;

use crate::{CborError, ErrorCode};

/// Additional-info value selecting a 1-byte argument.
pub(crate) const AI_U8: u8 = 24;
/// Additional-info value selecting a 2-byte argument (half float for major 7).
pub(crate) const AI_U16: u8 = 25;
/// Additional-info value selecting a 4-byte argument (single float for major 7).
pub(crate) const AI_U32: u8 = 26;
/// Additional-info value selecting an 8-byte argument (double float for major 7).
pub(crate) const AI_U64: u8 = 27;
/// Indefinite length marker, or the break stop code for major 7.
pub(crate) const AI_INDEFINITE: u8 = 31;

pub(crate) const SIMPLE_FALSE: u8 = 20;
pub(crate) const SIMPLE_TRUE: u8 = 21;
pub(crate) const SIMPLE_NULL: u8 = 22;
pub(crate) const SIMPLE_UNDEFINED: u8 = 23;

/// The break stop code terminating indefinite-length items.
pub(crate) const BREAK: u8 = 0xff;

/// The eight CBOR major types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorType {
    /// Major type 0.
    Unsigned,
    /// Major type 1, value is `-1 - argument`.
    Negative,
    /// Major type 2.
    Bytes,
    /// Major type 3.
    Text,
    /// Major type 4.
    Array,
    /// Major type 5.
    Map,
    /// Major type 6.
    Tag,
    /// Major type 7: floats and simple values.
    Simple,
}

impl MajorType {
    /// Decode the major type from the top three bits of an initial byte.
    #[inline]
    #[must_use]
    pub const fn from_initial_byte(ib: u8) -> Self {
        match ib >> 5 {
            0 => Self::Unsigned,
            1 => Self::Negative,
            2 => Self::Bytes,
            3 => Self::Text,
            4 => Self::Array,
            5 => Self::Map,
            6 => Self::Tag,
            _ => Self::Simple,
        }
    }

    /// The numeric major type, 0..=7.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Unsigned => 0,
            Self::Negative => 1,
            Self::Bytes => 2,
            Self::Text => 3,
            Self::Array => 4,
            Self::Map => 5,
            Self::Tag => 6,
            Self::Simple => 7,
        }
    }

    const fn allows_indefinite(self) -> bool {
        matches!(self, Self::Bytes | Self::Text | Self::Array | Self::Map)
    }
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unsigned => "unsigned integer",
            Self::Negative => "negative integer",
            Self::Bytes => "byte string",
            Self::Text => "text string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Tag => "tag",
            Self::Simple => "simple/float",
        };
        write!(f, "{name} (major {})", self.bits())
    }
}

/// The logical kind of a data item, as requested by a walker or reported by a peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CborKind {
    /// Major type 0 or 1.
    Integer,
    /// Half, single or double precision float.
    Float,
    /// `false` or `true`.
    Bool,
    /// `null` or `undefined`.
    Null,
    /// Byte string.
    Bytes,
    /// Text string.
    Text,
    /// Array.
    Array,
    /// Map.
    Map,
    /// Tagged item.
    Tag,
    /// Any other simple value, or a break stop code.
    Simple,
}

impl fmt::Display for CborKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Null => "null",
            Self::Bytes => "byte string",
            Self::Text => "text string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Tag => "tag",
            Self::Simple => "simple value",
        };
        f.write_str(name)
    }
}

/// The argument carried by a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    /// Inline or extended value. For floats this is the raw bit pattern.
    Value(u64),
    /// Indefinite length (majors 2..=5), or break (major 7).
    Indefinite,
}

/// A decoded data item header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Major type.
    pub major: MajorType,
    /// Raw additional info, 0..=31.
    pub ai: u8,
    /// Decoded argument.
    pub arg: Arg,
    /// Offset of the initial byte.
    pub offset: usize,
}

impl Header {
    /// Returns `true` iff this header is the break stop code.
    #[inline]
    #[must_use]
    pub const fn is_break(&self) -> bool {
        matches!(self.major, MajorType::Simple) && self.ai == AI_INDEFINITE
    }

    /// Classify the header into a [`CborKind`].
    #[must_use]
    pub const fn kind(&self) -> CborKind {
        match self.major {
            MajorType::Unsigned | MajorType::Negative => CborKind::Integer,
            MajorType::Bytes => CborKind::Bytes,
            MajorType::Text => CborKind::Text,
            MajorType::Array => CborKind::Array,
            MajorType::Map => CborKind::Map,
            MajorType::Tag => CborKind::Tag,
            MajorType::Simple => match self.ai {
                SIMPLE_FALSE | SIMPLE_TRUE => CborKind::Bool,
                SIMPLE_NULL | SIMPLE_UNDEFINED => CborKind::Null,
                AI_U16 | AI_U32 | AI_U64 => CborKind::Float,
                _ => CborKind::Simple,
            },
        }
    }
}

/// Cursor-based reader over an in-memory input buffer. The cursor only advances.
#[derive(Clone, Copy)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub const fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_u8(&self) -> Result<u8, CborError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| CborError::new(ErrorCode::UnexpectedEndOfInput, self.pos))
    }

    pub fn read_u8(&mut self) -> Result<u8, CborError> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], CborError> {
        let off = self.pos;
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, off))?;
        if end > self.data.len() {
            return Err(CborError::length(
                ErrorCode::UnexpectedEndOfInput,
                n as u64,
                self.remaining() as u64,
                off,
            ));
        }
        let s = &self.data[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    pub fn read_be_u16(&mut self) -> Result<u16, CborError> {
        let s = self.read_exact(2)?;
        Ok(u16::from_be_bytes([s[0], s[1]]))
    }

    pub fn read_be_u32(&mut self) -> Result<u32, CborError> {
        let s = self.read_exact(4)?;
        Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn read_be_u64(&mut self) -> Result<u64, CborError> {
        let s = self.read_exact(8)?;
        Ok(u64::from_be_bytes([
            s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7],
        ]))
    }

    /// Read one header. Non-minimal arguments are accepted.
    pub fn read_header(&mut self) -> Result<Header, CborError> {
        let offset = self.pos;
        let ib = self.read_u8()?;
        let major = MajorType::from_initial_byte(ib);
        let ai = ib & 0x1f;
        let arg = match ai {
            0..=23 => Arg::Value(u64::from(ai)),
            AI_U8 => Arg::Value(u64::from(self.read_u8()?)),
            AI_U16 => Arg::Value(u64::from(self.read_be_u16()?)),
            AI_U32 => Arg::Value(u64::from(self.read_be_u32()?)),
            AI_U64 => Arg::Value(self.read_be_u64()?),
            AI_INDEFINITE if major.allows_indefinite() || matches!(major, MajorType::Simple) => {
                Arg::Indefinite
            }
            _ => return Err(CborError::new(ErrorCode::MalformedHeader, offset)),
        };
        Ok(Header {
            major,
            ai,
            arg,
            offset,
        })
    }
}

pub(crate) fn len_to_usize(len: u64, off: usize) -> Result<usize, CborError> {
    usize::try_from(len).map_err(|_| CborError::new(ErrorCode::LengthOverflow, off))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_additional_info_is_malformed() {
        for ai in 28..=30u8 {
            let bytes = [ai];
            let err = Cursor::new(&bytes).read_header().unwrap_err();
            assert_eq!(err.code, ErrorCode::MalformedHeader);
            assert_eq!(err.offset, 0);
        }
    }

    #[test]
    fn indefinite_only_for_strings_and_containers() {
        for ib in [0x5f, 0x7f, 0x9f, 0xbf, 0xff] {
            let bytes = [ib];
            let h = Cursor::new(&bytes).read_header().unwrap();
            assert_eq!(h.arg, Arg::Indefinite);
        }
        for ib in [0x1f, 0x3f, 0xdf] {
            let bytes = [ib];
            let err = Cursor::new(&bytes).read_header().unwrap_err();
            assert_eq!(err.code, ErrorCode::MalformedHeader);
        }
    }

    #[test]
    fn extended_argument_widths() {
        let bytes = [0x1b, 0, 0, 0, 1, 0, 0, 0, 0];
        let h = Cursor::new(&bytes).read_header().unwrap();
        assert_eq!(h.arg, Arg::Value(1 << 32));

        let bytes = [0x19, 0x01];
        let err = Cursor::new(&bytes).read_header().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedEndOfInput);
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn peek_does_not_consume() {
        let bytes = [0xf6];
        let mut c = Cursor::new(&bytes);
        assert_eq!(c.peek_u8().unwrap(), 0xf6);
        assert_eq!(c.position(), 0);
        assert_eq!(c.read_u8().unwrap(), 0xf6);
        assert!(c.is_at_end());
    }
}
