use core::fmt;

use crate::wire::{CborKind, MajorType};

/// A structured error code identifying the reason an encode or decode call failed.
///
/// This enum is intentionally stable and string-free so it stays cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Reserved additional-info value (28..30), an indefinite-length marker on a major type that
    /// does not allow it, or a malformed indefinite-length string chunk.
    MalformedHeader,
    /// Fewer bytes are available than a header declares.
    UnexpectedEndOfInput,
    /// An array or map ended before its declared number of entries was read.
    TruncatedStructure,
    /// An integer or float does not fit the requested width.
    ValueOutOfRange,
    /// The walker requested a read inconsistent with the header's major type.
    TypeMismatch,

    /// Text string payload is not valid UTF-8.
    InvalidUtf8,
    /// Arithmetic overflow while computing a length or offset.
    LengthOverflow,
    /// Memory allocation failed while decoding into owned structures.
    AllocationFailed,
    /// Input contains bytes after the decoded item and trailing bytes were denied.
    TrailingBytes,
    /// A container was closed with a different number of items than declared.
    LengthMismatch,
    /// `end_array`/`end_map` without a matching open container of that kind.
    UnbalancedContainer,
    /// A decoded map contains the same key twice.
    DuplicateMapKey,
    /// A record is missing a required field.
    MissingField,

    /// Input exceeds the configured maximum message size.
    MessageLenLimitExceeded,
    /// Nesting depth limit exceeded.
    DepthLimitExceeded,
    /// Total items limit exceeded.
    TotalItemsLimitExceeded,
    /// Array length exceeds limits.
    ArrayLenLimitExceeded,
    /// Map length exceeds limits.
    MapLenLimitExceeded,
    /// Byte string length exceeds limits.
    BytesLenLimitExceeded,
    /// Text string length exceeds limits.
    TextLenLimitExceeded,

    /// A serde data structure reported a custom error.
    Serde,
}

impl ErrorCode {
    const fn message(self) -> &'static str {
        match self {
            Self::MalformedHeader => "malformed header",
            Self::UnexpectedEndOfInput => "unexpected end of input",
            Self::TruncatedStructure => "structure truncated before its declared length",
            Self::ValueOutOfRange => "value out of range for the requested type",
            Self::TypeMismatch => "type mismatch",

            Self::InvalidUtf8 => "text must be valid UTF-8",
            Self::LengthOverflow => "length overflow",
            Self::AllocationFailed => "allocation failed",
            Self::TrailingBytes => "trailing bytes after CBOR item",
            Self::LengthMismatch => "container length mismatch",
            Self::UnbalancedContainer => "unbalanced container end",
            Self::DuplicateMapKey => "duplicate map key",
            Self::MissingField => "missing record field",

            Self::MessageLenLimitExceeded => "input exceeds maximum message size",
            Self::DepthLimitExceeded => "nesting depth limit exceeded",
            Self::TotalItemsLimitExceeded => "total items limit exceeded",
            Self::ArrayLenLimitExceeded => "array length exceeds decode limits",
            Self::MapLenLimitExceeded => "map length exceeds decode limits",
            Self::BytesLenLimitExceeded => "byte string length exceeds decode limits",
            Self::TextLenLimitExceeded => "text string length exceeds decode limits",

            Self::Serde => "serde error",
        }
    }
}

/// Extra context attached to a [`CborError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorDetail {
    /// No further context.
    #[default]
    None,
    /// The walker asked for `expected` but the header carried `found`.
    Type {
        /// Kind requested by the caller.
        expected: CborKind,
        /// Major type found in the input.
        found: MajorType,
    },
    /// A declared length disagreed with what was actually available or consumed.
    Length {
        /// Length declared by a header (items for containers, bytes otherwise).
        declared: u64,
        /// Length actually available or consumed.
        actual: u64,
    },
}

/// A codec error with a stable code, the byte offset where it was detected, and optional detail.
///
/// For decode errors `offset` points into the input. For encode errors it is the length of the
/// output buffer at the time of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CborError {
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset where the error was detected.
    pub offset: usize,
    /// Expected vs. actual context, when known.
    pub detail: ErrorDetail,
}

impl CborError {
    /// Construct an error at `offset` without detail.
    #[inline]
    #[must_use]
    pub const fn new(code: ErrorCode, offset: usize) -> Self {
        Self {
            code,
            offset,
            detail: ErrorDetail::None,
        }
    }

    /// Construct a `TypeMismatch` error.
    #[inline]
    #[must_use]
    pub const fn type_mismatch(expected: CborKind, found: MajorType, offset: usize) -> Self {
        Self {
            code: ErrorCode::TypeMismatch,
            offset,
            detail: ErrorDetail::Type { expected, found },
        }
    }

    /// Construct an error carrying declared vs. actual lengths.
    #[inline]
    #[must_use]
    pub const fn length(code: ErrorCode, declared: u64, actual: u64, offset: usize) -> Self {
        Self {
            code,
            offset,
            detail: ErrorDetail::Length { declared, actual },
        }
    }

    /// Returns true iff this error was raised by a serde data structure rather than the codec.
    #[inline]
    #[must_use]
    pub const fn is_serde(self) -> bool {
        matches!(self.code, ErrorCode::Serde)
    }
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cbor error at {}: {}", self.offset, self.code.message())?;
        match self.detail {
            ErrorDetail::None => Ok(()),
            ErrorDetail::Type { expected, found } => {
                write!(f, " (expected {expected}, found {found})")
            }
            ErrorDetail::Length { declared, actual } => {
                write!(f, " (declared {declared}, actual {actual})")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CborError {}

#[cfg(feature = "serde")]
impl serde::ser::Error for CborError {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self::new(ErrorCode::Serde, 0)
    }
}

#[cfg(feature = "serde")]
impl serde::de::Error for CborError {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self::new(ErrorCode::Serde, 0)
    }

    fn missing_field(_field: &'static str) -> Self {
        Self::new(ErrorCode::MissingField, 0)
    }

    fn invalid_length(_len: usize, _exp: &dyn serde::de::Expected) -> Self {
        Self::new(ErrorCode::LengthMismatch, 0)
    }
}
