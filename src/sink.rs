//! Append-only output buffer and the CBOR header writer.

use alloc::vec::Vec;

use crate::alloc_util::try_reserve;
use crate::wire::{MajorType, AI_INDEFINITE, AI_U16, AI_U32, AI_U64, AI_U8, BREAK};
use crate::{CborError, ErrorCode};

pub(crate) trait Sink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), CborError>;

    fn write_u8(&mut self, byte: u8) -> Result<(), CborError> {
        self.write(&[byte])
    }

    fn position(&self) -> usize;
}

pub(crate) struct VecSink {
    buf: Vec<u8>,
}

impl VecSink {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = Vec::new();
        let _ = buf.try_reserve(capacity);
        Self { buf }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    #[inline]
    pub fn reserve(&mut self, additional: usize) -> Result<(), CborError> {
        let available = self.buf.capacity().saturating_sub(self.buf.len());
        if additional <= available {
            return Ok(());
        }
        let offset = self.buf.len();
        try_reserve(&mut self.buf, additional, offset)
    }
}

impl Sink for VecSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), CborError> {
        self.reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn write_u8(&mut self, byte: u8) -> Result<(), CborError> {
        if self.buf.len() == self.buf.capacity() {
            self.reserve(1)?;
        }
        self.buf.push(byte);
        Ok(())
    }

    fn position(&self) -> usize {
        self.buf.len()
    }
}

/// Write a header with the smallest argument width that holds `value`.
pub(crate) fn write_header<S: Sink>(
    sink: &mut S,
    major: MajorType,
    value: u64,
) -> Result<(), CborError> {
    let mt = major.bits() << 5;
    if let Ok(v8) = u8::try_from(value) {
        if v8 < AI_U8 {
            return sink.write_u8(mt | v8);
        }
        return sink.write(&[mt | AI_U8, v8]);
    }
    if let Ok(v16) = u16::try_from(value) {
        let [a, b] = v16.to_be_bytes();
        return sink.write(&[mt | AI_U16, a, b]);
    }
    if let Ok(v32) = u32::try_from(value) {
        let mut buf = [mt | AI_U32, 0, 0, 0, 0];
        buf[1..].copy_from_slice(&v32.to_be_bytes());
        return sink.write(&buf);
    }
    let mut buf = [mt | AI_U64, 0, 0, 0, 0, 0, 0, 0, 0];
    buf[1..].copy_from_slice(&value.to_be_bytes());
    sink.write(&buf)
}

pub(crate) fn write_len<S: Sink>(
    sink: &mut S,
    major: MajorType,
    len: usize,
) -> Result<(), CborError> {
    let len = u64::try_from(len)
        .map_err(|_| CborError::new(ErrorCode::LengthOverflow, sink.position()))?;
    write_header(sink, major, len)
}

/// Write the indefinite-length marker for `major` (2..=5).
pub(crate) fn write_indefinite<S: Sink>(sink: &mut S, major: MajorType) -> Result<(), CborError> {
    sink.write_u8((major.bits() << 5) | AI_INDEFINITE)
}

pub(crate) fn write_break<S: Sink>(sink: &mut S) -> Result<(), CborError> {
    sink.write_u8(BREAK)
}
