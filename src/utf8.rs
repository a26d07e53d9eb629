#[cfg(feature = "simdutf8")]
use simdutf8::basic as simd_utf8;

use crate::{CborError, ErrorCode};

/// Validates UTF-8 bytes and returns a borrowed `&str` on success.
///
/// `offset` is the position of the text payload, reported on failure.
#[inline]
pub fn validate(bytes: &[u8], offset: usize) -> Result<&str, CborError> {
    #[cfg(feature = "simdutf8")]
    let res = simd_utf8::from_utf8(bytes).map_err(|_| ());

    #[cfg(not(feature = "simdutf8"))]
    let res = core::str::from_utf8(bytes).map_err(|_| ());

    res.map_err(|()| CborError::new(ErrorCode::InvalidUtf8, offset))
}
