use alloc::string::String;
use alloc::vec::Vec;
use core::alloc::Layout;

use crate::{CborError, ErrorCode};

#[inline]
fn check_reserve_len<T>(len: usize, additional: usize, offset: usize) -> Result<usize, CborError> {
    let needed = len
        .checked_add(additional)
        .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, offset))?;
    Layout::array::<T>(needed).map_err(|_| CborError::new(ErrorCode::LengthOverflow, offset))?;
    Ok(needed)
}

#[inline]
pub fn try_reserve<T>(v: &mut Vec<T>, additional: usize, offset: usize) -> Result<(), CborError> {
    let needed = check_reserve_len::<T>(v.len(), additional, offset)?;
    if needed <= v.capacity() {
        return Ok(());
    }
    v.try_reserve(additional)
        .map_err(|_| CborError::new(ErrorCode::AllocationFailed, offset))
}

/// Allocate a vector for `cap` elements whose count came from the wire.
///
/// The capacity is clamped to `max_hint` so a lying header cannot force a huge allocation before
/// any element has actually been read.
#[inline]
pub fn try_vec_with_capacity<T>(
    cap: usize,
    max_hint: usize,
    offset: usize,
) -> Result<Vec<T>, CborError> {
    let mut v: Vec<T> = Vec::new();
    try_reserve(&mut v, cap.min(max_hint), offset)?;
    Ok(v)
}

#[inline]
pub fn try_vec_from_slice(bytes: &[u8], offset: usize) -> Result<Vec<u8>, CborError> {
    let mut v = Vec::new();
    try_reserve(&mut v, bytes.len(), offset)?;
    v.extend_from_slice(bytes);
    Ok(v)
}

#[inline]
pub fn try_string_from_str(s: &str, offset: usize) -> Result<String, CborError> {
    let mut out = String::new();
    check_reserve_len::<u8>(0, s.len(), offset)?;
    out.try_reserve_exact(s.len())
        .map_err(|_| CborError::new(ErrorCode::AllocationFailed, offset))?;
    out.push_str(s);
    Ok(out)
}
