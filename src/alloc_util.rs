use core::alloc::Layout;

use crate::{CborError, ErrorCode};

#[inline]
fn check_reserve_len<T>(len: usize, additional: usize, offset: usize) -> Result<(), CborError> {
    let needed = len
        .checked_add(additional)
        .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, offset))?;
    Layout::array::<T>(needed).map_err(|_| CborError::new(ErrorCode::LengthOverflow, offset))?;
    Ok(())
}

#[inline]
pub fn try_reserve_exact<T>(
    v: &mut Vec<T>,
    additional: usize,
    offset: usize,
) -> Result<(), CborError> {
    let needed = v
        .len()
        .checked_add(additional)
        .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, offset))?;
    if needed <= v.capacity() {
        return Ok(());
    }
    check_reserve_len::<T>(v.len(), additional, offset)?;
    v.try_reserve_exact(additional)
        .map_err(|_| CborError::new(ErrorCode::AllocationFailed, offset))
}

#[inline]
pub fn try_reserve<T>(v: &mut Vec<T>, additional: usize, offset: usize) -> Result<(), CborError> {
    let needed = v
        .len()
        .checked_add(additional)
        .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, offset))?;
    if needed <= v.capacity() {
        return Ok(());
    }
    check_reserve_len::<T>(v.len(), additional, offset)?;
    v.try_reserve(additional)
        .map_err(|_| CborError::new(ErrorCode::AllocationFailed, offset))
}

#[inline]
pub fn try_vec_from_slice(bytes: &[u8], offset: usize) -> Result<Vec<u8>, CborError> {
    let mut v = Vec::new();
    try_reserve_exact(&mut v, bytes.len(), offset)?;
    v.extend_from_slice(bytes);
    Ok(v)
}

/// Reserve for `declared` items, but never more than `remaining` input bytes could encode.
///
/// Every item occupies at least one byte, so a length field larger than the rest of the input is
/// not trusted for the initial reservation.
#[inline]
pub fn try_vec_for_items<T>(
    declared: usize,
    remaining: usize,
    offset: usize,
) -> Result<Vec<T>, CborError> {
    let mut v: Vec<T> = Vec::new();
    try_reserve_exact(&mut v, declared.min(remaining), offset)?;
    Ok(v)
}
