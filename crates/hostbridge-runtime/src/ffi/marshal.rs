//! Text marshaling - UTF-16 managed text to UTF-8 bytes
//!
//! The managed side stores text as UTF-16 code units; every transfer
//! strategy except the pinned handle hands out UTF-8. This module owns:
//! - buffer sizing (`max_utf8_len`, `utf8_len`, `required_len`)
//! - transcoding straight into foreign memory (`encode_utf8_into`)
//!
//! Unpaired surrogates are replaced with U+FFFD, which is always three
//! bytes, so sizing and encoding agree on every input.

use crate::error::{BoundaryError, BoundaryResult};
use hostbridge_config::SizePolicy;
use std::char::{decode_utf16, REPLACEMENT_CHARACTER};
use std::ptr;

/// Decode UTF-16 units, replacing unpaired surrogates
pub fn decode_lossy(units: &[u16]) -> impl Iterator<Item = char> + '_ {
    decode_utf16(units.iter().copied()).map(|r| r.unwrap_or(REPLACEMENT_CHARACTER))
}

/// Worst-case UTF-8 byte count for `units` UTF-16 code units, `(n + 1) * 3`
///
/// # Examples
///
/// ```
/// # use hostbridge_runtime::ffi::marshal::max_utf8_len;
/// assert_eq!(max_utf8_len(4).unwrap(), 15);
/// ```
pub fn max_utf8_len(units: usize) -> BoundaryResult<usize> {
    units
        .checked_add(1)
        .and_then(|n| n.checked_mul(3))
        .ok_or(BoundaryError::LengthOverflow(units))
}

/// Exact UTF-8 byte count of the lossy decoding of `units`
pub fn utf8_len(units: &[u16]) -> usize {
    decode_lossy(units).map(char::len_utf8).sum()
}

/// Bytes to request from an allocator under the given policy
pub fn required_len(units: &[u16], policy: SizePolicy) -> BoundaryResult<usize> {
    match policy {
        SizePolicy::WorstCase => max_utf8_len(units.len()),
        SizePolicy::Exact => Ok(utf8_len(units)),
    }
}

/// Element count as the managed side's 32-bit signed length
pub fn managed_len(len: usize) -> BoundaryResult<i32> {
    i32::try_from(len).map_err(|_| BoundaryError::LengthOverflow(len))
}

/// Transcode `units` into `capacity` bytes at `dst`, returning bytes written
///
/// Nothing is written when the encoded text does not fit.
///
/// # Safety
///
/// `dst` must be valid for writes of `capacity` bytes (it may be null only
/// when `capacity` is zero) and must not overlap `units`.
pub unsafe fn encode_utf8_into(
    units: &[u16],
    dst: *mut u8,
    capacity: usize,
) -> BoundaryResult<usize> {
    let required = utf8_len(units);
    if required > capacity {
        return Err(BoundaryError::CapacityExceeded { capacity, required });
    }

    let mut written = 0;
    let mut scratch = [0u8; 4];
    for ch in decode_lossy(units) {
        let encoded = ch.encode_utf8(&mut scratch);
        ptr::copy_nonoverlapping(encoded.as_ptr(), dst.add(written), encoded.len());
        written += encoded.len();
    }
    debug_assert_eq!(written, required);
    Ok(written)
}
