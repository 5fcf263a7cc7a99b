//! Caller-copy-callback strategy
//!
//! The managed side calls back into the registered native copier, which
//! allocates a C string the native side owns from then on.

use crate::error::BoundaryResult;
use crate::ffi::callbacks::StringCopier;
use crate::ffi::safety::{foreign_len, guarded, ForeignView};
use crate::managed::ManagedString;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Managed side: copy `text` out through `copier`
pub fn text_via_copier(
    text: &ManagedString,
    copier: &(impl StringCopier + ?Sized),
) -> BoundaryResult<*mut c_char> {
    copier.copy_utf16(text.units())
}

/// Native side: the copier registered with the managed side
///
/// Returns a string from `CString::into_raw`, or null when the text holds an
/// interior NUL or the input is invalid.
///
/// # Safety
///
/// `units` must point to `len` readable UTF-16 units for the duration of the call.
pub unsafe extern "system" fn copy_to_c_string(units: *const u16, len: i32) -> *mut c_char {
    guarded("copy_to_c_string", ptr::null_mut(), || {
        let view = ForeignView::from_raw(units, foreign_len(len)?)?;
        let text = String::from_utf16_lossy(&view);
        Ok(CString::new(text).map_or(ptr::null_mut(), CString::into_raw))
    })
}

/// Native side: take ownership of a string produced by [`copy_to_c_string`]
///
/// # Safety
///
/// `ptr` must be null or come from `copy_to_c_string` and not be taken twice.
pub unsafe fn take_c_string(ptr: *mut c_char) -> Option<CString> {
    if ptr.is_null() {
        None
    } else {
        Some(CString::from_raw(ptr))
    }
}
