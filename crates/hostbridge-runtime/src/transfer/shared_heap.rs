//! Callee-heap-allocate strategy
//!
//! The managed side allocates a NUL-terminated UTF-8 copy on the shared heap
//! and hands out the pointer. The native side owns it from then on and must
//! give it back through the paired free entry point, exactly once.
//!
//! The native side finds the end by the terminator, so text holding a NUL is
//! refused rather than handed out truncated.

use crate::buffer::ForeignBuffer;
use crate::error::{BoundaryError, BoundaryResult};
use crate::ffi::marshal::required_len;
use crate::ffi::types::Owner;
use crate::heap::SharedHeap;
use crate::managed::ManagedString;
use hostbridge_config::SizePolicy;
use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::ptr::NonNull;

/// Paired release entry point for heap strings
pub type FreeSharedHeapFn = unsafe extern "system" fn(*mut u8);

/// Managed side: copy `text` onto `heap` and transfer it to the caller
pub fn text_into_shared_heap(
    text: &ManagedString,
    heap: &SharedHeap,
    policy: SizePolicy,
) -> BoundaryResult<*mut u8> {
    if let Some(position) = text.units().iter().position(|&unit| unit == 0) {
        return Err(BoundaryError::InteriorNul { position });
    }
    let required = required_len(text.units(), policy)?;
    let mut buffer = ForeignBuffer::allocate(heap, required, Owner::Callee)?;

    if let Err(err) = buffer.fill_utf16(text.units()) {
        // Not handed out yet, so the callee still owns it
        if let Err((_, release_err)) = unsafe { buffer.release(heap, Owner::Callee) } {
            return Err(release_err);
        }
        return Err(err);
    }

    let raw = buffer.into_raw();
    // SharedHeap reserves one byte past capacity for the terminator
    unsafe { raw.data.add(raw.len).write(0) };
    Ok(raw.data)
}

/// Native side: a heap string that is freed through the paired entry point on drop
pub struct SharedHeapString {
    ptr: NonNull<c_char>,
    free: FreeSharedHeapFn,
}

impl SharedHeapString {
    /// Take ownership of a pointer returned by the heap strategy
    ///
    /// Returns `None` for the null sentinel.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live, NUL-terminated heap string that `free`
    /// releases, and must not be owned by anything else.
    pub unsafe fn from_raw(ptr: *mut u8, free: FreeSharedHeapFn) -> Option<Self> {
        NonNull::new(ptr.cast::<c_char>()).map(|ptr| Self { ptr, free })
    }

    pub fn as_c_str(&self) -> &CStr {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.as_c_str().to_bytes()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr().cast()
    }

    pub fn to_str(&self) -> BoundaryResult<&str> {
        self.as_c_str()
            .to_str()
            .map_err(|_| BoundaryError::InvalidUtf8)
    }
}

impl fmt::Debug for SharedHeapString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedHeapString")
            .field(&self.as_c_str())
            .finish()
    }
}

impl Drop for SharedHeapString {
    fn drop(&mut self) {
        unsafe { (self.free)(self.ptr.as_ptr().cast()) };
    }
}
