//! Safe wrappers for common FFI patterns
//!
//! Provides null checks, non-owning views over foreign memory, and the guard
//! every exported entry point runs its body through.

use crate::error::{abort_boundary, BoundaryError, BoundaryResult};
use std::marker::PhantomData;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, trace};

/// Null pointer check naming the offending argument
pub fn check_null<T>(ptr: *const T, what: &'static str) -> BoundaryResult<*const T> {
    if ptr.is_null() {
        Err(BoundaryError::NullPointer(what))
    } else {
        Ok(ptr)
    }
}

/// Mutable null pointer check naming the offending argument
pub fn check_null_mut<T>(ptr: *mut T, what: &'static str) -> BoundaryResult<*mut T> {
    if ptr.is_null() {
        Err(BoundaryError::NullPointer(what))
    } else {
        Ok(ptr)
    }
}

/// Convert a signed element count received from the peer
pub fn foreign_len(len: i32) -> BoundaryResult<usize> {
    usize::try_from(len).map_err(|_| BoundaryError::NegativeLength(len.into()))
}

/// Read-only, non-owning view over memory owned by the other side
///
/// The view borrows nothing on the Rust side, so the lifetime is chosen by the
/// caller of [`ForeignView::from_raw`]. At the boundary it never outlives the
/// call that received the pointer.
pub struct ForeignView<'a, T> {
    ptr: *const T,
    len: usize,
    _marker: PhantomData<&'a [T]>,
}

impl<'a, T> ForeignView<'a, T> {
    /// Create a view with null and bounds checking
    ///
    /// A null pointer is accepted only when `len` is zero.
    ///
    /// # Safety
    ///
    /// When `len > 0`, `ptr` must point to `len` initialized, properly aligned
    /// elements that stay valid and unmodified for `'a`.
    pub unsafe fn from_raw(ptr: *const T, len: usize) -> BoundaryResult<Self> {
        if len > 0 {
            check_null(ptr, "view data")?;
            debug_assert_eq!(ptr as usize % std::mem::align_of::<T>(), 0);
        }
        Ok(Self {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    pub fn as_slice(&self) -> &'a [T] {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Deref for ForeignView<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

/// Run the body of an exported entry point without letting anything unwind out
///
/// Sentinel-class errors and panics are logged and replaced by `sentinel`.
/// Contract violations abort the process.
pub fn guarded<T>(
    entry: &'static str,
    sentinel: T,
    body: impl FnOnce() -> BoundaryResult<T>,
) -> T {
    trace!(entry, "boundary call");
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) if err.is_contract_violation() => abort_boundary(entry, &err),
        Ok(Err(err)) => {
            error!(entry, error = %err, "boundary call failed, returning sentinel");
            sentinel
        }
        Err(_) => {
            let err = BoundaryError::Panicked(entry);
            error!(entry, error = %err, "panic caught at boundary, returning sentinel");
            sentinel
        }
    }
}
