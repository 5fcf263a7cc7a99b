//! Callback registration slots
//!
//! A slot holds at most one native function pointer. Registration is an
//! unconditional overwrite; there is no way to clear a slot. Reads take a
//! shared lock so registration can race with use without tearing.
//!
//! Strategies never reach for a global slot directly. They take a capability
//! (`StringCopier`, `AllocatorCallback`) so tests can hand in a fake or a
//! fresh, unregistered slot.

use crate::error::{BoundaryError, BoundaryResult};
use crate::ffi::marshal::managed_len;
use crate::ffi::types::RawBuffer;
use parking_lot::RwLock;
use std::os::raw::c_char;
use tracing::debug;

/// Native callback that copies UTF-16 units into a freshly allocated C string
pub type CopyToCStringFn = unsafe extern "system" fn(*const u16, i32) -> *mut c_char;

/// Native callback that allocates `size` bytes and describes them in `out`
pub type AllocateMemoryFn = unsafe extern "system" fn(usize, *mut RawBuffer);

/// Process-wide slot for one native function pointer
pub struct CallbackSlot<F> {
    name: &'static str,
    inner: RwLock<Option<F>>,
}

impl<F: Copy> CallbackSlot<F> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: parking_lot::const_rwlock(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Store `f`, replacing any earlier registration
    pub fn register(&self, f: F) {
        let replaced = self.inner.write().replace(f).is_some();
        debug!(slot = self.name, replaced, "callback registered");
    }

    pub fn get(&self) -> Option<F> {
        *self.inner.read()
    }

    /// The registered pointer, or `NotRegistered`
    pub fn require(&self) -> BoundaryResult<F> {
        self.get().ok_or(BoundaryError::NotRegistered(self.name))
    }

    pub fn is_registered(&self) -> bool {
        self.inner.read().is_some()
    }
}

/// Capability to copy managed text into native-owned memory
pub trait StringCopier {
    /// Returns a C string the native side owns and must free
    fn copy_utf16(&self, units: &[u16]) -> BoundaryResult<*mut c_char>;
}

/// Capability to obtain a native-owned buffer of at least `size` bytes
pub trait AllocatorCallback {
    fn allocate(&self, size: usize) -> BoundaryResult<RawBuffer>;
}

impl StringCopier for CopyToCStringFn {
    fn copy_utf16(&self, units: &[u16]) -> BoundaryResult<*mut c_char> {
        let len = managed_len(units.len())?;
        // Registration is the native side's promise that the pointer honours
        // the CopyToCStringFn signature.
        let copied = unsafe { (*self)(units.as_ptr(), len) };
        if copied.is_null() {
            return Err(BoundaryError::AllocationFailed {
                requested: units.len(),
            });
        }
        Ok(copied)
    }
}

impl AllocatorCallback for AllocateMemoryFn {
    fn allocate(&self, size: usize) -> BoundaryResult<RawBuffer> {
        let mut raw = RawBuffer::empty();
        unsafe { (*self)(size, &mut raw) };
        if raw.is_null() {
            return Err(BoundaryError::AllocationFailed { requested: size });
        }
        raw.check()?;
        Ok(raw)
    }
}

impl<F: StringCopier + Copy> StringCopier for CallbackSlot<F> {
    fn copy_utf16(&self, units: &[u16]) -> BoundaryResult<*mut c_char> {
        self.require()?.copy_utf16(units)
    }
}

impl<F: AllocatorCallback + Copy> AllocatorCallback for CallbackSlot<F> {
    fn allocate(&self, size: usize) -> BoundaryResult<RawBuffer> {
        self.require()?.allocate(size)
    }
}
