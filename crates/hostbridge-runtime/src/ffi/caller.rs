//! Typed calls through resolved function pointers
//!
//! Entry point signatures are fixed at compile time, so a resolved address is
//! reinterpreted as a concrete `extern "system"` function pointer type rather
//! than dispatched through a dynamic call layer.

use crate::ffi::loader::{LoadError, RawFnPtr, SymbolResolver};
use std::fmt;
use std::mem::size_of;

/// A resolved entry point viewed as the function pointer type `F`
#[derive(Clone, Copy)]
pub struct ManagedFunction<F> {
    name: &'static str,
    f: F,
}

impl<F: Copy> ManagedFunction<F> {
    /// Reinterpret a raw address as `F`
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the real signature of the
    /// code at `raw`, and that code must stay loaded while this value is used.
    pub unsafe fn from_raw(name: &'static str, raw: RawFnPtr) -> Result<Self, LoadError> {
        if size_of::<F>() != size_of::<*const ()>() {
            return Err(LoadError::SignatureMismatch(name.to_string()));
        }
        if raw.is_null() {
            return Err(LoadError::SymbolNotFound {
                library: "<null>".to_string(),
                symbol: name.to_string(),
            });
        }
        let ptr = raw.as_ptr();
        Ok(Self {
            name,
            f: std::mem::transmute_copy::<*const (), F>(&ptr),
        })
    }

    /// Resolve `name` and reinterpret it as `F`
    ///
    /// # Safety
    ///
    /// Same contract as [`ManagedFunction::from_raw`].
    pub unsafe fn resolve<R: SymbolResolver + ?Sized>(
        resolver: &R,
        name: &'static str,
    ) -> Result<Self, LoadError> {
        let raw = resolver.resolve(name)?;
        Self::from_raw(name, raw)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The typed function pointer
    pub fn get(&self) -> F {
        self.f
    }
}

impl<F> std::ops::Deref for ManagedFunction<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.f
    }
}

impl<F> fmt::Debug for ManagedFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedFunction")
            .field("name", &self.name)
            .finish()
    }
}
