//! Exported boundary surface
//!
//! Every entry point here is `#[no_mangle] extern "system"` and runs its body
//! through [`guarded`], so no panic or error unwinds into the caller. Failures
//! become the entry's sentinel (null, zero, -1 or NaN) or, for contract
//! violations, abort the process.
//!
//! # Call order
//!
//! `hostbridge_set_copy_to_c_string` must happen-before the first
//! `hostbridge_text_as_c_string`, and `hostbridge_set_allocate_memory` before
//! the first `hostbridge_text_into_buffer`. Calling either too early aborts.

use crate::error::{abort_boundary, BoundaryError, BoundaryResult};
use crate::ffi::callbacks::{AllocateMemoryFn, CallbackSlot, CopyToCStringFn};
use crate::ffi::caller::ManagedFunction;
use crate::ffi::loader::ExportTable;
use crate::ffi::safety::{check_null, check_null_mut, foreign_len, guarded, ForeignView};
use crate::ffi::types::{RawBuffer, Vector2f};
use crate::heap::SHARED_HEAP;
use crate::host::hostbridge_native_increment;
use crate::managed::{ManagedString, OFFSET_TO_STRING_DATA, PIN_TABLE};
use crate::params;
use crate::transfer::{allocator, copy, pinned, shared_heap};
use hostbridge_config::{Config, SizePolicy};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;
use tracing::debug;

/// Bumped whenever an entry point changes shape
pub const ABI_VERSION: u32 = 1;

/// Text held by the managed side until something replaces it
pub const DEFAULT_TEXT: &str = "Some string we want to return to the native host.";

/// Sentinel of `hostbridge_indirect_increment`
///
/// Never a successful result: the only input that would increment to it,
/// `i32::MAX`, is refused.
pub const INCREMENT_SENTINEL: i32 = i32::MIN;

pub static COPY_TO_C_STRING: CallbackSlot<CopyToCStringFn> =
    CallbackSlot::new("copy_to_c_string");

pub static ALLOCATE_MEMORY: CallbackSlot<AllocateMemoryFn> =
    CallbackSlot::new("allocate_memory");

struct SurfaceState {
    text: Arc<ManagedString>,
    size_policy: SizePolicy,
}

static STATE: Lazy<RwLock<SurfaceState>> = Lazy::new(|| {
    let text = match ManagedString::new(DEFAULT_TEXT) {
        Ok(text) => text,
        Err(err) => abort_boundary("surface init", &err),
    };
    RwLock::new(SurfaceState {
        text: Arc::new(text),
        size_policy: SizePolicy::default(),
    })
});

static SURFACE_EXPORTS: Lazy<ExportTable> = Lazy::new(|| {
    ExportTable::new("hostbridge")
        .with("hostbridge_abi_version", hostbridge_abi_version as *const ())
        .with("hostbridge_set_text_utf8", hostbridge_set_text_utf8 as *const ())
        .with(
            "hostbridge_set_copy_to_c_string",
            hostbridge_set_copy_to_c_string as *const (),
        )
        .with("hostbridge_text_as_c_string", hostbridge_text_as_c_string as *const ())
        .with(
            "hostbridge_text_as_shared_heap",
            hostbridge_text_as_shared_heap as *const (),
        )
        .with("hostbridge_free_shared_heap", hostbridge_free_shared_heap as *const ())
        .with(
            "hostbridge_text_as_pinned_handle",
            hostbridge_text_as_pinned_handle as *const (),
        )
        .with("hostbridge_free_pinned_handle", hostbridge_free_pinned_handle as *const ())
        .with("hostbridge_string_data_offset", hostbridge_string_data_offset as *const ())
        .with("hostbridge_set_allocate_memory", hostbridge_set_allocate_memory as *const ())
        .with("hostbridge_text_into_buffer", hostbridge_text_into_buffer as *const ())
        .with("hostbridge_is_palindrome", hostbridge_is_palindrome as *const ())
        .with("hostbridge_vector_length", hostbridge_vector_length as *const ())
        .with("hostbridge_native_increment", hostbridge_native_increment as *const ())
        .with("hostbridge_indirect_increment", hostbridge_indirect_increment as *const ())
});

impl ExportTable {
    /// Every entry point of this library, resolvable by its exported name
    pub fn surface() -> &'static ExportTable {
        &SURFACE_EXPORTS
    }
}

/// Apply the transfer section of a loaded configuration
pub fn configure(config: &Config) -> BoundaryResult<()> {
    if let Some(text) = config.text() {
        set_text(text)?;
    }
    set_size_policy(config.size_policy());
    Ok(())
}

/// Replace the managed-side text
///
/// Outstanding pinned handles keep the previous object alive.
pub fn set_text(text: &str) -> BoundaryResult<()> {
    let text = Arc::new(ManagedString::new(text)?);
    debug!(units = text.len(), "managed text replaced");
    STATE.write().text = text;
    Ok(())
}

pub fn current_text() -> Arc<ManagedString> {
    Arc::clone(&STATE.read().text)
}

pub fn set_size_policy(policy: SizePolicy) {
    STATE.write().size_policy = policy;
}

pub fn size_policy() -> SizePolicy {
    STATE.read().size_policy
}

#[no_mangle]
pub extern "system" fn hostbridge_abi_version() -> u32 {
    ABI_VERSION
}

/// Replace the managed-side text with `len` UTF-8 bytes at `ptr`
///
/// Returns 0 on success and -1 for null or malformed input.
///
/// # Safety
///
/// `ptr` must be readable for `len` bytes.
#[no_mangle]
pub unsafe extern "system" fn hostbridge_set_text_utf8(ptr: *const u8, len: usize) -> i32 {
    guarded("hostbridge_set_text_utf8", -1, || {
        let view = ForeignView::from_raw(ptr, len)?;
        let text = std::str::from_utf8(&view).map_err(|_| BoundaryError::InvalidUtf8)?;
        set_text(text)?;
        Ok(0)
    })
}

#[no_mangle]
pub extern "system" fn hostbridge_set_copy_to_c_string(f: Option<CopyToCStringFn>) {
    guarded("hostbridge_set_copy_to_c_string", (), || {
        COPY_TO_C_STRING.register(f.ok_or(BoundaryError::NullPointer("copy_to_c_string"))?);
        Ok(())
    })
}

/// Text as a C string allocated by the registered copier; null on failure
#[no_mangle]
pub extern "system" fn hostbridge_text_as_c_string() -> *mut c_char {
    guarded("hostbridge_text_as_c_string", ptr::null_mut(), || {
        copy::text_via_copier(&current_text(), &COPY_TO_C_STRING)
    })
}

/// Text as a NUL-terminated shared heap string; null on failure
#[no_mangle]
pub extern "system" fn hostbridge_text_as_shared_heap() -> *mut u8 {
    guarded("hostbridge_text_as_shared_heap", ptr::null_mut(), || {
        shared_heap::text_into_shared_heap(&current_text(), &SHARED_HEAP, size_policy())
    })
}

/// Release a string from `hostbridge_text_as_shared_heap`
///
/// # Safety
///
/// No reference into the string may be used afterwards. A second release of
/// the same pointer aborts.
#[no_mangle]
pub unsafe extern "system" fn hostbridge_free_shared_heap(ptr: *mut u8) {
    guarded("hostbridge_free_shared_heap", (), || SHARED_HEAP.free(ptr))
}

/// Pin the text and return its token; zero on failure
#[no_mangle]
pub extern "system" fn hostbridge_text_as_pinned_handle() -> usize {
    guarded("hostbridge_text_as_pinned_handle", 0, || {
        Ok(pinned::pin_text(&current_text(), &PIN_TABLE))
    })
}

/// Unpin a token from `hostbridge_text_as_pinned_handle`; a second release aborts
#[no_mangle]
pub extern "system" fn hostbridge_free_pinned_handle(token: usize) {
    guarded("hostbridge_free_pinned_handle", (), || PIN_TABLE.release(token))
}

#[no_mangle]
pub extern "system" fn hostbridge_string_data_offset() -> usize {
    OFFSET_TO_STRING_DATA
}

#[no_mangle]
pub extern "system" fn hostbridge_set_allocate_memory(f: Option<AllocateMemoryFn>) {
    guarded("hostbridge_set_allocate_memory", (), || {
        ALLOCATE_MEMORY.register(f.ok_or(BoundaryError::NullPointer("allocate_memory"))?);
        Ok(())
    })
}

/// Fill a buffer from the registered allocator and describe it in `out`
///
/// `out` receives the empty descriptor when allocation fails.
///
/// # Safety
///
/// `out` must be valid for a write of one `RawBuffer`.
#[no_mangle]
pub unsafe extern "system" fn hostbridge_text_into_buffer(out: *mut RawBuffer) {
    guarded("hostbridge_text_into_buffer", (), || {
        let out = check_null_mut(out, "text_into_buffer out")?;
        let mut filled = RawBuffer::empty();
        let result =
            allocator::text_into_buffer(&current_text(), size_policy(), &ALLOCATE_MEMORY, &mut filled);
        out.write(filled);
        result
    })
}

/// 1 if the `len` UTF-16 units at `ptr` read the same both ways ignoring
/// case, 0 if not, -1 for invalid input
///
/// # Safety
///
/// `ptr` must be readable for `len` units for the duration of the call.
#[no_mangle]
pub unsafe extern "system" fn hostbridge_is_palindrome(ptr: *const u16, len: i32) -> i32 {
    guarded("hostbridge_is_palindrome", -1, || {
        let view = ForeignView::from_raw(ptr, foreign_len(len)?)?;
        Ok(i32::from(params::is_palindrome(&view)))
    })
}

/// Magnitude of the vector at `v`; NaN for null
///
/// # Safety
///
/// `v` must be null or point to a readable `Vector2f`.
#[no_mangle]
pub unsafe extern "system" fn hostbridge_vector_length(v: *const Vector2f) -> f32 {
    guarded("hostbridge_vector_length", f32::NAN, || {
        let v = check_null(v, "vector")?;
        Ok(params::vector_length(&*v))
    })
}

/// Increment `n` through `hostbridge_native_increment`, looked up by name
///
/// Returns [`INCREMENT_SENTINEL`] when the lookup fails or `n` is `i32::MAX`.
#[no_mangle]
pub extern "system" fn hostbridge_indirect_increment(n: i32) -> i32 {
    type IncrementFn = extern "system" fn(i32) -> i32;

    guarded("hostbridge_indirect_increment", INCREMENT_SENTINEL, || {
        n.checked_add(1).ok_or(BoundaryError::IncrementOverflow(n))?;
        let increment = unsafe {
            ManagedFunction::<IncrementFn>::resolve(ExportTable::surface(), "hostbridge_native_increment")?
        };
        Ok((increment.get())(n))
    })
}
