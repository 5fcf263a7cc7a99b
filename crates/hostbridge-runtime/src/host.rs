//! Native-side host facade
//!
//! [`Host`] plays the native caller. It resolves every entry point by name
//! through a [`SymbolResolver`], performs the one-time setup the surface
//! requires (register the copier and the allocator, query the string data
//! offset), and wraps each strategy so the caller gets owned Rust values and
//! release obligations are discharged on drop.
//!
//! # Example
//!
//! ```
//! use hostbridge_runtime::Host;
//!
//! let host = Host::in_process().unwrap();
//! let text = host.text_via_copy_callback().unwrap();
//! assert!(!text.is_empty());
//! ```

use crate::error::{BoundaryError, BoundaryResult};
use crate::ffi::caller::ManagedFunction;
use crate::ffi::callbacks::{AllocateMemoryFn, CopyToCStringFn};
use crate::ffi::loader::{ExportTable, LoadError, SymbolResolver};
use crate::ffi::types::{RawBuffer, Vector2f};
use crate::surface::INCREMENT_SENTINEL;
use crate::transfer::allocator::{allocate_memory, take_vec};
use crate::transfer::copy::{copy_to_c_string, take_c_string};
use crate::transfer::pinned::{FreePinnedHandleFn, PinnedString};
use crate::transfer::shared_heap::{FreeSharedHeapFn, SharedHeapString};
use std::os::raw::c_char;
use tracing::{debug, info};

type SetTextFn = unsafe extern "system" fn(*const u8, usize) -> i32;
type SetCopierFn = extern "system" fn(Option<CopyToCStringFn>);
type SetAllocatorFn = extern "system" fn(Option<AllocateMemoryFn>);
type TextAsCStringFn = extern "system" fn() -> *mut c_char;
type TextAsSharedHeapFn = extern "system" fn() -> *mut u8;
type TextAsPinnedHandleFn = extern "system" fn() -> usize;
type StringDataOffsetFn = extern "system" fn() -> usize;
type TextIntoBufferFn = unsafe extern "system" fn(*mut RawBuffer);
type IsPalindromeFn = unsafe extern "system" fn(*const u16, i32) -> i32;
type VectorLengthFn = unsafe extern "system" fn(*const Vector2f) -> f32;
type IncrementFn = extern "system" fn(i32) -> i32;
type AbiVersionFn = extern "system" fn() -> u32;

/// Native-side export the managed side looks up by name
#[no_mangle]
pub extern "system" fn hostbridge_native_increment(n: i32) -> i32 {
    n.wrapping_add(1)
}

/// Entry points resolved once, at construction
struct Entries {
    abi_version: ManagedFunction<AbiVersionFn>,
    set_text: ManagedFunction<SetTextFn>,
    text_as_c_string: ManagedFunction<TextAsCStringFn>,
    text_as_shared_heap: ManagedFunction<TextAsSharedHeapFn>,
    free_shared_heap: ManagedFunction<FreeSharedHeapFn>,
    text_as_pinned_handle: ManagedFunction<TextAsPinnedHandleFn>,
    free_pinned_handle: ManagedFunction<FreePinnedHandleFn>,
    text_into_buffer: ManagedFunction<TextIntoBufferFn>,
    is_palindrome: ManagedFunction<IsPalindromeFn>,
    vector_length: ManagedFunction<VectorLengthFn>,
    indirect_increment: ManagedFunction<IncrementFn>,
}

/// The native caller of the boundary surface
pub struct Host<R> {
    resolver: R,
    entries: Entries,
    string_data_offset: usize,
}

impl Host<&'static ExportTable> {
    /// Host bound to the surface compiled into this process
    pub fn in_process() -> Result<Self, LoadError> {
        Self::new(ExportTable::surface())
    }
}

impl<R: SymbolResolver> Host<R> {
    /// Resolve the surface through `resolver` and run the one-time setup
    pub fn new(resolver: R) -> Result<Self, LoadError> {
        // Safety: each alias above mirrors the signature of the export it names
        let entries = unsafe {
            Entries {
                abi_version: ManagedFunction::resolve(&resolver, "hostbridge_abi_version")?,
                set_text: ManagedFunction::resolve(&resolver, "hostbridge_set_text_utf8")?,
                text_as_c_string: ManagedFunction::resolve(&resolver, "hostbridge_text_as_c_string")?,
                text_as_shared_heap: ManagedFunction::resolve(
                    &resolver,
                    "hostbridge_text_as_shared_heap",
                )?,
                free_shared_heap: ManagedFunction::resolve(&resolver, "hostbridge_free_shared_heap")?,
                text_as_pinned_handle: ManagedFunction::resolve(
                    &resolver,
                    "hostbridge_text_as_pinned_handle",
                )?,
                free_pinned_handle: ManagedFunction::resolve(
                    &resolver,
                    "hostbridge_free_pinned_handle",
                )?,
                text_into_buffer: ManagedFunction::resolve(&resolver, "hostbridge_text_into_buffer")?,
                is_palindrome: ManagedFunction::resolve(&resolver, "hostbridge_is_palindrome")?,
                vector_length: ManagedFunction::resolve(&resolver, "hostbridge_vector_length")?,
                indirect_increment: ManagedFunction::resolve(
                    &resolver,
                    "hostbridge_indirect_increment",
                )?,
            }
        };

        let (set_copier, set_allocator, string_data_offset) = unsafe {
            (
                ManagedFunction::<SetCopierFn>::resolve(&resolver, "hostbridge_set_copy_to_c_string")?,
                ManagedFunction::<SetAllocatorFn>::resolve(&resolver, "hostbridge_set_allocate_memory")?,
                ManagedFunction::<StringDataOffsetFn>::resolve(&resolver, "hostbridge_string_data_offset")?,
            )
        };

        // Registration must happen-before any dependent call
        (set_copier.get())(Some(copy_to_c_string));
        (set_allocator.get())(Some(allocate_memory));
        let string_data_offset = (string_data_offset.get())();

        info!(
            abi_version = (entries.abi_version.get())(),
            string_data_offset, "host attached to boundary surface"
        );

        Ok(Self {
            resolver,
            entries,
            string_data_offset,
        })
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn abi_version(&self) -> u32 {
        (self.entries.abi_version.get())()
    }

    /// Offset of string data inside a managed string object, as reported by the runtime
    pub fn string_data_offset(&self) -> usize {
        self.string_data_offset
    }

    /// Replace the managed-side text
    pub fn set_text(&self, text: &str) -> BoundaryResult<()> {
        let status = unsafe { (self.entries.set_text.get())(text.as_ptr(), text.len()) };
        if status != 0 {
            return Err(BoundaryError::InvalidUtf8);
        }
        Ok(())
    }

    /// Strategy 1: the managed side calls our copier, we own the result
    pub fn text_via_copy_callback(&self) -> BoundaryResult<String> {
        let ptr = (self.entries.text_as_c_string.get())();
        let owned = unsafe { take_c_string(ptr) }
            .ok_or(BoundaryError::NullPointer("hostbridge_text_as_c_string result"))?;
        owned.into_string().map_err(|_| BoundaryError::InvalidUtf8)
    }

    /// Strategy 2: the managed side allocates on the shared heap, we free it on drop
    pub fn text_via_shared_heap(&self) -> BoundaryResult<SharedHeapString> {
        let ptr = (self.entries.text_as_shared_heap.get())();
        unsafe { SharedHeapString::from_raw(ptr, self.entries.free_shared_heap.get()) }
            .ok_or(BoundaryError::NullPointer("hostbridge_text_as_shared_heap result"))
    }

    /// Strategy 3: the managed side pins its object, we read in place and unpin on drop
    pub fn text_via_pinned_handle(&self) -> BoundaryResult<PinnedString> {
        let token = (self.entries.text_as_pinned_handle.get())();
        if token == 0 {
            return Err(BoundaryError::InvalidHandle(token));
        }
        debug!(token, "pinned handle received");
        unsafe {
            PinnedString::from_token(
                token,
                self.string_data_offset,
                self.entries.free_pinned_handle.get(),
            )
        }
    }

    /// Strategy 4: the managed side fills a buffer from our allocator
    ///
    /// The returned `Vec` keeps the capacity the allocator handed out.
    pub fn text_via_allocator(&self) -> BoundaryResult<Vec<u8>> {
        let mut raw = RawBuffer::empty();
        unsafe { (self.entries.text_into_buffer.get())(&mut raw) };
        if raw.is_null() {
            return Err(BoundaryError::NullPointer("hostbridge_text_into_buffer result"));
        }
        raw.check()?;
        Ok(unsafe { take_vec(raw) })
    }

    pub fn is_palindrome(&self, text: &str) -> BoundaryResult<bool> {
        let units: Vec<u16> = text.encode_utf16().collect();
        let len = crate::ffi::marshal::managed_len(units.len())?;
        match unsafe { (self.entries.is_palindrome.get())(units.as_ptr(), len) } {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(BoundaryError::NullPointer("hostbridge_is_palindrome input")),
        }
    }

    pub fn vector_length(&self, v: Vector2f) -> f32 {
        unsafe { (self.entries.vector_length.get())(&v) }
    }

    /// Calls into the managed side, which calls back into `hostbridge_native_increment`
    pub fn indirect_increment(&self, n: i32) -> BoundaryResult<i32> {
        match (self.entries.indirect_increment.get())(n) {
            INCREMENT_SENTINEL => Err(BoundaryError::IncrementOverflow(n)),
            result => Ok(result),
        }
    }
}
