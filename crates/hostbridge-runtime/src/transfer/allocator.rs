//! Caller-allocator-callback strategy
//!
//! The native side registers an allocator. The managed side asks it for a
//! buffer sized by the configured policy, transcodes into it in place, and
//! writes the filled descriptor to the caller's out-parameter. The buffer
//! belongs to the native side throughout; the managed side never frees it.

use crate::buffer::{vec_from_raw, BufferAllocator, ForeignBuffer, VecAllocator};
use crate::error::BoundaryResult;
use crate::ffi::callbacks::AllocatorCallback;
use crate::ffi::marshal::required_len;
use crate::ffi::safety::{check_null_mut, guarded};
use crate::ffi::types::{Owner, RawBuffer};
use crate::managed::ManagedString;
use hostbridge_config::SizePolicy;

/// Managed side: fill a native-allocated buffer with `text` and report it in `out`
///
/// `out` is always overwritten. On allocation failure it is the empty
/// descriptor. If the allocator handed back less than was required, the
/// buffer is returned to the caller untouched with `len == 0` and the error
/// is `CapacityExceeded`.
pub fn text_into_buffer(
    text: &ManagedString,
    policy: SizePolicy,
    allocator: &(impl AllocatorCallback + ?Sized),
    out: &mut RawBuffer,
) -> BoundaryResult<()> {
    *out = RawBuffer::empty();

    let required = required_len(text.units(), policy)?;
    let raw = allocator.allocate(required)?;
    // Safety: AllocatorCallback checked the descriptor invariants
    let mut buffer = unsafe { ForeignBuffer::from_raw(RawBuffer { len: 0, ..raw }, Owner::Caller)? };

    let filled = buffer.fill_utf16(text.units());
    *out = buffer.into_raw();
    filled.map(|_| ())
}

/// Native side: the allocator registered with the managed side
///
/// Writes a `Vec`-backed descriptor to `out`, or the empty descriptor when
/// the memory cannot be obtained.
///
/// # Safety
///
/// `out` must be null or valid for a write of one `RawBuffer`.
pub unsafe extern "system" fn allocate_memory(size: usize, out: *mut RawBuffer) {
    guarded("allocate_memory", (), || {
        let out = check_null_mut(out, "allocate_memory out")?;
        out.write(VecAllocator.allocate(size).unwrap_or_default());
        Ok(())
    })
}

/// Native side: take ownership of a descriptor filled by the managed side
///
/// # Safety
///
/// `raw` must come from [`allocate_memory`] and not be taken twice.
pub unsafe fn take_vec(raw: RawBuffer) -> Vec<u8> {
    vec_from_raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TrackingAllocator;
    use crate::error::BoundaryError;
    use crate::ffi::callbacks::{AllocateMemoryFn, CallbackSlot};
    use pretty_assertions::assert_eq;

    /// Allocator fake that hands out fixed-capacity buffers from a tracker
    struct Fixed<'a> {
        capacity: Option<usize>,
        tracker: &'a TrackingAllocator<VecAllocator>,
    }

    impl AllocatorCallback for Fixed<'_> {
        fn allocate(&self, size: usize) -> BoundaryResult<RawBuffer> {
            let size = self.capacity.unwrap_or(size);
            self.tracker
                .allocate(size)
                .ok_or(BoundaryError::AllocationFailed { requested: size })
        }
    }

    #[test]
    fn test_native_allocator_round_trip() {
        let text = ManagedString::new("Some string for the host").unwrap();
        let allocator: AllocateMemoryFn = allocate_memory;
        let mut out = RawBuffer::empty();
        text_into_buffer(&text, SizePolicy::WorstCase, &allocator, &mut out).unwrap();

        let bytes = unsafe { take_vec(out) };
        assert_eq!(String::from_utf8(bytes).unwrap(), "Some string for the host");
    }

    #[test]
    fn test_worst_case_len_below_capacity() {
        let tracker = TrackingAllocator::new(VecAllocator);
        let fake = Fixed {
            capacity: None,
            tracker: &tracker,
        };
        let text = ManagedString::new("Grüße").unwrap();
        let mut out = RawBuffer::empty();
        text_into_buffer(&text, SizePolicy::WorstCase, &fake, &mut out).unwrap();

        assert_eq!(out.len, 7);
        assert_eq!(tracker.capacity_of(out.data), Some(out.capacity));
        assert!(out.len < out.capacity);
        unsafe { tracker.release(out) }.unwrap();
    }

    #[test]
    fn test_exact_len_equals_capacity() {
        let tracker = TrackingAllocator::new(VecAllocator);
        let fake = Fixed {
            capacity: None,
            tracker: &tracker,
        };
        let text = ManagedString::new("Grüße").unwrap();
        let mut out = RawBuffer::empty();
        text_into_buffer(&text, SizePolicy::Exact, &fake, &mut out).unwrap();

        assert_eq!(out.len, 7);
        assert_eq!(out.len, out.capacity);
        unsafe { tracker.release(out) }.unwrap();
    }

    #[test]
    fn test_undersized_buffer_returned_empty() {
        let tracker = TrackingAllocator::new(VecAllocator);
        let fake = Fixed {
            capacity: Some(2),
            tracker: &tracker,
        };
        let text = ManagedString::new("too long").unwrap();
        let mut out = RawBuffer::empty();
        let err = text_into_buffer(&text, SizePolicy::Exact, &fake, &mut out).unwrap_err();

        assert!(matches!(err, BoundaryError::CapacityExceeded { required: 8, .. }));
        assert_eq!(out.len, 0);
        assert!(!out.is_null());
        unsafe { tracker.release(out) }.unwrap();
        assert_eq!(tracker.live_count(), 0);
    }

    #[test]
    fn test_allocation_failure_leaves_empty_descriptor() {
        struct Refusing;
        impl AllocatorCallback for Refusing {
            fn allocate(&self, size: usize) -> BoundaryResult<RawBuffer> {
                Err(BoundaryError::AllocationFailed { requested: size })
            }
        }

        let text = ManagedString::new("x").unwrap();
        let mut out = RawBuffer {
            data: std::ptr::null_mut(),
            len: 9,
            capacity: 9,
        };
        let err = text_into_buffer(&text, SizePolicy::WorstCase, &Refusing, &mut out).unwrap_err();
        assert_eq!(err, BoundaryError::AllocationFailed { requested: 6 });
        assert_eq!(out, RawBuffer::empty());
    }

    #[test]
    fn test_unregistered_allocator_slot() {
        let slot: CallbackSlot<AllocateMemoryFn> = CallbackSlot::new("allocate_memory");
        let text = ManagedString::new("x").unwrap();
        let mut out = RawBuffer::empty();
        assert_eq!(
            text_into_buffer(&text, SizePolicy::WorstCase, &slot, &mut out),
            Err(BoundaryError::NotRegistered("allocate_memory"))
        );
    }

    #[test]
    fn test_allocate_memory_null_out_is_ignored() {
        unsafe { allocate_memory(8, std::ptr::null_mut()) };
    }
}
