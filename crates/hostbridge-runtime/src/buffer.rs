//! Foreign buffer handles and the allocation seam
//!
//! A [`ForeignBuffer`] is a checked-out [`RawBuffer`] tagged with the side that
//! must release it. It is never copied. It leaves the Rust side either through
//! [`ForeignBuffer::into_raw`] (handed across the boundary) or through
//! [`ForeignBuffer::release`] (returned to the allocator that produced it).
//!
//! [`BufferAllocator`] is the seam used by tests to substitute instrumented
//! or failing allocators for the real ones.

use crate::error::{BoundaryError, BoundaryResult};
use crate::ffi::marshal::encode_utf8_into;
use crate::ffi::types::{Owner, RawBuffer};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{trace, warn};

/// Source and sink of raw buffers
pub trait BufferAllocator {
    /// Returns a buffer with `len == 0` and `capacity >= size`, or `None`
    fn allocate(&self, size: usize) -> Option<RawBuffer>;

    /// Return a buffer obtained from `allocate` on this allocator
    ///
    /// # Safety
    ///
    /// `raw` must describe memory this allocator handed out, with `len` not
    /// past the bytes actually written.
    unsafe fn release(&self, raw: RawBuffer) -> BoundaryResult<()>;
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &A {
    fn allocate(&self, size: usize) -> Option<RawBuffer> {
        (**self).allocate(size)
    }

    unsafe fn release(&self, raw: RawBuffer) -> BoundaryResult<()> {
        (**self).release(raw)
    }
}

/// A buffer checked out to exactly one owner
#[derive(Debug)]
pub struct ForeignBuffer {
    raw: RawBuffer,
    owner: Owner,
}

impl ForeignBuffer {
    /// Allocate `size` bytes that `owner` will have to release
    pub fn allocate<A: BufferAllocator + ?Sized>(
        allocator: &A,
        size: usize,
        owner: Owner,
    ) -> BoundaryResult<Self> {
        let raw = allocator
            .allocate(size)
            .ok_or(BoundaryError::AllocationFailed { requested: size })?;
        trace!(address = raw.data as usize, capacity = raw.capacity, %owner, "buffer allocated");
        Ok(Self {
            raw: RawBuffer { len: 0, ..raw },
            owner,
        })
    }

    /// Adopt a descriptor produced elsewhere
    ///
    /// # Safety
    ///
    /// `raw.data` must be valid for writes of `raw.capacity` bytes and for
    /// reads of `raw.len` bytes, and no one else may hold it checked out.
    pub unsafe fn from_raw(raw: RawBuffer, owner: Owner) -> BoundaryResult<Self> {
        raw.check()?;
        Ok(Self { raw, owner })
    }

    /// Copy `bytes` in and set the length
    pub fn fill(&mut self, bytes: &[u8]) -> BoundaryResult<usize> {
        if bytes.len() > self.raw.capacity {
            self.raw.len = 0;
            return Err(BoundaryError::CapacityExceeded {
                capacity: self.raw.capacity,
                required: bytes.len(),
            });
        }
        if !bytes.is_empty() {
            unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), self.raw.data, bytes.len()) };
        }
        self.raw.len = bytes.len();
        Ok(self.raw.len)
    }

    /// Transcode UTF-16 units in as UTF-8 and set the length
    ///
    /// On `CapacityExceeded` nothing is written and the length is zero.
    pub fn fill_utf16(&mut self, units: &[u16]) -> BoundaryResult<usize> {
        match unsafe { encode_utf8_into(units, self.raw.data, self.raw.capacity) } {
            Ok(written) => {
                self.raw.len = written;
                Ok(written)
            }
            Err(err) => {
                self.raw.len = 0;
                Err(err)
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        if self.raw.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.raw.data, self.raw.len) }
    }

    pub fn len(&self) -> usize {
        self.raw.len
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.raw.capacity
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Hand the descriptor across the boundary; the owner tag goes with it
    pub fn into_raw(self) -> RawBuffer {
        let this = ManuallyDrop::new(self);
        this.raw
    }

    /// Return the memory to `allocator`
    ///
    /// Only the owning side may release. On `ReleaseByNonOwner` the buffer is
    /// handed back untouched.
    ///
    /// # Safety
    ///
    /// `allocator` must be the one the memory came from.
    pub unsafe fn release<A: BufferAllocator + ?Sized>(
        self,
        allocator: &A,
        releaser: Owner,
    ) -> Result<(), (Self, BoundaryError)> {
        if releaser != self.owner {
            let err = BoundaryError::ReleaseByNonOwner {
                owner: self.owner,
                releaser,
            };
            return Err((self, err));
        }
        let raw = self.into_raw();
        allocator.release(raw).map_err(|err| {
            (
                ForeignBuffer {
                    raw: RawBuffer::empty(),
                    owner: releaser,
                },
                err,
            )
        })
    }
}

impl Drop for ForeignBuffer {
    fn drop(&mut self) {
        if !self.raw.is_null() && self.raw.capacity > 0 {
            warn!(
                address = self.raw.data as usize,
                capacity = self.raw.capacity,
                owner = %self.owner,
                "foreign buffer dropped without release, leaking it"
            );
        }
    }
}

/// Rebuild a `Vec` from a descriptor produced by [`VecAllocator`]
///
/// # Safety
///
/// `raw` must come from `VecAllocator` (or the native `allocate_memory`
/// callback) with `len` bytes initialized.
pub unsafe fn vec_from_raw(raw: RawBuffer) -> Vec<u8> {
    if raw.is_null() {
        return Vec::new();
    }
    Vec::from_raw_parts(raw.data, raw.len, raw.capacity)
}

/// Allocator backed by the Rust global allocator through `Vec`
#[derive(Debug, Clone, Copy, Default)]
pub struct VecAllocator;

impl BufferAllocator for VecAllocator {
    fn allocate(&self, size: usize) -> Option<RawBuffer> {
        let mut bytes: Vec<u8> = Vec::new();
        bytes.try_reserve_exact(size).ok()?;
        let mut bytes = ManuallyDrop::new(bytes);
        Some(RawBuffer {
            data: bytes.as_mut_ptr(),
            len: 0,
            capacity: bytes.capacity(),
        })
    }

    unsafe fn release(&self, raw: RawBuffer) -> BoundaryResult<()> {
        drop(vec_from_raw(raw));
        Ok(())
    }
}

/// Allocator that never hands out memory
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingAllocator;

impl BufferAllocator for FailingAllocator {
    fn allocate(&self, _size: usize) -> Option<RawBuffer> {
        None
    }

    unsafe fn release(&self, raw: RawBuffer) -> BoundaryResult<()> {
        Err(BoundaryError::DoubleRelease {
            address: raw.data as usize,
        })
    }
}

/// Instrumented wrapper that detects double and foreign releases
///
/// Releases of buffers that are not live are refused with `DoubleRelease`
/// and never reach the inner allocator. Zero-capacity buffers all share one
/// dangling address, so live buffers are counted per address.
#[derive(Debug, Default)]
pub struct TrackingAllocator<A> {
    inner: A,
    live: Mutex<BTreeMap<usize, LiveBuffers>>,
    allocations: AtomicUsize,
    releases: AtomicUsize,
}

#[derive(Debug, Clone, Copy)]
struct LiveBuffers {
    capacity: usize,
    count: usize,
}

impl<A: BufferAllocator> TrackingAllocator<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            live: Mutex::new(BTreeMap::new()),
            allocations: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().values().map(|entry| entry.count).sum()
    }

    /// Capacity of a live buffer
    pub fn capacity_of(&self, address: *const u8) -> Option<usize> {
        self.live.lock().get(&(address as usize)).map(|entry| entry.capacity)
    }
}

impl<A: BufferAllocator> BufferAllocator for TrackingAllocator<A> {
    fn allocate(&self, size: usize) -> Option<RawBuffer> {
        let raw = self.inner.allocate(size)?;
        self.live
            .lock()
            .entry(raw.data as usize)
            .and_modify(|entry| entry.count += 1)
            .or_insert(LiveBuffers {
                capacity: raw.capacity,
                count: 1,
            });
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Some(raw)
    }

    unsafe fn release(&self, raw: RawBuffer) -> BoundaryResult<()> {
        let address = raw.data as usize;
        {
            let mut live = self.live.lock();
            let entry = live
                .get_mut(&address)
                .ok_or(BoundaryError::DoubleRelease { address })?;
            entry.count -= 1;
            if entry.count == 0 {
                live.remove(&address);
            }
        }
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.inner.release(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_allocate_starts_empty() {
        let buffer = ForeignBuffer::allocate(&VecAllocator, 16, Owner::Callee).unwrap();
        assert_eq!(buffer.len(), 0);
        assert!(buffer.capacity() >= 16);
        unsafe { buffer.release(&VecAllocator, Owner::Callee) }.unwrap();
    }

    #[test]
    fn test_fill_and_read_back() {
        let mut buffer = ForeignBuffer::allocate(&VecAllocator, 8, Owner::Callee).unwrap();
        assert_eq!(buffer.fill(b"bytes").unwrap(), 5);
        assert_eq!(buffer.as_bytes(), b"bytes");
        unsafe { buffer.release(&VecAllocator, Owner::Callee) }.unwrap();
    }

    #[test]
    fn test_fill_past_capacity_refused() {
        let mut buffer = ForeignBuffer::allocate(&VecAllocator, 2, Owner::Callee).unwrap();
        buffer.fill(b"ab").unwrap();
        let capacity = buffer.capacity();
        let too_long = vec![b'x'; capacity + 1];
        assert_eq!(
            buffer.fill(&too_long),
            Err(BoundaryError::CapacityExceeded {
                capacity,
                required: capacity + 1
            })
        );
        assert_eq!(buffer.len(), 0);
        unsafe { buffer.release(&VecAllocator, Owner::Callee) }.unwrap();
    }

    #[test]
    fn test_fill_utf16() {
        let units: Vec<u16> = "Grüße".encode_utf16().collect();
        let mut buffer = ForeignBuffer::allocate(&VecAllocator, 18, Owner::Callee).unwrap();
        assert_eq!(buffer.fill_utf16(&units).unwrap(), 7);
        assert_eq!(buffer.as_bytes(), "Grüße".as_bytes());
        unsafe { buffer.release(&VecAllocator, Owner::Callee) }.unwrap();
    }

    #[test]
    fn test_failed_allocation() {
        let result = ForeignBuffer::allocate(&FailingAllocator, 32, Owner::Callee);
        assert_eq!(
            result.map(|b| b.into_raw()),
            Err(BoundaryError::AllocationFailed { requested: 32 })
        );
    }

    #[test]
    fn test_release_by_non_owner() {
        let buffer = ForeignBuffer::allocate(&VecAllocator, 4, Owner::Caller).unwrap();
        let (buffer, err) = unsafe { buffer.release(&VecAllocator, Owner::Callee) }.unwrap_err();
        assert_eq!(
            err,
            BoundaryError::ReleaseByNonOwner {
                owner: Owner::Caller,
                releaser: Owner::Callee
            }
        );
        unsafe { buffer.release(&VecAllocator, Owner::Caller) }.unwrap();
    }

    #[test]
    fn test_tracking_detects_double_release() {
        let tracking = TrackingAllocator::new(VecAllocator);
        let buffer = ForeignBuffer::allocate(&tracking, 8, Owner::Caller).unwrap();
        let raw = buffer.into_raw();

        unsafe { tracking.release(raw) }.unwrap();
        assert_eq!(
            unsafe { tracking.release(raw) },
            Err(BoundaryError::DoubleRelease {
                address: raw.data as usize
            })
        );
        assert_eq!(tracking.allocations(), 1);
        assert_eq!(tracking.releases(), 1);
        assert_eq!(tracking.live_count(), 0);
    }

    #[test]
    fn test_tracking_zero_size_buffers_share_address() {
        let tracking = TrackingAllocator::new(VecAllocator);
        let a = ForeignBuffer::allocate(&tracking, 0, Owner::Caller).unwrap();
        let b = ForeignBuffer::allocate(&tracking, 0, Owner::Caller).unwrap();
        assert_eq!(tracking.allocations(), 2);
        assert_eq!(tracking.live_count(), 2);

        unsafe { a.release(&tracking, Owner::Caller) }.unwrap();
        unsafe { b.release(&tracking, Owner::Caller) }.unwrap();
        assert_eq!(tracking.releases(), 2);
        assert_eq!(tracking.live_count(), 0);
    }

    #[test]
    fn test_vec_round_trip() {
        let raw = VecAllocator.allocate(4).unwrap();
        let mut buffer = unsafe { ForeignBuffer::from_raw(raw, Owner::Caller) }.unwrap();
        buffer.fill(b"abc").unwrap();
        let bytes = unsafe { vec_from_raw(buffer.into_raw()) };
        assert_eq!(bytes, b"abc");
        assert!(bytes.capacity() >= 4);
    }
}
