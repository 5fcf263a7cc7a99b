//! Shared C heap for the callee-allocates strategy
//!
//! Memory comes from `libc::malloc` so a native peer could release it with
//! its own `free`, but release is expected to go through the paired boundary
//! call. The live table maps address to requested capacity, which turns a
//! double free or a foreign pointer into an error instead of heap corruption.
//!
//! Freed blocks are retired rather than returned to `libc::free` at once, so
//! `malloc` cannot hand their address to a new allocation while a stale
//! pointer may still be freed again. Detection holds for the last
//! [`RETIRED_BLOCKS`] frees; older blocks go back to the C heap.

use crate::buffer::BufferAllocator;
use crate::error::{BoundaryError, BoundaryResult};
use crate::ffi::types::RawBuffer;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace};

/// Process-wide heap shared with the native side
pub static SHARED_HEAP: SharedHeap = SharedHeap::new();

/// Freed blocks held back from the C heap
pub const RETIRED_BLOCKS: usize = 256;

struct HeapState {
    live: BTreeMap<usize, usize>,
    retired: VecDeque<usize>,
}

pub struct SharedHeap {
    state: Mutex<HeapState>,
}

impl SharedHeap {
    pub const fn new() -> Self {
        Self {
            state: parking_lot::const_mutex(HeapState {
                live: BTreeMap::new(),
                retired: VecDeque::new(),
            }),
        }
    }

    /// Allocate `capacity` bytes plus one reserved byte for a NUL terminator
    ///
    /// The returned descriptor reports `capacity`, not the reserved byte, and
    /// its first byte is already NUL.
    pub fn allocate(&self, capacity: usize) -> BoundaryResult<RawBuffer> {
        let total = capacity
            .checked_add(1)
            .ok_or(BoundaryError::LengthOverflow(capacity))?;
        let data = unsafe { libc::malloc(total) } as *mut u8;
        if data.is_null() {
            return Err(BoundaryError::AllocationFailed { requested: total });
        }
        unsafe { data.write(0) };

        self.state.lock().live.insert(data as usize, capacity);
        trace!(address = data as usize, capacity, "shared heap allocation");
        Ok(RawBuffer {
            data,
            len: 0,
            capacity,
        })
    }

    /// Release memory allocated by this heap
    ///
    /// Freeing null is a no-op. Freeing anything not currently live is a
    /// `DoubleRelease` and leaves the C heap untouched. A second free is caught
    /// as long as fewer than [`RETIRED_BLOCKS`] other frees happened since;
    /// past that the address may belong to a new allocation again.
    ///
    /// # Safety
    ///
    /// No reference into the allocation may be used afterwards.
    pub unsafe fn free(&self, data: *mut u8) -> BoundaryResult<()> {
        if data.is_null() {
            return Ok(());
        }
        let address = data as usize;
        let mut state = self.state.lock();
        let capacity = state
            .live
            .remove(&address)
            .ok_or(BoundaryError::DoubleRelease { address })?;
        state.retired.push_back(address);
        if state.retired.len() > RETIRED_BLOCKS {
            if let Some(oldest) = state.retired.pop_front() {
                libc::free(oldest as *mut libc::c_void);
            }
        }
        debug!(address, capacity, "shared heap allocation freed");
        Ok(())
    }

    /// Capacity requested for a live allocation
    pub fn capacity_of(&self, data: *const u8) -> Option<usize> {
        self.state.lock().live.get(&(data as usize)).copied()
    }

    pub fn is_live(&self, data: *const u8) -> bool {
        self.state.lock().live.contains_key(&(data as usize))
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }
}

impl Drop for SharedHeap {
    fn drop(&mut self) {
        for address in self.state.get_mut().retired.drain(..) {
            unsafe { libc::free(address as *mut libc::c_void) };
        }
    }
}

impl Default for SharedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferAllocator for SharedHeap {
    fn allocate(&self, size: usize) -> Option<RawBuffer> {
        SharedHeap::allocate(self, size).ok()
    }

    unsafe fn release(&self, raw: RawBuffer) -> BoundaryResult<()> {
        self.free(raw.data)
    }
}
