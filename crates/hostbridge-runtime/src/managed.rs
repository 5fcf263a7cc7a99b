//! Managed-side string objects and pinning
//!
//! A [`ManagedString`] is laid out the way the managed runtime lays out its
//! strings, so a pinned one can be read in place by the native side:
//!
//! ```text
//! +-----------+-----------+------------------+------+
//! | type word | len: i32  | UTF-16 units ... | 0u16 |
//! +-----------+-----------+------------------+------+
//! ^ object    ^ data - 4  ^ object + OFFSET_TO_STRING_DATA
//! ```
//!
//! [`PinTable`] keeps pinned objects alive and addressable by an opaque token
//! until the token is released.

use crate::error::{BoundaryError, BoundaryResult};
use crate::ffi::marshal::managed_len;
use parking_lot::Mutex;
use std::alloc::{self, Layout};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};
use std::sync::Arc;
use tracing::debug;

/// Byte offset from a string object to its first UTF-16 unit
pub const OFFSET_TO_STRING_DATA: usize = size_of::<usize>() + size_of::<i32>();

/// Low bit set on every pinned-handle token
pub const PINNED_MARK: usize = 1;

const STRING_TYPE_WORD: usize = 0x5354_524E;

const _: () = assert!(OFFSET_TO_STRING_DATA % align_of::<u16>() == 0);
const _: () = assert!(align_of::<usize>() > PINNED_MARK);

/// Immutable UTF-16 string in managed object layout
pub struct ManagedString {
    object: NonNull<u8>,
    len: usize,
}

// Safety: the object is immutable after construction and owned uniquely
unsafe impl Send for ManagedString {}
unsafe impl Sync for ManagedString {}

impl ManagedString {
    pub fn new(text: &str) -> BoundaryResult<Self> {
        let units: Vec<u16> = text.encode_utf16().collect();
        Self::from_utf16(&units)
    }

    pub fn from_utf16(units: &[u16]) -> BoundaryResult<Self> {
        let len = managed_len(units.len())?;
        let layout = Self::layout(units.len())?;

        let object = NonNull::new(unsafe { alloc::alloc(layout) }).ok_or(
            BoundaryError::AllocationFailed {
                requested: layout.size(),
            },
        )?;
        unsafe {
            let base = object.as_ptr();
            base.cast::<usize>().write(STRING_TYPE_WORD);
            base.add(size_of::<usize>()).cast::<i32>().write(len);
            let data = base.add(OFFSET_TO_STRING_DATA).cast::<u16>();
            ptr::copy_nonoverlapping(units.as_ptr(), data, units.len());
            data.add(units.len()).write(0);
        }

        Ok(Self {
            object,
            len: units.len(),
        })
    }

    fn layout(units: usize) -> BoundaryResult<Layout> {
        let size = units
            .checked_add(1)
            .and_then(|n| n.checked_mul(size_of::<u16>()))
            .and_then(|bytes| bytes.checked_add(OFFSET_TO_STRING_DATA))
            .ok_or(BoundaryError::LengthOverflow(units))?;
        Layout::from_size_align(size, align_of::<usize>())
            .map_err(|_| BoundaryError::LengthOverflow(units))
    }

    /// Address of the object header
    pub fn as_ptr(&self) -> *const u8 {
        self.object.as_ptr()
    }

    /// Address of the first UTF-16 unit
    pub fn data_ptr(&self) -> *const u16 {
        unsafe { self.object.as_ptr().add(OFFSET_TO_STRING_DATA).cast() }
    }

    pub fn units(&self) -> &[u16] {
        unsafe { std::slice::from_raw_parts(self.data_ptr(), self.len) }
    }

    /// Length in UTF-16 units
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.units())
    }
}

impl Drop for ManagedString {
    fn drop(&mut self) {
        // Construction already validated this layout
        if let Ok(layout) = Self::layout(self.len) {
            unsafe { alloc::dealloc(self.object.as_ptr(), layout) };
        }
    }
}

impl fmt::Debug for ManagedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ManagedString")
            .field(&self.to_string_lossy())
            .finish()
    }
}

impl PartialEq for ManagedString {
    fn eq(&self, other: &Self) -> bool {
        self.units() == other.units()
    }
}

struct PinnedEntry {
    // The token is the address of this slot; it holds the object address
    _slot: Box<usize>,
    _object: Arc<ManagedString>,
}

/// Released slots kept allocated so their addresses are not reissued as tokens
pub const RETIRED_PIN_SLOTS: usize = 256;

struct PinState {
    entries: BTreeMap<usize, PinnedEntry>,
    retired: VecDeque<Box<usize>>,
}

/// Objects pinned for native reads, keyed by token
///
/// Tokens are slot addresses. A released slot is cleared and retired instead
/// of freed, so a stale token cannot alias a newer pin for the next
/// [`RETIRED_PIN_SLOTS`] releases.
pub struct PinTable {
    state: Mutex<PinState>,
}

/// Process-wide pin table used by the exported surface
pub static PIN_TABLE: PinTable = PinTable::new();

impl PinTable {
    pub const fn new() -> Self {
        Self {
            state: parking_lot::const_mutex(PinState {
                entries: BTreeMap::new(),
                retired: VecDeque::new(),
            }),
        }
    }

    /// Pin `object` and return its token
    ///
    /// The object stays alive and unmoved until [`PinTable::release`], even if
    /// every other reference to it is dropped.
    pub fn pin(&self, object: Arc<ManagedString>) -> usize {
        let slot = Box::new(object.as_ptr() as usize);
        let token = (&*slot as *const usize as usize) | PINNED_MARK;
        self.state.lock().entries.insert(
            token,
            PinnedEntry {
                _slot: slot,
                _object: object,
            },
        );
        debug!(token, "managed object pinned");
        token
    }

    /// Unpin; a token can be released exactly once
    pub fn release(&self, token: usize) -> BoundaryResult<()> {
        let mut state = self.state.lock();
        let PinnedEntry { _slot: mut slot, .. } = state
            .entries
            .remove(&token)
            .ok_or(BoundaryError::InvalidHandle(token))?;
        *slot = 0;
        state.retired.push_back(slot);
        if state.retired.len() > RETIRED_PIN_SLOTS {
            state.retired.pop_front();
        }
        debug!(token, "managed object unpinned");
        Ok(())
    }

    pub fn is_pinned(&self, token: usize) -> bool {
        self.state.lock().entries.contains_key(&token)
    }

    pub fn pinned_count(&self) -> usize {
        self.state.lock().entries.len()
    }
}

impl Default for PinTable {
    fn default() -> Self {
        Self::new()
    }
}
