//! Pinned-handle strategy
//!
//! No copy is made. The managed side pins its string object and returns a
//! token; the native side clears the mark bit, follows the slot to the object,
//! and reads the UTF-16 units at the offset the runtime reports. The units are
//! read-only and valid only until the token is released.

use crate::error::{BoundaryError, BoundaryResult};
use crate::managed::{ManagedString, PinTable, PINNED_MARK};
use std::fmt;
use std::sync::Arc;

/// Release entry point for pinned-handle tokens
pub type FreePinnedHandleFn = unsafe extern "system" fn(usize);

/// Managed side: pin `text` and return the token
pub fn pin_text(text: &Arc<ManagedString>, table: &PinTable) -> usize {
    table.pin(Arc::clone(text))
}

/// Native side: a view over pinned UTF-16 data that releases its token on drop
pub struct PinnedString {
    token: usize,
    data: *const u16,
    len: usize,
    release: FreePinnedHandleFn,
}

impl PinnedString {
    /// Locate the data behind `token`
    ///
    /// # Safety
    ///
    /// `token` must be a live pinned-handle token, `data_offset` the value the
    /// runtime reports for string data, and `release` the matching release
    /// entry point. The token must not be released by anyone else.
    pub unsafe fn from_token(
        token: usize,
        data_offset: usize,
        release: FreePinnedHandleFn,
    ) -> BoundaryResult<Self> {
        if token & PINNED_MARK == 0 {
            return Err(BoundaryError::InvalidHandle(token));
        }
        let slot = (token & !PINNED_MARK) as *const usize;
        let object = *slot as *const u8;
        let data = object.add(data_offset);
        // The length sits immediately before the first unit
        let len = data.sub(std::mem::size_of::<i32>()).cast::<i32>().read();
        let len = usize::try_from(len).map_err(|_| BoundaryError::NegativeLength(len.into()))?;

        Ok(Self {
            token,
            data: data.cast(),
            len,
            release,
        })
    }

    pub fn token(&self) -> usize {
        self.token
    }

    pub fn units(&self) -> &[u16] {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.data, self.len) }
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

    pub fn to_string(&self) -> Result<String, std::string::FromUtf16Error> {
        String::from_utf16(self.units())
    }
}

impl fmt::Debug for PinnedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedString")
            .field("token", &format_args!("{:#x}", self.token))
            .field("text", &self.to_string_lossy())
            .finish()
    }
}

impl Drop for PinnedString {
    fn drop(&mut self) {
        unsafe { (self.release)(self.token) };
    }
}
