//! FFI type system - fixed-layout types shared verbatim by both sides
//!
//! Defines:
//! - `Vector2f`: a value struct passed by address, always caller-owned
//! - `RawBuffer`: the (data, len, capacity) descriptor of a foreign buffer
//! - `Owner`: which side carries the release obligation for a buffer
//!
//! Layout of every `#[repr(C)]` type here is asserted at compile time, so a
//! field reorder or a size change breaks the build instead of the peer.

use crate::error::{BoundaryError, BoundaryResult};
use std::fmt;
use std::mem::{align_of, offset_of, size_of};

/// Two 32-bit float components, sequential layout, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2f {
    pub x: f32,
    pub y: f32,
}

impl Vector2f {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean magnitude
    ///
    /// # Examples
    ///
    /// ```
    /// # use hostbridge_runtime::ffi::Vector2f;
    /// assert_eq!(Vector2f::new(3.0, 4.0).length(), 5.0);
    /// ```
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

const _: () = assert!(size_of::<Vector2f>() == 8);
const _: () = assert!(offset_of!(Vector2f, x) == 0);
const _: () = assert!(offset_of!(Vector2f, y) == 4);

/// Descriptor of a byte buffer living on either side of the boundary
///
/// Mirrors the native peer's `{ data, len, capacity }` struct bit for bit.
/// A descriptor is plain data; ownership is tracked by
/// [`ForeignBuffer`](crate::buffer::ForeignBuffer), never by the descriptor.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBuffer {
    pub data: *mut u8,
    pub len: usize,
    pub capacity: usize,
}

const _: () = assert!(size_of::<RawBuffer>() == 3 * size_of::<usize>());
const _: () = assert!(align_of::<RawBuffer>() == align_of::<usize>());
const _: () = assert!(offset_of!(RawBuffer, data) == 0);
const _: () = assert!(offset_of!(RawBuffer, len) == size_of::<usize>());
const _: () = assert!(offset_of!(RawBuffer, capacity) == 2 * size_of::<usize>());

impl RawBuffer {
    /// The null descriptor used as the allocation-failure sentinel
    pub const fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Check the descriptor invariants
    ///
    /// `data` is non-null whenever `len > 0` or `capacity > 0`, and
    /// `len <= capacity`.
    pub fn check(&self) -> BoundaryResult<()> {
        if self.data.is_null() && (self.len > 0 || self.capacity > 0) {
            return Err(BoundaryError::NullPointer("buffer data"));
        }
        if self.len > self.capacity {
            return Err(BoundaryError::CapacityExceeded {
                capacity: self.capacity,
                required: self.len,
            });
        }
        Ok(())
    }
}

impl Default for RawBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

/// Side of the boundary responsible for releasing a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// The native caller
    Caller,
    /// The managed callee
    Callee,
    /// A managed object pinned for native reads; released through its handle
    SharedPinned,
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Caller => write!(f, "caller"),
            Owner::Callee => write!(f, "callee"),
            Owner::SharedPinned => write!(f, "shared-pinned"),
        }
    }
}
