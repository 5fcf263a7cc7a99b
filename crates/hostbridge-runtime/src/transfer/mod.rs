//! String transfer strategies
//!
//! Four ways to hand managed text to a native caller. Each submodule holds
//! the managed half (produce the transfer), the native half (callbacks it
//! registers and the receiver that takes ownership), or both.
//!
//! | Strategy | Allocated by | Released by |
//! |---|---|---|
//! | [`Strategy::CopyCallback`] | native, in the registered copier | native |
//! | [`Strategy::SharedHeap`] | managed, on the shared C heap | native, via the paired free |
//! | [`Strategy::PinnedHandle`] | nobody, the object is pinned | native, via the handle release |
//! | [`Strategy::AllocatorCallback`] | native, in the registered allocator | native |

pub mod allocator;
pub mod copy;
pub mod pinned;
pub mod shared_heap;

use crate::ffi::types::Owner;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    CopyCallback,
    SharedHeap,
    PinnedHandle,
    AllocatorCallback,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::CopyCallback,
        Strategy::SharedHeap,
        Strategy::PinnedHandle,
        Strategy::AllocatorCallback,
    ];

    /// Short name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CopyCallback => "copy",
            Strategy::SharedHeap => "heap",
            Strategy::PinnedHandle => "pinned",
            Strategy::AllocatorCallback => "allocator",
        }
    }

    /// Side that allocates the memory the caller ends up reading
    pub fn allocated_by(&self) -> Owner {
        match self {
            Strategy::CopyCallback | Strategy::AllocatorCallback => Owner::Caller,
            Strategy::SharedHeap | Strategy::PinnedHandle => Owner::Callee,
        }
    }

    /// Side holding the release obligation once the call returns
    pub fn owner_after_call(&self) -> Owner {
        match self {
            Strategy::PinnedHandle => Owner::SharedPinned,
            _ => Owner::Caller,
        }
    }

    /// Whether the strategy needs a callback registered before first use
    pub fn needs_registration(&self) -> bool {
        matches!(
            self,
            Strategy::CopyCallback | Strategy::AllocatorCallback
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown strategy '{}'", s))
    }
}
