//! Boundary error model
//!
//! Errors fall into two classes. Sentinel-class errors (allocation failure,
//! null input, bad lengths) are turned into the entry point's sentinel return
//! value. Contract violations (use before registration, double release,
//! release by a non-owner, writing past capacity) are defects on one side of
//! the boundary and abort the process once they reach an exported entry.

use crate::ffi::loader::LoadError;
use crate::ffi::types::Owner;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundaryError {
    #[error("allocation of {requested} bytes failed")]
    AllocationFailed { requested: usize },

    #[error("callback slot '{0}' used before registration")]
    NotRegistered(&'static str),

    #[error("buffer at {address:#x} released twice or never allocated here")]
    DoubleRelease { address: usize },

    #[error("buffer owned by the {owner} side released by the {releaser} side")]
    ReleaseByNonOwner { owner: Owner, releaser: Owner },

    #[error("write of {required} bytes exceeds buffer capacity {capacity}")]
    CapacityExceeded { capacity: usize, required: usize },

    #[error("null pointer passed as {0}")]
    NullPointer(&'static str),

    #[error("handle {0:#x} does not reference a pinned object")]
    InvalidHandle(usize),

    #[error("length {0} does not fit the boundary length type")]
    LengthOverflow(usize),

    #[error("negative length {0}")]
    NegativeLength(i64),

    #[error("input is not valid UTF-8")]
    InvalidUtf8,

    #[error("text holds a NUL at unit {position} and cannot be NUL-terminated")]
    InteriorNul { position: usize },

    #[error("increment of {0} overflows i32")]
    IncrementOverflow(i32),

    #[error("panic inside boundary entry '{0}'")]
    Panicked(&'static str),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl BoundaryError {
    /// Defects that must never be papered over with a sentinel
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            BoundaryError::NotRegistered(_)
                | BoundaryError::DoubleRelease { .. }
                | BoundaryError::ReleaseByNonOwner { .. }
                | BoundaryError::CapacityExceeded { .. }
                | BoundaryError::InvalidHandle(_)
        )
    }
}

/// Result type for boundary operations
pub type BoundaryResult<T> = Result<T, BoundaryError>;

/// Log a fatal boundary error and abort without unwinding.
pub fn abort_boundary(entry: &str, err: &BoundaryError) -> ! {
    tracing::error!(entry, error = %err, "contract violation at boundary, aborting");
    std::process::abort()
}
