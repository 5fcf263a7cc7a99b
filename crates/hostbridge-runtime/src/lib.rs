//! Hostbridge Runtime - managed/native interop boundary
//!
//! This library provides both halves of a synchronous, in-process boundary
//! between a managed runtime and a native host:
//! - Fixed-layout value and buffer descriptor types
//! - Foreign buffers tagged with their releasing side, and the allocators behind them
//! - Callback registration slots
//! - Four strategies for returning a string to the native caller
//! - The exported `extern "system"` surface and lookup of entry points by name
//! - A native-side [`Host`] facade that drives the surface safely

/// Hostbridge runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod buffer;
pub mod error;
pub mod ffi;
pub mod heap;
pub mod host;
pub mod managed;
pub mod params;
pub mod surface;
pub mod transfer;

// Re-export commonly used types
pub use buffer::{BufferAllocator, FailingAllocator, ForeignBuffer, TrackingAllocator, VecAllocator};
pub use error::{BoundaryError, BoundaryResult};
pub use ffi::{ExportTable, LoadError, Owner, RawBuffer, SymbolResolver, Vector2f};
pub use heap::{SharedHeap, SHARED_HEAP};
pub use host::Host;
pub use managed::{ManagedString, PinTable, OFFSET_TO_STRING_DATA};
pub use transfer::allocator::text_into_buffer;
pub use transfer::Strategy;
