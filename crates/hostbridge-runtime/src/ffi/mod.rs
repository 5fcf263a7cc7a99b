//! Foreign Function Interface (FFI) infrastructure
//!
//! Building blocks shared by every strategy and entry point:
//! - Fixed-layout types (`Vector2f`, `RawBuffer`)
//! - UTF-16 to UTF-8 marshaling and buffer sizing
//! - Callback registration slots and the capabilities built on them
//! - Symbol resolution and typed calls through resolved pointers
//!
//! # Safety
//!
//! FFI operations involve `unsafe` code and careful memory management.
//! Raw pointer handling is kept in this module and behind the buffer, heap
//! and managed-object types, each of which exposes safe wrappers.

pub mod callbacks;
pub mod caller;
pub mod loader;
pub mod marshal;
pub mod safety;
pub mod types;

pub use callbacks::{AllocateMemoryFn, AllocatorCallback, CallbackSlot, CopyToCStringFn, StringCopier};
pub use caller::ManagedFunction;
pub use loader::{ExportTable, LibraryLoader, LoadError, LoadedLibrary, RawFnPtr, SymbolResolver};
pub use types::{Owner, RawBuffer, Vector2f};
