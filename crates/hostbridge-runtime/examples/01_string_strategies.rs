//! String strategies example
//!
//! Fetches the managed text through each of the four transfer strategies.
//!
//! Run with: cargo run --example 01_string_strategies -p hostbridge-runtime

use hostbridge_runtime::Host;

fn main() {
    // Resolve every entry point and register the native callbacks
    let host = Host::in_process().expect("Failed to resolve surface");

    host.set_text("Grüße aus Rust").expect("Failed to set text");

    // Native copier builds a C string the caller owns
    let copied = host.text_via_copy_callback().expect("copy callback");
    println!("copy:      {}", copied);

    // Allocated on the shared C heap, freed when `heap` drops
    let heap = host.text_via_shared_heap().expect("shared heap");
    println!("heap:      {}", heap.to_str().expect("utf-8"));

    // Read in place from the pinned object, unpinned when `pinned` drops
    let pinned = host.text_via_pinned_handle().expect("pinned handle");
    println!("pinned:    {} ({} units)", pinned.to_string_lossy(), pinned.len());

    // Native allocator provides the buffer, which comes back as a Vec
    let bytes = host.text_via_allocator().expect("allocator");
    println!("allocator: {} ({} bytes)", String::from_utf8_lossy(&bytes), bytes.len());
}
