//! Ownership error example
//!
//! Demonstrates the errors reported when a buffer is released twice or by
//! the wrong side, using an instrumented allocator instead of a real heap.
//!
//! Run with: cargo run --example 02_ownership_errors -p hostbridge-runtime

use hostbridge_runtime::{BufferAllocator, ForeignBuffer, Owner, TrackingAllocator, VecAllocator};

fn main() {
    let allocator = TrackingAllocator::new(VecAllocator);

    println!("1. Release by the wrong side:");
    let buffer = ForeignBuffer::allocate(&allocator, 32, Owner::Caller).expect("allocation");
    let buffer = match unsafe { buffer.release(&allocator, Owner::Callee) } {
        Ok(()) => unreachable!("callee does not own this buffer"),
        Err((buffer, err)) => {
            println!("   {} (contract violation: {})", err, err.is_contract_violation());
            buffer
        }
    };

    println!("\n2. Release twice:");
    let raw = buffer.into_raw();
    unsafe { allocator.release(raw) }.expect("first release");
    if let Err(err) = unsafe { allocator.release(raw) } {
        println!("   {} (contract violation: {})", err, err.is_contract_violation());
    }

    println!(
        "\nallocations: {}, releases: {}, live: {}",
        allocator.allocations(),
        allocator.releases(),
        allocator.live_count()
    );
}
