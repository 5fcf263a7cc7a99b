//! Shared test utilities for boundary tests
//!
//! The exported surface keeps its text and size policy in process-wide
//! state, so every test that changes either must run under `#[serial]`.

#![allow(dead_code)]

use hostbridge_config::SizePolicy;
use hostbridge_runtime::{surface, ExportTable, Host, Strategy};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Host attached to the in-process surface, with the given text and policy
pub fn host_with(text: &str, policy: SizePolicy) -> Host<&'static ExportTable> {
    let host = Host::in_process().expect("surface resolves");
    host.set_text(text).expect("text accepted");
    surface::set_size_policy(policy);
    host
}

/// Fetch the current text through one strategy and decode it
pub fn fetch(host: &Host<&'static ExportTable>, strategy: Strategy) -> String {
    match strategy {
        Strategy::CopyCallback => host.text_via_copy_callback().expect("copy callback"),
        Strategy::SharedHeap => host
            .text_via_shared_heap()
            .expect("shared heap")
            .to_str()
            .expect("utf-8")
            .to_string(),
        Strategy::PinnedHandle => host
            .text_via_pinned_handle()
            .expect("pinned handle")
            .to_string()
            .expect("utf-16"),
        Strategy::AllocatorCallback => {
            String::from_utf8(host.text_via_allocator().expect("allocator")).expect("utf-8")
        }
    }
}
