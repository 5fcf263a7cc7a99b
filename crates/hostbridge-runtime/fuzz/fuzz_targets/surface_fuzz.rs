//! Exported surface stability fuzzer
//!
//! Feeds arbitrary bytes to the entry points that accept foreign input.
//! None may panic across the boundary; malformed input yields the sentinel.

#![no_main]

use hostbridge_runtime::surface::{hostbridge_is_palindrome, hostbridge_set_text_utf8};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let status = unsafe { hostbridge_set_text_utf8(data.as_ptr(), data.len()) };
    assert_eq!(status == 0, std::str::from_utf8(data).is_ok());

    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let len = units.len() as i32;
    let verdict = unsafe { hostbridge_is_palindrome(units.as_ptr(), len) };
    assert!(verdict == 0 || verdict == 1);
});
