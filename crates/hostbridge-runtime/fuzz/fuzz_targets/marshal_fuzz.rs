//! UTF-16 to UTF-8 marshaling fuzzer
//!
//! Arbitrary code units, including unpaired surrogates, must encode into a
//! buffer sized by either policy, and never past a smaller one.

#![no_main]

use hostbridge_config::SizePolicy;
use hostbridge_runtime::ffi::marshal::{decode_lossy, encode_utf8_into, required_len};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let expected: String = decode_lossy(&units).collect();

    for policy in [SizePolicy::WorstCase, SizePolicy::Exact] {
        let capacity = required_len(&units, policy).unwrap();
        let mut buffer = vec![0u8; capacity];
        let written = unsafe { encode_utf8_into(&units, buffer.as_mut_ptr(), capacity) }.unwrap();
        assert_eq!(&buffer[..written], expected.as_bytes());
    }

    if !expected.is_empty() {
        let capacity = expected.len() - 1;
        let mut buffer = vec![0u8; capacity];
        assert!(unsafe { encode_utf8_into(&units, buffer.as_mut_ptr(), capacity) }.is_err());
    }
});
