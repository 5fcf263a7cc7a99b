//! Parameter passing across the boundary
//!
//! Operations that take foreign data by address and retain nothing after
//! the call returns.

use crate::ffi::types::Vector2f;

/// Case-insensitive palindrome check over UTF-16 code units
///
/// Each unit is lowercased on its own, so surrogate halves compare as-is.
/// The empty sequence is a palindrome.
///
/// # Examples
///
/// ```
/// # use hostbridge_runtime::params::is_palindrome;
/// let level: Vec<u16> = "Level".encode_utf16().collect();
/// assert!(is_palindrome(&level));
/// ```
pub fn is_palindrome(units: &[u16]) -> bool {
    let n = units.len();
    (0..n / 2).all(|i| fold_case(units[i]) == fold_case(units[n - 1 - i]))
}

/// Simple lowercase mapping of a single UTF-16 unit
fn fold_case(unit: u16) -> u16 {
    let Some(ch) = char::from_u32(unit.into()) else {
        return unit;
    };
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => u16::try_from(u32::from(l)).unwrap_or(unit),
        _ => unit,
    }
}

/// Magnitude of a caller-owned vector
pub fn vector_length(v: &Vector2f) -> f32 {
    v.length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[rstest]
    #[case("level", true)]
    #[case("Level", true)]
    #[case("hello", false)]
    #[case("", true)]
    #[case("a", true)]
    #[case("Äbä", true)]
    #[case("ab", false)]
    fn test_is_palindrome(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_palindrome(&units(input)), expected);
    }

    #[test]
    fn test_fold_case_keeps_surrogates() {
        assert_eq!(fold_case(0xD83C), 0xD83C);
        assert_eq!(fold_case(u16::from(b'Q')), u16::from(b'q'));
    }

    #[test]
    fn test_vector_length() {
        assert_eq!(vector_length(&Vector2f::new(3.0, 4.0)), 5.0);
    }
}
