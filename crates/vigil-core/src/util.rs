//! Small shared helpers.

use rand::Rng;

const HEX_LOWER: &[u8] = b"0123456789abcdef";
const NUMERIC: &[u8] = b"0123456789";

/// Random lowercase hex string of length `n`.
pub fn rand_hex(n: usize) -> String {
    rand_string(n, HEX_LOWER)
}

/// Random numeric string of length `n`.
pub fn rand_numeric(n: usize) -> String {
    rand_string(n, NUMERIC)
}

fn rand_string(n: usize, alphabet: &[u8]) -> String {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

/// Prefixes `value` unless it is empty.
///
/// URL builders use this for optional segments: an empty port renders
/// nothing, a set port renders `:8443`.
pub fn prefix_unless_empty(value: &str, prefix: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("{prefix}{value}")
    }
}

/// Suffixes `value` unless it is empty.
pub fn suffix_unless_empty(value: &str, suffix: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("{value}{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_hex_shape() {
        let s = rand_hex(40);
        assert_eq!(s.len(), 40);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn rand_numeric_shape() {
        let s = rand_numeric(9);
        assert_eq!(s.len(), 9);
        assert!(s.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn optional_segments() {
        assert_eq!(prefix_unless_empty("8443", ":"), ":8443");
        assert_eq!(prefix_unless_empty("", ":"), "");
        assert_eq!(suffix_unless_empty("user", "@"), "user@");
        assert_eq!(suffix_unless_empty("", "@"), "");
    }
}
