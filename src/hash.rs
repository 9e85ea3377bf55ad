//! Short content hashes for class names, style ids and cache keys.
//!
//! Hashes are xxh3-64 digests rendered in base36, so they are safe to use
//! both as CSS class names (after a prefix) and as attribute values.

use xxhash_rust::xxh3::xxh3_64;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Hash a string into a short, lowercase base36 digest.
///
/// The same input always produces the same output, on every thread and in
/// every process, which is what keeps server and client ids in agreement.
pub fn hash(input: &str) -> String {
    to_base36(xxh3_64(input.as_bytes()))
}

/// Identity of a piece of generated css: the cache path it was generated
/// under concatenated with the css text itself.
pub fn unique_hash(path_key: &str, css: &str) -> String {
    let mut buf = String::with_capacity(path_key.len() + css.len());
    buf.push_str(path_key);
    buf.push_str(css);
    hash(&buf)
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::with_capacity(13);
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash("color:red;"), hash("color:red;"));
    }

    #[test]
    fn hash_differs_for_different_input() {
        assert_ne!(hash("a"), hash("b"));
    }

    #[test]
    fn hash_is_class_name_safe() {
        let h = hash("anything at all");
        assert!(!h.is_empty());
        assert!(h.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn base36_rendering() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn unique_hash_combines_path_and_css() {
        assert_eq!(unique_hash("a%b", "x{}"), hash("a%bx{}"));
        assert_ne!(unique_hash("a%b", "x{}"), unique_hash("a%c", "x{}"));
    }
}
