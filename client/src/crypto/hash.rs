//! # Hashing Utilities
//!
//! The gateway expects SHA-512 digests, hex-encoded in lowercase. These
//! helpers are the only place the crate touches `sha2` directly.

use sha2::{Digest, Sha512};

/// Compute the SHA-512 hash of the input data.
///
/// # Example
///
/// ```
/// use paygate_client::crypto::sha512;
///
/// let hash = sha512(b"merchant_id=ec000262");
/// assert_eq!(hash.len(), 64);
/// ```
pub fn sha512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 64];
    output.copy_from_slice(&result);
    output
}

/// SHA-512 as the 128-character lowercase hex string the gateway compares.
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(sha512(data))
}

/// Compares two byte strings without short-circuiting on the first
/// mismatch. Used when checking hashes supplied by the gateway.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha512_known_vector() {
        // NIST test vector for "abc".
        assert_eq!(
            sha512_hex(b"abc"),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn hex_is_lowercase_and_128_chars() {
        let h = sha512_hex(b"anything");
        assert_eq!(h.len(), 128);
        assert!(h.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn constant_time_eq_behaviour() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
