//! Request signing with the merchant's shared secret.
//!
//! The canonical form of a parameter set is every `key=value` pair except
//! the hash field itself, sorted by key in byte order and joined with `&`.
//! The hash is `hex(SHA-512(canonical || secret))`. The gateway recomputes
//! the same string from the body it receives, so the values signed here
//! must be exactly the strings that get transmitted.

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use super::hash::{constant_time_eq, sha512_hex};
use crate::config::{ConfigError, HASH_FIELD};

/// A flat, key-sorted parameter set. `BTreeMap<String, _>` orders keys by
/// their UTF-8 bytes, which is the ordering the gateway uses.
pub type Params = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// SignedEnvelope
// ---------------------------------------------------------------------------

/// The canonical string of a parameter set plus its derived hash.
///
/// Recomputed for every request and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// `k1=v1&k2=v2...` without the secret.
    pub canonical: String,
    /// Lowercase hex SHA-512.
    pub hash: String,
}

impl fmt::Debug for SignedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedEnvelope")
            .field("canonical", &self.canonical)
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Keyed hasher for gateway requests and callbacks.
///
/// Signing is pure: the same parameters always yield the same hash, in any
/// insertion order.
#[derive(Clone)]
pub struct Signer {
    secret: SecretString,
}

impl Signer {
    /// Creates a signer. An empty secret is a configuration error, surfaced
    /// when the client is constructed rather than on the first request.
    pub fn new(secret: SecretString) -> Result<Self, ConfigError> {
        if secret.expose_secret().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(Self { secret })
    }

    /// Builds the canonical `key=value&...` string, skipping the hash field.
    ///
    /// If a key appears more than once, the last value wins.
    pub fn canonicalize<I, K, V>(params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sorted: Params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k != HASH_FIELD)
            .collect();

        let mut out = String::with_capacity(sorted.len() * 24);
        for (i, (key, value)) in sorted.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }

    /// Signs a parameter set and returns the hex digest.
    pub fn sign<I, K, V>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envelope(params).hash
    }

    /// Signs a parameter set and keeps the canonical string alongside the hash.
    pub fn envelope<I, K, V>(&self, params: I) -> SignedEnvelope
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let canonical = Self::canonicalize(params);
        let mut material = Vec::with_capacity(canonical.len() + self.secret.expose_secret().len());
        material.extend_from_slice(canonical.as_bytes());
        material.extend_from_slice(self.secret.expose_secret().as_bytes());
        let hash = sha512_hex(&material);
        SignedEnvelope { canonical, hash }
    }

    /// Checks a hash received from the gateway against the parameters it
    /// accompanied. Hex case is ignored.
    pub fn verify<I, K, V>(&self, params: I, hash: &str) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let expected = self.sign(params);
        constant_time_eq(expected.as_bytes(), hash.to_ascii_lowercase().as_bytes())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("secret", &"[REDACTED]").finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> Signer {
        Signer::new(SecretString::new("topsecret".into())).unwrap()
    }

    fn sample() -> Vec<(&'static str, &'static str)> {
        vec![
            ("req_time", "20260101120000"),
            ("merchant_id", "ec000262"),
            ("amount", "25.00"),
            ("currency", "USD"),
            ("order_id", "ORD-1001"),
        ]
    }

    /// Heap's algorithm, enough for the handful of fields used here.
    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        fn go<T: Clone>(k: usize, a: &mut Vec<T>, out: &mut Vec<Vec<T>>) {
            if k == 1 {
                out.push(a.clone());
                return;
            }
            go(k - 1, a, out);
            for i in 0..k - 1 {
                if k % 2 == 0 {
                    a.swap(i, k - 1);
                } else {
                    a.swap(0, k - 1);
                }
                go(k - 1, a, out);
            }
        }
        let mut a = items.to_vec();
        let mut out = Vec::new();
        go(a.len(), &mut a, &mut out);
        out
    }

    #[test]
    fn empty_secret_rejected() {
        let err = Signer::new(SecretString::new(String::new())).unwrap_err();
        assert_eq!(err, ConfigError::MissingSecret);
    }

    #[test]
    fn canonical_form_is_sorted_and_joined() {
        let canonical = Signer::canonicalize(vec![("b", "2"), ("a", "1"), ("c", "3")]);
        assert_eq!(canonical, "a=1&b=2&c=3");
    }

    #[test]
    fn canonical_order_is_byte_order() {
        // Uppercase sorts before lowercase, '_' (0x5F) before lowercase too.
        let canonical = Signer::canonicalize(vec![("b", "1"), ("B", "2"), ("a_b", "3"), ("ab", "4")]);
        assert_eq!(canonical, "B=2&a_b=3&ab=4&b=1");
    }

    #[test]
    fn hash_field_is_excluded() {
        let with_hash = Signer::canonicalize(vec![("a", "1"), ("hash", "deadbeef")]);
        assert_eq!(with_hash, "a=1");
    }

    #[test]
    fn matches_manual_digest() {
        let s = signer();
        let hash = s.sign(vec![("b", "2"), ("a", "1")]);
        assert_eq!(hash, sha512_hex(b"a=1&b=2topsecret"));
    }

    #[test]
    fn signing_is_deterministic() {
        let s = signer();
        assert_eq!(s.sign(sample()), s.sign(sample()));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let s = signer();
        let reference = s.sign(sample());
        for perm in permutations(&sample()) {
            assert_eq!(s.sign(perm), reference);
        }
    }

    #[test]
    fn secret_changes_hash() {
        let other = Signer::new(SecretString::new("another".into())).unwrap();
        assert_ne!(signer().sign(sample()), other.sign(sample()));
    }

    #[test]
    fn verify_detects_tampering() {
        let s = signer();
        let hash = s.sign(sample());
        assert!(s.verify(sample(), &hash));
        assert!(s.verify(sample(), &hash.to_ascii_uppercase()));

        let mut tampered = sample();
        tampered[2] = ("amount", "2500.00");
        assert!(!s.verify(tampered, &hash));
    }

    #[test]
    fn debug_never_shows_secret_or_hash() {
        let s = signer();
        let env = s.envelope(sample());
        assert!(!format!("{:?}", s).contains("topsecret"));
        assert!(!format!("{:?}", env).contains(&env.hash));
    }
}
