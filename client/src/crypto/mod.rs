//! # Cryptographic Primitives
//!
//! Digest helpers and the request [`Signer`]. The gateway authenticates
//! every request with a keyed SHA-512 over a canonical parameter string;
//! nothing here talks to the network.

pub mod hash;
pub mod signer;

pub use hash::{constant_time_eq, sha512, sha512_hex};
pub use signer::{Params, SignedEnvelope, Signer};
