//! Hash primitives for govlock.
//!
//! - **Blake2b-256** for operation ids and snapshot integrity hashes
//! - **Selectors**: the leading 4 bytes of the digest of a canonical
//!   function signature such as `setGracePeriod(uint128)`

pub mod hash;

pub use hash::{blake2b_256, blake2b_256_multi, hash32, selector};
