//! Blake2b hashing for operation ids, snapshots and function selectors.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use govlock_types::{Hash32, Selector};

type Blake2b256 = Blake2b<U32>;

/// Blake2b-256 of `data`.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Blake2b-256 over the concatenation of `parts`, without building it.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    parts
        .iter()
        .fold(Blake2b256::new(), |hasher, part| hasher.chain_update(part))
        .finalize()
        .into()
}

pub fn hash32(data: &[u8]) -> Hash32 {
    Hash32::new(blake2b_256(data))
}

/// Selector of a canonical function signature: the first four digest bytes.
///
/// The signature must already be canonical (no spaces, no argument names);
/// `govlock-codec` normalises user input before calling this.
pub fn selector(signature: &str) -> Selector {
    let [a, b, c, d, ..] = blake2b_256(signature.as_bytes());
    Selector::new([a, b, c, d])
}
