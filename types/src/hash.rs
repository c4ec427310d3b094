//! 32-byte hash type used for operation ids, predecessors and salts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::serde_hex;
use crate::TypesError;

/// A 32-byte value: an operation id, a predecessor reference, or a salt.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash32([u8; 32]);

impl Hash32 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// A salt/predecessor whose last byte is `n` (`0x…01`, `0x…02`, …).
    pub fn from_low_u64(n: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&n.to_be_bytes());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Hash32 {
    type Err = TypesError;

    /// Accepts the full 32-byte form and the shorthand `0x0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "0x0" || s == "0" {
            return Ok(Self::ZERO);
        }
        serde_hex::parse_fixed::<32>(s).map(Self)
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_hex::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_hex::deserialize::<D, 32>(deserializer).map(Self)
    }
}
