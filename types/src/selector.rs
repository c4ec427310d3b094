//! Function selectors: the 4-byte prefix of every call payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::serde_hex;
use crate::TypesError;

/// The first four bytes of a payload, identifying the target function.
///
/// Derived from the canonical signature string (see `govlock-crypto`);
/// capabilities in the registry are keyed by `(target, selector)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector([u8; 4]);

impl Selector {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Leading selector of a payload, if the payload is long enough to carry one.
    pub fn of_payload(payload: &[u8]) -> Option<Self> {
        payload.get(..4).map(|head| {
            let mut out = [0u8; 4];
            out.copy_from_slice(head);
            Self(out)
        })
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Selector {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_hex::parse_fixed::<4>(s).map(Self)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_hex::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_hex::deserialize::<D, 4>(deserializer).map(Self)
    }
}
