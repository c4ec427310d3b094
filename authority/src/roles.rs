//! Fixed 256-bit role sets.

use govlock_types::RoleId;
use serde::{Deserialize, Serialize};

/// A set of registry roles, one bit per role id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleSet([u64; 4]);

impl RoleSet {
    pub const EMPTY: Self = Self([0; 4]);

    fn slot(role: RoleId) -> (usize, u64) {
        let id = role.get() as usize;
        (id / 64, 1u64 << (id % 64))
    }

    pub fn contains(&self, role: RoleId) -> bool {
        let (word, bit) = Self::slot(role);
        self.0[word] & bit != 0
    }

    pub fn insert(&mut self, role: RoleId) {
        let (word, bit) = Self::slot(role);
        self.0[word] |= bit;
    }

    pub fn remove(&mut self, role: RoleId) {
        let (word, bit) = Self::slot(role);
        self.0[word] &= !bit;
    }

    pub fn set(&mut self, role: RoleId, enabled: bool) {
        if enabled {
            self.insert(role);
        } else {
            self.remove(role);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    /// Whether the two sets share at least one role.
    pub fn intersects(&self, other: &RoleSet) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a & b != 0)
    }

    /// Roles in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = RoleId> + '_ {
        (0..=u8::MAX)
            .map(RoleId::new)
            .filter(move |r| self.contains(*r))
    }

    /// The raw bitmask words, lowest roles first.
    pub fn words(&self) -> [u64; 4] {
        self.0
    }
}

impl FromIterator<RoleId> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleId>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for role in iter {
            set.insert(role);
        }
        set
    }
}
