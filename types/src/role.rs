//! Registry role identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// A registry role: an integer bucket in `[0, 255]`.
///
/// Roles exist implicitly from their first reference; only their name is
/// stored separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(pub u8);

impl RoleId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoleId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map(Self)
            .map_err(|_| TypesError::InvalidRole(s.to_string()))
    }
}

impl From<u8> for RoleId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}
