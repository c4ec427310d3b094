//! Timelock roles and their translation table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of timelock roles.
///
/// | role      | ledger id | legacy key            |
/// |-----------|-----------|-----------------------|
/// | Admin     | 0         | `TIMELOCK_ADMIN_ROLE` |
/// | Proposer  | 1         | `PROPOSER_ROLE`       |
/// | Executor  | 2         | `EXECUTOR_ROLE`       |
/// | Canceller | 3         | `CANCELLER_ROLE`      |
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimelockRole {
    Admin,
    Proposer,
    Executor,
    Canceller,
}

impl TimelockRole {
    pub const ALL: [TimelockRole; 4] = [
        Self::Admin,
        Self::Proposer,
        Self::Executor,
        Self::Canceller,
    ];

    pub fn ledger_id(&self) -> u8 {
        match self {
            Self::Admin => 0,
            Self::Proposer => 1,
            Self::Executor => 2,
            Self::Canceller => 3,
        }
    }

    pub fn from_ledger_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.ledger_id() == id)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Admin => "TIMELOCK_ADMIN_ROLE",
            Self::Proposer => "PROPOSER_ROLE",
            Self::Executor => "EXECUTOR_ROLE",
            Self::Canceller => "CANCELLER_ROLE",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Proposer => "proposer",
            Self::Executor => "executor",
            Self::Canceller => "canceller",
        }
    }
}

impl fmt::Display for TimelockRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimelockRole {
    type Err = String;

    /// Accepts the short name, the legacy key, or the ledger id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| {
                r.name().eq_ignore_ascii_case(s)
                    || r.key().eq_ignore_ascii_case(s)
                    || s.parse::<u8>().ok() == Some(r.ledger_id())
            })
            .ok_or_else(|| format!("unknown timelock role: {s}"))
    }
}
