use std::fmt;

use govlock_timelock::Progress;
use govlock_types::{Hash32, Timestamp};
use serde::{Deserialize, Serialize};

/// What a governance verb did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Queued {
        id: Hash32,
        ready_at: Timestamp,
    },
    NotYetReady {
        id: Hash32,
        ready_at: Timestamp,
        remaining_secs: u64,
    },
    Executed {
        id: Hash32,
    },
    AlreadyExecuted {
        id: Hash32,
    },
    Cancelled {
        id: Hash32,
    },
    /// Applied immediately on the fast path.
    Applied,
}

impl Outcome {
    pub fn id(&self) -> Option<Hash32> {
        match *self {
            Self::Queued { id, .. }
            | Self::NotYetReady { id, .. }
            | Self::Executed { id }
            | Self::AlreadyExecuted { id }
            | Self::Cancelled { id } => Some(id),
            Self::Applied => None,
        }
    }

    /// The change took effect during this call.
    pub fn took_effect(&self) -> bool {
        matches!(self, Self::Executed { .. } | Self::Applied)
    }
}

impl From<Progress> for Outcome {
    fn from(progress: Progress) -> Self {
        match progress {
            Progress::Queued { id, ready_at } => Self::Queued { id, ready_at },
            Progress::NotYetReady {
                id,
                ready_at,
                remaining_secs,
            } => Self::NotYetReady {
                id,
                ready_at,
                remaining_secs,
            },
            Progress::Executed { id } => Self::Executed { id },
            Progress::AlreadyExecuted { id } => Self::AlreadyExecuted { id },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued { id, ready_at } => {
                write!(f, "operation {id} queued, executable at {ready_at}")
            }
            Self::NotYetReady {
                id, remaining_secs, ..
            } => write!(f, "operation {id} not yet ready, {remaining_secs}s remaining"),
            Self::Executed { id } => write!(f, "operation {id} executed"),
            Self::AlreadyExecuted { id } => write!(f, "operation {id} was already executed"),
            Self::Cancelled { id } => write!(f, "operation {id} cancelled"),
            Self::Applied => f.write_str("applied directly"),
        }
    }
}
