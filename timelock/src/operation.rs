//! Operations and their lifecycle states.

use std::fmt;

use govlock_codec::OperationCall;
use govlock_types::{Address, Hash32, Timestamp};
use serde::{Deserialize, Serialize};

/// What is stored for a scheduled operation.
///
/// `Pending` and `Ready` are not stored: both are `Scheduled`, told apart
/// by comparing the clock against `ready_at`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Scheduled,
    Done { at: Timestamp, executor: Address },
    Cancelled { at: Timestamp, by: Address },
}

/// Observable state of an operation id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationState {
    Unset,
    Pending,
    Ready,
    Done,
    Cancelled,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// Scheduled and not yet executed or cancelled.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Ready)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unset => "unset",
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: Hash32,
    /// One entry for a single operation, several for a batch.
    pub calls: Vec<OperationCall>,
    pub batch: bool,
    pub predecessor: Hash32,
    pub salt: Hash32,
    pub delay: u64,
    pub proposer: Address,
    pub scheduled_at: Timestamp,
    pub ready_at: Timestamp,
    pub status: OperationStatus,
}

impl Operation {
    pub fn state(&self, now: Timestamp) -> OperationState {
        match self.status {
            OperationStatus::Done { .. } => OperationState::Done,
            OperationStatus::Cancelled { .. } => OperationState::Cancelled,
            OperationStatus::Scheduled if now >= self.ready_at => OperationState::Ready,
            OperationStatus::Scheduled => OperationState::Pending,
        }
    }

    /// Seconds until the operation becomes ready (0 once ready).
    pub fn remaining_secs(&self, now: Timestamp) -> u64 {
        self.ready_at.remaining_from(now)
    }

    /// Seconds since the operation was scheduled.
    pub fn age(&self, now: Timestamp) -> u64 {
        self.scheduled_at.elapsed_since(now)
    }

    pub fn has_predecessor(&self) -> bool {
        !self.predecessor.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(status: OperationStatus) -> Operation {
        Operation {
            id: Hash32::from_low_u64(1),
            calls: vec![],
            batch: false,
            predecessor: Hash32::ZERO,
            salt: Hash32::ZERO,
            delay: 100,
            proposer: Address::ZERO,
            scheduled_at: Timestamp::new(1_000),
            ready_at: Timestamp::new(1_100),
            status,
        }
    }

    #[test]
    fn test_pending_becomes_ready_at_ready_at() {
        let op = op(OperationStatus::Scheduled);
        assert_eq!(op.state(Timestamp::new(1_099)), OperationState::Pending);
        assert_eq!(op.remaining_secs(Timestamp::new(1_099)), 1);
        assert_eq!(op.state(Timestamp::new(1_100)), OperationState::Ready);
        assert_eq!(op.remaining_secs(Timestamp::new(2_000)), 0);
        assert_eq!(op.age(Timestamp::new(1_099)), 99);
        assert_eq!(op.age(Timestamp::new(500)), 0);
    }

    #[test]
    fn test_terminal_states_ignore_clock() {
        let done = op(OperationStatus::Done {
            at: Timestamp::new(1_200),
            executor: Address::ZERO,
        });
        assert_eq!(done.state(Timestamp::new(0)), OperationState::Done);
        let cancelled = op(OperationStatus::Cancelled {
            at: Timestamp::new(1_050),
            by: Address::ZERO,
        });
        assert_eq!(cancelled.state(Timestamp::new(5_000)), OperationState::Cancelled);
        assert!(OperationState::Cancelled.is_terminal());
        assert!(!OperationState::Ready.is_terminal());
    }
}
