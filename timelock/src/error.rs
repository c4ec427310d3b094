use govlock_types::{Address, Hash32, Selector, Timestamp};
use thiserror::Error;

use crate::TimelockRole;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelockError {
    #[error("{account} lacks the {role} role")]
    PermissionDenied { account: Address, role: TimelockRole },

    #[error("timelock may not call {selector} on {target}")]
    NotAuthorized { target: Address, selector: Selector },

    #[error("delay {delay}s must exceed the minimum delay {min_delay}s")]
    DelayTooLow { delay: u64, min_delay: u64 },

    #[error("operation {0} is already scheduled")]
    AlreadyScheduled(Hash32),

    #[error("operation {id} is not ready: {remaining_secs}s remaining (ready at {ready_at})")]
    NotYetReady {
        id: Hash32,
        ready_at: Timestamp,
        remaining_secs: u64,
    },

    #[error("operation {0} has already been executed")]
    AlreadyDone(Hash32),

    #[error("operation {0} was cancelled")]
    AlreadyCancelled(Hash32),

    #[error("operation {0} was never scheduled")]
    NeverScheduled(Hash32),

    #[error("operation {id} waits on predecessor {predecessor}")]
    PredecessorNotDone { id: Hash32, predecessor: Hash32 },

    #[error("only the timelock itself may do this (caller {caller})")]
    OnlySelf { caller: Address },

    #[error("a batch needs at least one call")]
    EmptyBatch,

    #[error("call to {target} reverted: {reason}")]
    CallReverted { target: Address, reason: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("codec error: {0}")]
    Codec(#[from] govlock_codec::CodecError),
}

impl TimelockError {
    /// Waiting will resolve this error.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::NotYetReady { .. })
    }

    /// Role or capability failures. Never retried.
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::NotAuthorized { .. } | Self::OnlySelf { .. }
        )
    }
}
