use govlock_codec::CodecError;
use govlock_ledger::LedgerError;
use govlock_timelock::{TimelockError, TimelockRole};
use govlock_types::{Address, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("deployment has no {0}")]
    MissingContract(String),

    #[error("unknown parameter: {0}")]
    UnknownParam(String),

    #[error("{param} takes a {expected} value")]
    TypeMismatch { param: String, expected: String },

    #[error("{caller} may not call {selector} on {target}")]
    PermissionDenied {
        caller: Address,
        target: Address,
        selector: Selector,
    },

    #[error("{0} cannot be changed on the fast path")]
    FastPathNotAllowed(String),

    #[error("delay is already {0}s")]
    DelayUnchanged(u64),

    #[error("{account} does not hold the {role} role")]
    RoleNotHeld { role: TimelockRole, account: Address },

    #[error("post-condition failed for {what}: expected {expected}, found {actual}")]
    PostconditionMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl GovernanceError {
    /// The timelock error behind this failure, if any.
    pub fn as_timelock(&self) -> Option<&TimelockError> {
        match self {
            Self::Ledger(e) => e.as_timelock(),
            _ => None,
        }
    }

    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::PermissionDenied { .. } => true,
            Self::Ledger(e) => e.is_permission_error(),
            _ => false,
        }
    }
}
