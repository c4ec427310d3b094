use govlock_authority::RegistryError;
use govlock_codec::CodecError;
use govlock_store::StoreError;
use govlock_timelock::TimelockError;
use govlock_types::{Address, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no contract at {0}")]
    UnknownTarget(Address),

    #[error("{0} is not a timelock")]
    UnknownTimelock(Address),

    #[error("{0} is not a capability registry")]
    UnknownRegistry(Address),

    #[error("{target} has no function with selector {selector}")]
    UnknownFunction { target: Address, selector: Selector },

    #[error("caller {caller} may not call {selector} on {target}")]
    PermissionDenied {
        caller: Address,
        target: Address,
        selector: Selector,
    },

    #[error("{target} does not accept value (sent {value})")]
    NonPayable { target: Address, value: u128 },

    #[error("value {value} for {slot} outside [{min}, {max}]")]
    OutOfBounds {
        slot: String,
        value: u128,
        min: u128,
        max: u128,
    },

    #[error("address {0} is already in use")]
    DuplicateAddress(Address),

    #[error("invalid genesis: {0}")]
    Genesis(String),

    #[error("snapshot hash mismatch: stored {stored}, computed {computed}")]
    SnapshotMismatch { stored: String, computed: String },

    #[error("unsupported snapshot version {0}")]
    SnapshotVersion(u32),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Timelock(#[from] TimelockError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Caller lacked a role or capability, at whatever layer it was checked.
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::PermissionDenied { .. } => true,
            Self::Registry(RegistryError::Unauthorized { .. }) => true,
            Self::Timelock(e) => e.is_permission_error(),
            _ => false,
        }
    }

    /// The timelock error behind this failure, if any.
    pub fn as_timelock(&self) -> Option<&TimelockError> {
        match self {
            Self::Timelock(e) => Some(e),
            _ => None,
        }
    }
}
