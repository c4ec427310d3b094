//! Local execution substrate for govlock.
//!
//! Hosts capability registries, timelock instances and parameter targets at
//! addresses, routes calls between them, and commits each mutation as one
//! atomic transaction. State survives restarts as hash-verified snapshots.

pub mod error;
pub mod genesis;
pub mod ledger;
pub mod shared;
pub mod snapshot;
pub mod state;
pub mod target;

pub use error::LedgerError;
pub use genesis::{
    CapabilitySpec, GenesisConfig, RegistrySpec, RoleSpec, SetterSpec, TargetSpec, TimelockSpec,
    ADMIN_ROLE, DECIMAL_PRECISION, HIGHSEC_MIN_DELAY, HIGHSEC_PARAMETERS_ROLE, LOWSEC_MIN_DELAY,
    LOWSEC_PARAMETERS_ROLE, MAX_FEE_BPS, MAX_REWARD_SPLIT, MINIMUM_GRACE_PERIOD,
    PAUSE_GUARDIAN_ROLE,
};
pub use ledger::Ledger;
pub use shared::SharedLedger;
pub use snapshot::{LedgerSnapshot, SNAPSHOT_VERSION};
pub use state::{ContractKind, LedgerState};
pub use target::{getter_selector, ParameterTarget, Setter};
