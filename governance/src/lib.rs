//! Governance client for govlock.
//!
//! Wraps a shared ledger with the verbs an operator uses: change a governed
//! parameter through the lowsec or highsec timelock, flip an emergency
//! switch on the fast path, administer the capability registry (always
//! through highsec), and manage timelock roles, delays and cancellations.

pub mod client;
pub mod contracts;
pub mod error;
pub mod outcome;
pub mod params;

pub use client::GovernanceClient;
pub use contracts::{Contract, ContractBook, SecurityTier};
pub use error::GovernanceError;
pub use outcome::Outcome;
pub use params::GovernedParam;
