//! Capability registry for govlock.
//!
//! A registry answers `can_call(caller, target, selector)`: the pair must not
//! be burned, and it must either be public or be enabled for at least one
//! role the caller holds. Registry mutations are themselves gated calls; in a
//! deployment the highsec timelock is the only role holder able to make them.

pub mod call;
pub mod error;
pub mod registry;
pub mod roles;

pub use call::{RegistryCall, RegistryFunction};
pub use error::RegistryError;
pub use registry::{Authority, CapabilityFlag, CapabilityRegistry};
pub use roles::RoleSet;
