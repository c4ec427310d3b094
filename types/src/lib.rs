//! Fundamental types for the govlock governance engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! ledger addresses, 32-byte hashes (operation ids, salts), function selectors,
//! registry role ids, timestamps and the clock abstraction.

pub mod address;
pub mod error;
pub mod hash;
pub mod role;
pub mod selector;
mod serde_hex;
pub mod time;

pub use address::Address;
pub use error::TypesError;
pub use hash::Hash32;
pub use role::RoleId;
pub use selector::Selector;
pub use time::{Clock, SystemClock, Timestamp};
