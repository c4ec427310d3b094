//! What a timelock needs from the ledger it runs on.

use govlock_codec::OperationCall;
use govlock_types::{Address, Selector, Timestamp};

pub type DispatchError = Box<dyn std::error::Error + Send + Sync>;

/// The execution substrate as seen from inside a timelock.
///
/// Calls the timelock addresses to itself never reach `dispatch`; the
/// instance handles them directly.
pub trait Environment {
    fn now(&self) -> Timestamp;

    /// Whether `caller` may invoke `selector` on `target`, as decided by the
    /// authority governing `target`.
    fn can_call(&self, caller: Address, target: Address, selector: Selector) -> bool;

    /// Perform `call` as `caller`, returning the call's return data.
    fn dispatch(&mut self, caller: Address, call: &OperationCall) -> Result<Vec<u8>, DispatchError>;
}
