//! Timelock instances for govlock.
//!
//! An instance queues operations, makes them executable only after its
//! delay has elapsed and executes each at most once. Pending vs Ready is
//! never stored: it is derived from the clock whenever the state is read.
//!
//! Operation lifecycle:
//!
//! ```text
//! Unset ──schedule──▶ Pending ──(clock ≥ ready_at)──▶ Ready ──execute──▶ Done
//!                        │                              │
//!                        └───────────cancel─────────────┴──▶ Cancelled
//! ```

pub mod book;
pub mod call;
pub mod environment;
pub mod error;
pub mod instance;
pub mod operation;
pub mod role;

pub use book::OperationBook;
pub use call::TimelockCall;
pub use environment::{DispatchError, Environment};
pub use error::TimelockError;
pub use instance::{Progress, TimelockInstance};
pub use operation::{Operation, OperationState, OperationStatus};
pub use role::TimelockRole;
