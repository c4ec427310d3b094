//! Abstract storage traits for govlock.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The ledger depends only on the traits.

pub mod error;
pub mod meta;
pub mod snapshot;

pub use error::StoreError;
pub use meta::MetaStore;
pub use snapshot::SnapshotStore;
