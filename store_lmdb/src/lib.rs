//! LMDB storage backend for govlock.
//!
//! Implements the storage traits from `govlock-store` using the `heed` LMDB
//! bindings. Each logical store maps to one LMDB database within a single
//! environment.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod snapshot;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use meta::LmdbMetaStore;
pub use migration::Migrator;
pub use snapshot::LmdbSnapshotStore;
