//! Schema versioning for the data directory.
//!
//! The meta store records the layout version a directory was written with.
//! Opening a directory applies every migration between that version and
//! [`CURRENT_SCHEMA_VERSION`] in order; a directory written by a newer build
//! is refused.

use govlock_store::{MetaStore, StoreError};

use crate::LmdbError;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Meta key naming the snapshot encoding, written by the first migration.
pub const SNAPSHOT_ENCODING_KEY: &str = "snapshot_encoding";

struct Migration {
    to: u32,
    description: &'static str,
    apply: fn(&dyn MetaStore) -> Result<(), StoreError>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    to: 1,
    description: "snapshots keyed by big-endian sequence, bincode encoded",
    apply: |meta| meta.put_meta(SNAPSHOT_ENCODING_KEY, b"bincode-v1"),
}];

pub struct Migrator;

impl Migrator {
    pub fn run(meta_store: &dyn MetaStore) -> Result<(), LmdbError> {
        let stored = meta_store.get_schema_version().map_err(schema_error)?;
        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Schema(format!(
                "data directory has schema {stored}, this build supports up to {CURRENT_SCHEMA_VERSION}"
            )));
        }

        for migration in MIGRATIONS.iter().filter(|m| m.to > stored) {
            tracing::info!(to = migration.to, description = migration.description, "applying migration");
            (migration.apply)(meta_store).map_err(schema_error)?;
            meta_store.set_schema_version(migration.to).map_err(schema_error)?;
        }

        tracing::debug!(version = CURRENT_SCHEMA_VERSION, "schema up to date");
        Ok(())
    }
}

fn schema_error(e: StoreError) -> LmdbError {
    LmdbError::Schema(e.to_string())
}
