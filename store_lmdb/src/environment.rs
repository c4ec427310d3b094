//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Env, EnvOpenOptions};

use crate::{LmdbError, LmdbMetaStore, LmdbSnapshotStore};

pub const SNAPSHOTS_DB: &str = "snapshots";
pub const META_DB: &str = "meta";

/// Default map size: snapshots are small, 256 MiB is ample.
pub const DEFAULT_MAP_SIZE: usize = 256 * 1024 * 1024;
pub const DEFAULT_MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and hands out database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per path per process and the
        // data file is not modified by anything outside LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };
        tracing::debug!(path = %path.display(), map_size, max_dbs, "LMDB environment opened");
        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
        })
    }

    pub fn open_default(path: &Path) -> Result<Self, LmdbError> {
        Self::open(path, DEFAULT_MAX_DBS, DEFAULT_MAP_SIZE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    fn create_db(&self, name: &str) -> Result<heed::Database<Bytes, Bytes>, LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        let db = self
            .env
            .create_database::<Bytes, Bytes>(&mut wtxn, Some(name))?;
        wtxn.commit()?;
        Ok(db)
    }

    pub fn snapshot_store(&self) -> Result<LmdbSnapshotStore, LmdbError> {
        Ok(LmdbSnapshotStore {
            env: Arc::clone(&self.env),
            snapshots_db: self.create_db(SNAPSHOTS_DB)?,
        })
    }

    pub fn meta_store(&self) -> Result<LmdbMetaStore, LmdbError> {
        Ok(LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.create_db(META_DB)?,
        })
    }
}
