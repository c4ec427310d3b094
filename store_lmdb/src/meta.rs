//! LMDB implementation of MetaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use govlock_store::meta::MetaStore;
use govlock_store::StoreError;

use crate::LmdbError;

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbMetaStore {
    fn write(&self, f: impl FnOnce(&mut RwTxn) -> heed::Result<()>) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        f(&mut wtxn).map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.write(|wtxn| self.meta_db.put(wtxn, key.as_bytes(), value))
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.write(|wtxn| self.meta_db.delete(wtxn, key.as_bytes()).map(|_| ()))
    }
}
