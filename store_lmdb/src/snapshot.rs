//! LMDB implementation of SnapshotStore.
//!
//! Keys are big-endian sequence numbers so LMDB's byte ordering matches
//! numeric ordering.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use govlock_store::{SnapshotStore, StoreError};

use crate::LmdbError;

pub struct LmdbSnapshotStore {
    pub(crate) env: Arc<Env>,
    pub(crate) snapshots_db: Database<Bytes, Bytes>,
}

fn decode_seq(key: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = key
        .try_into()
        .map_err(|_| StoreError::Corruption(format!("snapshot key of {} bytes", key.len())))?;
    Ok(u64::from_be_bytes(arr))
}

impl SnapshotStore for LmdbSnapshotStore {
    fn put_snapshot(&self, seq: u64, bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.snapshots_db
            .put(&mut wtxn, &seq.to_be_bytes(), bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(seq, bytes = bytes.len(), "snapshot stored");
        Ok(())
    }

    fn get_snapshot(&self, seq: u64) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .snapshots_db
            .get(&rtxn, &seq.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn latest_snapshot(&self) -> Result<Option<(u64, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self.snapshots_db.last(&rtxn).map_err(LmdbError::from)? {
            Some((key, val)) => Ok(Some((decode_seq(key)?, val.to_vec()))),
            None => Ok(None),
        }
    }

    fn snapshot_seqs(&self) -> Result<Vec<u64>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut seqs = Vec::new();
        for entry in self.snapshots_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, _) = entry.map_err(LmdbError::from)?;
            seqs.push(decode_seq(key)?);
        }
        Ok(seqs)
    }

    fn prune_before(&self, keep_from: u64) -> Result<u64, StoreError> {
        let stale: Vec<u64> = self
            .snapshot_seqs()?
            .into_iter()
            .filter(|seq| *seq < keep_from)
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for seq in &stale {
            self.snapshots_db
                .delete(&mut wtxn, &seq.to_be_bytes())
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::info!(pruned = stale.len(), keep_from, "old snapshots pruned");
        Ok(stale.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::LmdbEnvironment;
    use govlock_store::SnapshotStore;

    #[test]
    fn latest_follows_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open_default(dir.path()).unwrap();
        let store = env.snapshot_store().unwrap();

        assert!(store.latest_snapshot().unwrap().is_none());
        store.put_snapshot(2, b"two").unwrap();
        store.put_snapshot(256, b"big").unwrap();
        store.put_snapshot(10, b"ten").unwrap();

        assert_eq!(store.latest_snapshot().unwrap(), Some((256, b"big".to_vec())));
        assert_eq!(store.snapshot_seqs().unwrap(), vec![2, 10, 256]);
        assert_eq!(store.get_snapshot(10).unwrap(), Some(b"ten".to_vec()));
        assert_eq!(store.get_snapshot(11).unwrap(), None);
    }

    #[test]
    fn prune_keeps_recent() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open_default(dir.path()).unwrap();
        let store = env.snapshot_store().unwrap();
        for seq in 1..=5 {
            store.put_snapshot(seq, &[seq as u8]).unwrap();
        }
        assert_eq!(store.prune_before(4).unwrap(), 3);
        assert_eq!(store.snapshot_seqs().unwrap(), vec![4, 5]);
        assert_eq!(store.prune_before(4).unwrap(), 0);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open_default(dir.path()).unwrap();
            env.snapshot_store().unwrap().put_snapshot(7, b"state").unwrap();
        }
        let env = LmdbEnvironment::open_default(dir.path()).unwrap();
        let store = env.snapshot_store().unwrap();
        assert_eq!(store.latest_snapshot().unwrap(), Some((7, b"state".to_vec())));
    }
}
