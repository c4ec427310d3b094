//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use govlock_store::{MetaStore, SnapshotStore, StoreError};

/// An in-memory snapshot history.
#[derive(Default)]
pub struct NullSnapshotStore {
    snapshots: Mutex<BTreeMap<u64, Vec<u8>>>,
}

impl NullSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored snapshot in place (for corruption tests).
    pub fn tamper(&self, seq: u64, f: impl FnOnce(&mut Vec<u8>)) {
        if let Some(bytes) = self.snapshots.lock().unwrap().get_mut(&seq) {
            f(bytes);
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for NullSnapshotStore {
    fn put_snapshot(&self, seq: u64, bytes: &[u8]) -> Result<(), StoreError> {
        self.snapshots.lock().unwrap().insert(seq, bytes.to_vec());
        Ok(())
    }

    fn get_snapshot(&self, seq: u64) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.snapshots.lock().unwrap().get(&seq).cloned())
    }

    fn latest_snapshot(&self) -> Result<Option<(u64, Vec<u8>)>, StoreError> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .last_key_value()
            .map(|(seq, bytes)| (*seq, bytes.clone())))
    }

    fn snapshot_seqs(&self) -> Result<Vec<u64>, StoreError> {
        Ok(self.snapshots.lock().unwrap().keys().copied().collect())
    }

    fn prune_before(&self, keep_from: u64) -> Result<u64, StoreError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let before = snapshots.len();
        snapshots.retain(|seq, _| *seq >= keep_from);
        Ok((before - snapshots.len()) as u64)
    }
}

/// An in-memory metadata store.
#[derive(Default)]
pub struct NullMetaStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl NullMetaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetaStore for NullMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
