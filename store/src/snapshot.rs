//! Ledger snapshot storage trait.

use crate::StoreError;

/// Append-only history of serialized ledger snapshots.
///
/// Snapshots are keyed by a monotonically increasing sequence number (the
/// ledger's committed transaction count). The store treats them as opaque
/// bytes; integrity is verified by the ledger on load.
pub trait SnapshotStore {
    /// Store a snapshot under `seq`. Overwrites an existing entry.
    fn put_snapshot(&self, seq: u64, bytes: &[u8]) -> Result<(), StoreError>;

    /// Retrieve the snapshot stored under `seq`.
    fn get_snapshot(&self, seq: u64) -> Result<Option<Vec<u8>>, StoreError>;

    /// The snapshot with the highest sequence number.
    fn latest_snapshot(&self) -> Result<Option<(u64, Vec<u8>)>, StoreError>;

    /// All stored sequence numbers, ascending.
    fn snapshot_seqs(&self) -> Result<Vec<u64>, StoreError>;

    /// Drop every snapshot older than `keep_from`. Returns how many were removed.
    fn prune_before(&self, keep_from: u64) -> Result<u64, StoreError>;
}
