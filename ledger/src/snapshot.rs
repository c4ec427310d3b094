//! Ledger snapshots: the full contract state at a committed sequence number.
//!
//! Snapshots are how the ledger survives restarts. The hash is Blake2b over
//! the bincode encoding of everything else in the snapshot, so a snapshot
//! read back from storage can be verified before it is trusted.

use govlock_crypto::blake2b_256_multi;
use govlock_types::{Hash32, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, LedgerState};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Blake2b-256 of the other fields.
    pub hash: Hash32,
    /// Number of committed transactions at capture time.
    pub seq: u64,
    pub created_at: Timestamp,
    pub version: u32,
    pub state: LedgerState,
}

impl LedgerSnapshot {
    pub fn create(state: LedgerState, seq: u64, created_at: Timestamp) -> Result<Self, LedgerError> {
        let mut snap = Self {
            hash: Hash32::ZERO,
            seq,
            created_at,
            version: SNAPSHOT_VERSION,
            state,
        };
        snap.hash = snap.compute_hash()?;
        Ok(snap)
    }

    fn compute_hash(&self) -> Result<Hash32, LedgerError> {
        let state =
            bincode::serialize(&self.state).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        Ok(Hash32::new(blake2b_256_multi(&[
            &self.version.to_le_bytes(),
            &self.seq.to_le_bytes(),
            &self.created_at.as_secs().to_le_bytes(),
            &state,
        ])))
    }

    pub fn verify(&self) -> Result<(), LedgerError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(LedgerError::SnapshotVersion(self.version));
        }
        let computed = self.compute_hash()?;
        if computed != self.hash {
            return Err(LedgerError::SnapshotMismatch {
                stored: self.hash.to_string(),
                computed: computed.to_string(),
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Deserialize and verify.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let snap: Self =
            bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        snap.verify()?;
        Ok(snap)
    }
}
