//! The per-instance operation map.

use std::collections::BTreeMap;

use govlock_types::{Address, Hash32, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{Operation, OperationState, OperationStatus, TimelockError};

/// Operations owned by one timelock instance, keyed by id.
///
/// Entries are never removed: terminal operations stay for audit, and an id
/// can be scheduled only once in the lifetime of the instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationBook {
    operations: BTreeMap<Hash32, Operation>,
}

impl OperationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Hash32) -> Option<&Operation> {
        self.operations.get(id)
    }

    pub fn state(&self, id: &Hash32, now: Timestamp) -> OperationState {
        self.operations
            .get(id)
            .map_or(OperationState::Unset, |op| op.state(now))
    }

    /// Insert only if the id is unset (compare-and-set).
    pub fn insert_new(&mut self, op: Operation) -> Result<(), TimelockError> {
        use std::collections::btree_map::Entry;
        match self.operations.entry(op.id) {
            Entry::Occupied(_) => Err(TimelockError::AlreadyScheduled(op.id)),
            Entry::Vacant(slot) => {
                slot.insert(op);
                Ok(())
            }
        }
    }

    /// Move a scheduled operation to `Done`.
    pub fn mark_done(
        &mut self,
        id: &Hash32,
        at: Timestamp,
        executor: Address,
    ) -> Result<(), TimelockError> {
        self.transition(id, OperationStatus::Done { at, executor })
    }

    /// Move a scheduled operation to `Cancelled`.
    pub fn mark_cancelled(
        &mut self,
        id: &Hash32,
        at: Timestamp,
        by: Address,
    ) -> Result<(), TimelockError> {
        self.transition(id, OperationStatus::Cancelled { at, by })
    }

    fn transition(&mut self, id: &Hash32, to: OperationStatus) -> Result<(), TimelockError> {
        let op = self
            .operations
            .get_mut(id)
            .ok_or(TimelockError::NeverScheduled(*id))?;
        match op.status {
            OperationStatus::Scheduled => {
                op.status = to;
                Ok(())
            }
            OperationStatus::Done { .. } => Err(TimelockError::AlreadyDone(*id)),
            OperationStatus::Cancelled { .. } => Err(TimelockError::AlreadyCancelled(*id)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    pub fn in_state(&self, state: OperationState, now: Timestamp) -> Vec<&Operation> {
        self.iter().filter(|op| op.state(now) == state).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(n: u64) -> Operation {
        Operation {
            id: Hash32::from_low_u64(n),
            calls: vec![],
            batch: false,
            predecessor: Hash32::ZERO,
            salt: Hash32::ZERO,
            delay: 10,
            proposer: Address::ZERO,
            scheduled_at: Timestamp::new(0),
            ready_at: Timestamp::new(10),
            status: OperationStatus::Scheduled,
        }
    }

    #[test]
    fn test_insert_is_compare_and_set() {
        let mut book = OperationBook::new();
        book.insert_new(op(1)).unwrap();
        assert_eq!(
            book.insert_new(op(1)),
            Err(TimelockError::AlreadyScheduled(Hash32::from_low_u64(1)))
        );
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_terminals_are_exclusive() {
        let mut book = OperationBook::new();
        let id = Hash32::from_low_u64(2);
        book.insert_new(op(2)).unwrap();
        book.mark_done(&id, Timestamp::new(11), Address::ZERO).unwrap();
        assert_eq!(
            book.mark_cancelled(&id, Timestamp::new(12), Address::ZERO),
            Err(TimelockError::AlreadyDone(id))
        );

        let id = Hash32::from_low_u64(3);
        book.insert_new(op(3)).unwrap();
        book.mark_cancelled(&id, Timestamp::new(5), Address::ZERO).unwrap();
        assert_eq!(
            book.mark_done(&id, Timestamp::new(12), Address::ZERO),
            Err(TimelockError::AlreadyCancelled(id))
        );
        // a cancelled id can never be rescheduled
        assert!(book.insert_new(op(3)).is_err());
    }

    #[test]
    fn test_unknown_id_is_unset() {
        let book = OperationBook::new();
        let id = Hash32::from_low_u64(9);
        assert_eq!(book.state(&id, Timestamp::new(0)), OperationState::Unset);
        let mut book = book;
        assert_eq!(
            book.mark_done(&id, Timestamp::new(0), Address::ZERO),
            Err(TimelockError::NeverScheduled(id))
        );
    }

    #[test]
    fn test_in_state_uses_clock() {
        let mut book = OperationBook::new();
        book.insert_new(op(1)).unwrap();
        assert_eq!(book.in_state(OperationState::Pending, Timestamp::new(5)).len(), 1);
        assert_eq!(book.in_state(OperationState::Ready, Timestamp::new(10)).len(), 1);
    }
}
