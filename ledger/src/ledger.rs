//! The ledger: serialized, atomic transactions over [`LedgerState`].
//!
//! Every mutating entry point runs inside [`Ledger::transact`], which
//! checkpoints the state first and restores it if the transaction fails, so
//! a failed batch or a reverted call leaves nothing behind.

use std::sync::Arc;

use govlock_codec::OperationCall;
use govlock_store::SnapshotStore;
use govlock_timelock::{Progress, TimelockError, TimelockInstance};
use govlock_types::{Address, Clock, Hash32, Selector, Timestamp};
use govlock_utils::StatsCounter;

use crate::state::Substrate;
use crate::{GenesisConfig, LedgerError, LedgerSnapshot, LedgerState};

pub const SCHEDULED: &str = "scheduled";
pub const EXECUTED: &str = "executed";
pub const CANCELLED: &str = "cancelled";
pub const DIRECT_CALLS: &str = "direct_calls";
pub const ROLLED_BACK: &str = "rolled_back";

pub const COUNTERS: [&str; 5] = [SCHEDULED, EXECUTED, CANCELLED, DIRECT_CALLS, ROLLED_BACK];

pub struct Ledger {
    state: LedgerState,
    clock: Arc<dyn Clock>,
    /// Ledger time never reads earlier than this: the time of the snapshot
    /// the ledger resumed from.
    floor: Timestamp,
    stats: StatsCounter,
    /// Committed transactions.
    seq: u64,
}

impl Ledger {
    pub fn new(state: LedgerState, clock: Arc<dyn Clock>) -> Self {
        Self {
            state,
            clock,
            floor: Timestamp::EPOCH,
            stats: StatsCounter::new(&COUNTERS),
            seq: 0,
        }
    }

    pub fn from_genesis(genesis: &GenesisConfig, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        Ok(Self::new(genesis.build()?, clock))
    }

    /// Resume from a verified snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        snapshot.verify()?;
        let now = clock.now();
        if now < snapshot.created_at {
            tracing::warn!(
                now = %now,
                snapshot_time = %snapshot.created_at,
                "clock is behind the snapshot, holding ledger time at the snapshot"
            );
        }
        let mut ledger = Self::new(snapshot.state, clock);
        ledger.seq = snapshot.seq;
        ledger.floor = snapshot.created_at;
        Ok(ledger)
    }

    /// Load the latest snapshot from `store`, or deploy `genesis` if the
    /// store is empty.
    pub fn open(
        store: &dyn SnapshotStore,
        genesis: &GenesisConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        match store.latest_snapshot()? {
            Some((seq, bytes)) => {
                let snapshot = LedgerSnapshot::from_bytes(&bytes)?;
                tracing::info!(seq, hash = %snapshot.hash, "ledger restored from snapshot");
                Self::from_snapshot(snapshot, clock)
            }
            None => {
                tracing::info!("no snapshot found, deploying genesis");
                Self::from_genesis(genesis, clock)
            }
        }
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        LedgerSnapshot::create(self.state.clone(), self.seq, self.now())
    }

    /// Write a snapshot at the current sequence number. Returns that number.
    pub fn persist(&self, store: &dyn SnapshotStore) -> Result<u64, LedgerError> {
        let snapshot = self.snapshot()?;
        store.put_snapshot(self.seq, &snapshot.to_bytes()?)?;
        tracing::debug!(seq = self.seq, hash = %snapshot.hash, "snapshot persisted");
        Ok(self.seq)
    }

    // ── Views ───────────────────────────────────────────────────────────

    pub fn now(&self) -> Timestamp {
        self.clock.now().max(self.floor)
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    pub fn can_call(&self, caller: Address, target: Address, selector: Selector) -> bool {
        self.state.can_call(caller, target, selector)
    }

    pub fn timelock(&self, address: Address) -> Result<&TimelockInstance, LedgerError> {
        self.state
            .timelock(address)
            .ok_or(LedgerError::UnknownTimelock(address))
    }

    /// Run a read-only call (a getter) against a scratch copy of the state.
    pub fn view(&self, target: Address, payload: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let mut scratch = self.state.clone();
        scratch.dispatch(Address::ZERO, &OperationCall::new(target, payload.to_vec()))
    }

    // ── Transactions ────────────────────────────────────────────────────

    /// Run `f` atomically. On error the state is restored to what it was
    /// before `f` ran. Only a transaction that changed the state advances
    /// the sequence number.
    pub fn transact<T>(
        &mut self,
        label: &str,
        f: impl FnOnce(&mut LedgerState, Timestamp) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let checkpoint = self.state.clone();
        let now = self.now();
        match f(&mut self.state, now) {
            Ok(value) => {
                if self.state != checkpoint {
                    self.seq += 1;
                }
                Ok(value)
            }
            Err(e) => {
                self.state = checkpoint;
                self.stats.increment(ROLLED_BACK);
                tracing::warn!(transaction = label, error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    /// Run `f` against the timelock at `address` with the rest of the ledger
    /// as its environment.
    fn with_timelock<T>(
        &mut self,
        label: &str,
        address: Address,
        f: impl FnOnce(&mut TimelockInstance, &mut Substrate<'_>) -> Result<T, TimelockError>,
    ) -> Result<T, LedgerError> {
        self.transact(label, |state, now| {
            let mut timelock = state.take_timelock(address)?;
            let result = {
                let mut env = Substrate::new(state, now);
                f(&mut timelock, &mut env)
            };
            state.restore_timelock(timelock);
            Ok(result?)
        })
    }

    /// An immediate call as `caller`.
    pub fn call(
        &mut self,
        caller: Address,
        target: Address,
        payload: &[u8],
        value: u128,
    ) -> Result<Vec<u8>, LedgerError> {
        let call = OperationCall::new(target, payload.to_vec()).with_value(value);
        let out = self.transact("call", |state, _| state.dispatch(caller, &call))?;
        self.stats.increment(DIRECT_CALLS);
        Ok(out)
    }

    pub fn schedule(
        &mut self,
        timelock: Address,
        caller: Address,
        call: OperationCall,
        predecessor: Hash32,
        salt: Hash32,
        delay: u64,
    ) -> Result<Hash32, LedgerError> {
        let id = self.with_timelock("schedule", timelock, |tl, env| {
            tl.schedule(&*env, caller, call, predecessor, salt, delay)
        })?;
        self.stats.increment(SCHEDULED);
        Ok(id)
    }

    pub fn schedule_batch(
        &mut self,
        timelock: Address,
        caller: Address,
        calls: Vec<OperationCall>,
        predecessor: Hash32,
        salt: Hash32,
        delay: u64,
    ) -> Result<Hash32, LedgerError> {
        let id = self.with_timelock("schedule_batch", timelock, |tl, env| {
            tl.schedule_batch(&*env, caller, calls, predecessor, salt, delay)
        })?;
        self.stats.increment(SCHEDULED);
        Ok(id)
    }

    pub fn execute(
        &mut self,
        timelock: Address,
        caller: Address,
        call: &OperationCall,
        predecessor: Hash32,
        salt: Hash32,
    ) -> Result<Hash32, LedgerError> {
        let id = self.with_timelock("execute", timelock, |tl, env| {
            tl.execute(env, caller, call, predecessor, salt)
        })?;
        self.stats.increment(EXECUTED);
        Ok(id)
    }

    pub fn execute_batch(
        &mut self,
        timelock: Address,
        caller: Address,
        calls: &[OperationCall],
        predecessor: Hash32,
        salt: Hash32,
    ) -> Result<Hash32, LedgerError> {
        let id = self.with_timelock("execute_batch", timelock, |tl, env| {
            tl.execute_batch(env, caller, calls, predecessor, salt)
        })?;
        self.stats.increment(EXECUTED);
        Ok(id)
    }

    pub fn execute_operation(
        &mut self,
        timelock: Address,
        caller: Address,
        id: Hash32,
    ) -> Result<(), LedgerError> {
        self.with_timelock("execute", timelock, |tl, env| {
            tl.execute_operation(env, caller, id)
        })?;
        self.stats.increment(EXECUTED);
        Ok(())
    }

    pub fn cancel(&mut self, timelock: Address, caller: Address, id: Hash32) -> Result<(), LedgerError> {
        self.with_timelock("cancel", timelock, |tl, env| tl.cancel(&*env, caller, id))?;
        self.stats.increment(CANCELLED);
        Ok(())
    }

    pub fn schedule_or_execute(
        &mut self,
        timelock: Address,
        caller: Address,
        call: OperationCall,
        salt: Hash32,
    ) -> Result<Progress, LedgerError> {
        let progress = self.with_timelock("schedule_or_execute", timelock, |tl, env| {
            tl.schedule_or_execute(env, caller, call, salt)
        })?;
        self.record(&progress);
        Ok(progress)
    }

    pub fn schedule_or_execute_batch(
        &mut self,
        timelock: Address,
        caller: Address,
        calls: Vec<OperationCall>,
        salt: Hash32,
    ) -> Result<Progress, LedgerError> {
        let progress = self.with_timelock("schedule_or_execute_batch", timelock, |tl, env| {
            tl.schedule_or_execute_batch(env, caller, calls, salt)
        })?;
        self.record(&progress);
        Ok(progress)
    }

    fn record(&self, progress: &Progress) {
        match progress {
            Progress::Queued { .. } => self.stats.increment(SCHEDULED),
            Progress::Executed { .. } => self.stats.increment(EXECUTED),
            Progress::NotYetReady { .. } | Progress::AlreadyExecuted { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govlock_codec::abi::Token;
    use govlock_codec::{encode_call, FunctionSignature};
    use govlock_nullables::{NullClock, NullSnapshotStore};
    use govlock_timelock::OperationState;

    fn techops() -> Address {
        Address::from_label("techops")
    }

    fn ledger() -> (Ledger, NullClock) {
        let clock = NullClock::new(1_000);
        let ledger = Ledger::from_genesis(&GenesisConfig::preset(), Arc::new(clock.clone())).unwrap();
        (ledger, clock)
    }

    fn lowsec(ledger: &Ledger) -> Address {
        ledger.state().timelock_by_label("lowsec").unwrap().address()
    }

    fn set_fee(ledger: &Ledger, value: u128) -> OperationCall {
        let pool = ledger.state().target_by_label("active_pool").unwrap().address();
        let sig = FunctionSignature::parse("setFeeBps(uint256)").unwrap();
        OperationCall::new(pool, encode_call(&sig, &[Token::Uint(value)]).unwrap())
    }

    fn fee(ledger: &Ledger) -> Option<Token> {
        ledger
            .state()
            .target_by_label("active_pool")
            .and_then(|t| t.slot("feeBps"))
            .cloned()
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let (mut ledger, _) = ledger();
        let before = ledger.state().clone();
        let err = ledger
            .transact("noop", |state, _| {
                state.timelock_mut(Address::from_label("lowsec")).unwrap().add_member(
                    govlock_timelock::TimelockRole::Proposer,
                    Address::from_label("intruder"),
                );
                Err::<(), _>(LedgerError::Genesis("boom".into()))
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::Genesis(_)));
        assert_eq!(ledger.state(), &before);
        assert_eq!(ledger.stats().get(ROLLED_BACK), 1);
        assert_eq!(ledger.seq(), 0);
    }

    #[test]
    fn test_schedule_execute_through_ledger() {
        let (mut ledger, clock) = ledger();
        let tl = lowsec(&ledger);
        let call = set_fee(&ledger, 250);
        let id = ledger
            .schedule(tl, techops(), call.clone(), Hash32::ZERO, Hash32::ZERO, LOWSEC + 1)
            .unwrap();
        clock.advance(LOWSEC + 1);
        ledger
            .execute(tl, techops(), &call, Hash32::ZERO, Hash32::ZERO)
            .unwrap();
        assert_eq!(fee(&ledger), Some(Token::Uint(250)));
        assert_eq!(
            ledger.timelock(tl).unwrap().operation_state(&id, ledger.now()),
            OperationState::Done
        );
        assert_eq!(ledger.stats().get(SCHEDULED), 1);
        assert_eq!(ledger.stats().get(EXECUTED), 1);
        assert_eq!(ledger.seq(), 2);
    }

    const LOWSEC: u64 = crate::LOWSEC_MIN_DELAY;

    #[test]
    fn test_reverted_call_keeps_operation_ready() {
        let (mut ledger, clock) = ledger();
        let tl = lowsec(&ledger);
        // passes scheduling, fails the target's bound at execution
        let call = set_fee(&ledger, 5_000);
        let id = ledger
            .schedule(tl, techops(), call.clone(), Hash32::ZERO, Hash32::ZERO, LOWSEC + 1)
            .unwrap();
        clock.advance(LOWSEC + 1);
        let err = ledger
            .execute(tl, techops(), &call, Hash32::ZERO, Hash32::ZERO)
            .unwrap_err();
        assert!(matches!(
            err.as_timelock(),
            Some(TimelockError::CallReverted { .. })
        ));
        assert_eq!(
            ledger.timelock(tl).unwrap().operation_state(&id, ledger.now()),
            OperationState::Ready
        );
        assert_eq!(ledger.stats().get(ROLLED_BACK), 1);
    }

    #[test]
    fn test_view_reads_getter() {
        let (ledger, _) = ledger();
        let pool = ledger.state().target_by_label("active_pool").unwrap().address();
        let out = ledger
            .view(pool, crate::getter_selector("feeBps").as_bytes())
            .unwrap();
        assert_eq!(out, govlock_codec::abi::encode(&[Token::Uint(0)]));
    }

    #[test]
    fn test_persist_and_reopen() {
        let (mut ledger, clock) = ledger();
        let store = NullSnapshotStore::new();
        let tl = lowsec(&ledger);
        ledger
            .schedule(tl, techops(), set_fee(&ledger, 1), Hash32::ZERO, Hash32::ZERO, LOWSEC + 1)
            .unwrap();
        assert_eq!(ledger.persist(&store).unwrap(), 1);

        let reopened = Ledger::open(&store, &GenesisConfig::default(), Arc::new(clock)).unwrap();
        assert_eq!(reopened.state(), ledger.state());
        assert_eq!(reopened.seq(), 1);
    }

    #[test]
    fn test_reopen_with_earlier_clock_holds_snapshot_time() {
        let (mut ledger, clock) = ledger();
        let store = NullSnapshotStore::new();
        let tl = lowsec(&ledger);
        clock.set(10_000);
        let id = ledger
            .schedule(tl, techops(), set_fee(&ledger, 1), Hash32::ZERO, Hash32::ZERO, LOWSEC + 1)
            .unwrap();
        ledger.persist(&store).unwrap();

        let behind = NullClock::new(1_000);
        let reopened = Ledger::open(&store, &GenesisConfig::default(), Arc::new(behind.clone())).unwrap();
        assert_eq!(reopened.now(), Timestamp::new(10_000));
        let op = reopened.timelock(tl).unwrap().operation(&id).unwrap();
        assert!(op.scheduled_at <= reopened.now());

        // once the clock passes the snapshot it is used as is
        behind.set(20_000);
        assert_eq!(reopened.now(), Timestamp::new(20_000));
    }

    #[test]
    fn test_progress_report_does_not_advance_seq() {
        let (mut ledger, clock) = ledger();
        let tl = lowsec(&ledger);
        let call = set_fee(&ledger, 7);
        let queued = ledger
            .schedule_or_execute(tl, techops(), call.clone(), Hash32::ZERO)
            .unwrap();
        assert!(matches!(queued, Progress::Queued { .. }));
        assert_eq!(ledger.seq(), 1);

        let waiting = ledger
            .schedule_or_execute(tl, techops(), call.clone(), Hash32::ZERO)
            .unwrap();
        assert!(matches!(waiting, Progress::NotYetReady { .. }));
        assert_eq!(ledger.seq(), 1);

        clock.advance(LOWSEC + 1);
        ledger
            .schedule_or_execute(tl, techops(), call.clone(), Hash32::ZERO)
            .unwrap();
        assert_eq!(ledger.seq(), 2);
        let done = ledger
            .schedule_or_execute(tl, techops(), call, Hash32::ZERO)
            .unwrap();
        assert!(matches!(done, Progress::AlreadyExecuted { .. }));
        assert_eq!(ledger.seq(), 2);
    }

    #[test]
    fn test_open_empty_store_deploys_genesis() {
        let store = NullSnapshotStore::new();
        let ledger = Ledger::open(
            &store,
            &GenesisConfig::preset(),
            Arc::new(NullClock::new(0)),
        )
        .unwrap();
        assert_eq!(ledger.seq(), 0);
        assert!(ledger.state().timelock_by_label("highsec").is_some());
    }

    #[test]
    fn test_unknown_timelock() {
        let (mut ledger, _) = ledger();
        let call = set_fee(&ledger, 1);
        assert!(matches!(
            ledger.schedule(Address::repeat_byte(7), techops(), call, Hash32::ZERO, Hash32::ZERO, 1),
            Err(LedgerError::UnknownTimelock(_))
        ));
    }
}
