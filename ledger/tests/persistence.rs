//! Snapshots survive a round trip through LMDB.

use std::sync::Arc;

use govlock_codec::abi::Token;
use govlock_codec::{encode_call, FunctionSignature, OperationCall};
use govlock_ledger::{GenesisConfig, Ledger, LedgerError, LOWSEC_MIN_DELAY};
use govlock_nullables::{NullClock, NullSnapshotStore};
use govlock_store::SnapshotStore;
use govlock_store_lmdb::LmdbEnvironment;
use govlock_timelock::OperationState;
use govlock_types::{Address, Hash32};

fn schedule_one(ledger: &mut Ledger) -> Hash32 {
    let lowsec = ledger.state().timelock_by_label("lowsec").unwrap().address();
    let pool = ledger.state().target_by_label("active_pool").unwrap().address();
    let sig = FunctionSignature::parse("setFeeBps(uint256)").unwrap();
    let call = OperationCall::new(pool, encode_call(&sig, &[Token::Uint(10)]).unwrap());
    ledger
        .schedule(
            lowsec,
            Address::from_label("techops"),
            call,
            Hash32::ZERO,
            Hash32::ZERO,
            LOWSEC_MIN_DELAY + 1,
        )
        .unwrap()
}

#[test]
fn lmdb_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let clock = NullClock::new(10_000);
    let id = {
        let env = LmdbEnvironment::open_default(dir.path()).unwrap();
        let store = env.snapshot_store().unwrap();
        let mut ledger =
            Ledger::open(&store, &GenesisConfig::preset(), Arc::new(clock.clone())).unwrap();
        let id = schedule_one(&mut ledger);
        ledger.persist(&store).unwrap();
        id
    };

    let env = LmdbEnvironment::open_default(dir.path()).unwrap();
    let store = env.snapshot_store().unwrap();
    assert_eq!(store.snapshot_seqs().unwrap(), vec![1]);
    let ledger = Ledger::open(&store, &GenesisConfig::default(), Arc::new(clock)).unwrap();
    let lowsec = ledger.state().timelock_by_label("lowsec").unwrap();
    assert_eq!(lowsec.operation_state(&id, ledger.now()), OperationState::Pending);
}

#[test]
fn tampered_snapshot_is_refused() {
    let store = NullSnapshotStore::new();
    let clock = NullClock::new(0);
    let mut ledger = Ledger::from_genesis(&GenesisConfig::preset(), Arc::new(clock.clone())).unwrap();
    schedule_one(&mut ledger);
    let seq = ledger.persist(&store).unwrap();
    store.tamper(seq, |bytes| {
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
    });

    let err = Ledger::open(&store, &GenesisConfig::preset(), Arc::new(clock))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        LedgerError::SnapshotMismatch { .. } | LedgerError::Serialization(_)
    ));
}
