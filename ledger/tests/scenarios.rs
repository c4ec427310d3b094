//! End-to-end lifecycle scenarios against a small deployment.

use std::sync::Arc;
use std::thread;

use govlock_authority::{Authority, RegistryCall, RegistryFunction};
use govlock_codec::abi::Token;
use govlock_codec::{encode_call, FunctionSignature, OperationCall};
use govlock_ledger::{GenesisConfig, Ledger, LedgerError, SharedLedger};
use govlock_nullables::NullClock;
use govlock_timelock::{OperationState, Progress, TimelockError};
use govlock_types::{Address, Hash32, RoleId, Selector};

const D: u64 = 172_800;
const ROLE: RoleId = RoleId::new(5);

const GENESIS: &str = r#"
[registry]
owner = "deployer"

[[timelocks]]
label = "lowsec"
min_delay = 172800
proposers = ["techops"]
executors = ["techops"]
cancellers = ["techops"]

[[targets]]
label = "active_pool"
[[targets.setters]]
signature = "setFeeBps(uint256)"
slot = "feeBps"
max = 1000

[[targets]]
label = "borrower_operations"
[[targets.setters]]
signature = "setFeeBps(uint256)"
slot = "feeBps"
max = 1000

[[roles]]
id = 5
name = "Pool fees"
members = ["techops"]
"#;

fn techops() -> Address {
    Address::from_label("techops")
}

fn deployer() -> Address {
    Address::from_label("deployer")
}

fn lowsec() -> Address {
    Address::from_label("lowsec")
}

fn authority() -> Address {
    Address::from_label("authority")
}

fn pool() -> Address {
    Address::from_label("active_pool")
}

fn borrower_ops() -> Address {
    Address::from_label("borrower_operations")
}

fn fee_selector() -> Selector {
    FunctionSignature::parse("setFeeBps(uint256)").unwrap().selector()
}

fn set_fee(target: Address, value: u128) -> OperationCall {
    let sig = FunctionSignature::parse("setFeeBps(uint256)").unwrap();
    OperationCall::new(target, encode_call(&sig, &[Token::Uint(value)]).unwrap())
}

fn fee(ledger: &Ledger, target: Address) -> u128 {
    ledger
        .state()
        .target(target)
        .and_then(|t| t.slot("feeBps"))
        .and_then(Token::as_uint)
        .unwrap()
}

fn setup() -> (Ledger, NullClock) {
    let clock = NullClock::new(1_700_000_000);
    let genesis = GenesisConfig::from_toml_str(GENESIS).unwrap();
    let ledger = Ledger::from_genesis(&genesis, Arc::new(clock.clone())).unwrap();
    (ledger, clock)
}

fn registry_call(ledger: &mut Ledger, call: RegistryCall) {
    ledger.call(deployer(), authority(), &call.encode(), 0).unwrap();
}

/// Give role 5 the fee capability on `target` and make lowsec a member.
fn grant_fee_capability(ledger: &mut Ledger, target: Address) {
    registry_call(
        ledger,
        RegistryCall::SetRoleCapability {
            role: ROLE,
            target,
            selector: fee_selector(),
            enabled: true,
        },
    );
    registry_call(
        ledger,
        RegistryCall::SetUserRole {
            user: lowsec(),
            role: ROLE,
            enabled: true,
        },
    );
}

#[test]
fn fast_path_without_capability_is_denied() {
    let (mut ledger, _) = setup();
    let registry = ledger.state().registry(authority()).unwrap();
    assert!(!registry.can_call(techops(), pool(), fee_selector()));

    let call = set_fee(pool(), 500);
    let err = ledger.call(techops(), pool(), &call.payload, 0).unwrap_err();
    assert!(matches!(err, LedgerError::PermissionDenied { .. }));
    assert_eq!(fee(&ledger, pool()), 0);
}

#[test]
fn schedule_or_execute_queues_then_executes() {
    let (mut ledger, clock) = setup();
    grant_fee_capability(&mut ledger, pool());
    let call = set_fee(pool(), 500);

    let start = ledger.now();
    let queued = ledger
        .schedule_or_execute(lowsec(), techops(), call.clone(), Hash32::ZERO)
        .unwrap();
    assert_eq!(
        queued,
        Progress::Queued {
            id: call.id(Hash32::ZERO, Hash32::ZERO),
            ready_at: start.plus(D + 1),
        }
    );

    clock.advance(D);
    assert!(matches!(
        ledger
            .schedule_or_execute(lowsec(), techops(), call.clone(), Hash32::ZERO)
            .unwrap(),
        Progress::NotYetReady { remaining_secs: 1, .. }
    ));

    clock.advance(1);
    assert_eq!(
        ledger
            .schedule_or_execute(lowsec(), techops(), call.clone(), Hash32::ZERO)
            .unwrap(),
        Progress::Executed { id: queued.id() }
    );
    assert_eq!(fee(&ledger, pool()), 500);

    assert_eq!(
        ledger
            .schedule_or_execute(lowsec(), techops(), call, Hash32::ZERO)
            .unwrap(),
        Progress::AlreadyExecuted { id: queued.id() }
    );
}

#[test]
fn salts_disambiguate_identical_calls() {
    let (mut ledger, clock) = setup();
    grant_fee_capability(&mut ledger, pool());
    let call = set_fee(pool(), 42);
    let zero = Hash32::ZERO;
    let one = Hash32::from_low_u64(1);

    let a = ledger
        .schedule(lowsec(), techops(), call.clone(), Hash32::ZERO, zero, D + 1)
        .unwrap();
    let b = ledger
        .schedule(lowsec(), techops(), call.clone(), Hash32::ZERO, one, D + 1)
        .unwrap();
    assert_ne!(a, b);

    clock.advance(D + 1);
    ledger
        .execute(lowsec(), techops(), &call, Hash32::ZERO, zero)
        .unwrap();
    let timelock = ledger.timelock(lowsec()).unwrap();
    assert_eq!(timelock.operation_state(&a, ledger.now()), OperationState::Done);
    assert_eq!(timelock.operation_state(&b, ledger.now()), OperationState::Ready);

    ledger
        .execute(lowsec(), techops(), &call, Hash32::ZERO, one)
        .unwrap();
}

#[test]
fn cancel_lifecycle() {
    let (mut ledger, clock) = setup();
    grant_fee_capability(&mut ledger, pool());
    let call = set_fee(pool(), 7);
    let id = call.id(Hash32::ZERO, Hash32::ZERO);

    let err = ledger.cancel(lowsec(), techops(), id).unwrap_err();
    assert_eq!(err.as_timelock(), Some(&TimelockError::NeverScheduled(id)));

    ledger
        .schedule(lowsec(), techops(), call.clone(), Hash32::ZERO, Hash32::ZERO, D + 1)
        .unwrap();
    ledger.cancel(lowsec(), techops(), id).unwrap();

    clock.advance(D + 1);
    let err = ledger
        .execute(lowsec(), techops(), &call, Hash32::ZERO, Hash32::ZERO)
        .unwrap_err();
    assert_eq!(err.as_timelock(), Some(&TimelockError::AlreadyCancelled(id)));
    assert_eq!(fee(&ledger, pool()), 0);
}

#[test]
fn revocation_between_schedule_and_execute_blocks_execution() {
    let (mut ledger, clock) = setup();
    grant_fee_capability(&mut ledger, pool());
    let call = set_fee(pool(), 99);
    let id = ledger
        .schedule(lowsec(), techops(), call.clone(), Hash32::ZERO, Hash32::ZERO, D + 1)
        .unwrap();

    registry_call(
        &mut ledger,
        RegistryCall::SetRoleCapability {
            role: ROLE,
            target: pool(),
            selector: fee_selector(),
            enabled: false,
        },
    );
    clock.advance(D + 1);

    let err = ledger
        .execute(lowsec(), techops(), &call, Hash32::ZERO, Hash32::ZERO)
        .unwrap_err();
    assert!(err.is_permission_error());
    let timelock = ledger.timelock(lowsec()).unwrap();
    assert_eq!(timelock.operation_state(&id, ledger.now()), OperationState::Ready);

    ledger.cancel(lowsec(), techops(), id).unwrap();
    assert_eq!(fee(&ledger, pool()), 0);
}

#[test]
fn failing_batch_element_rolls_back_the_whole_batch() {
    let (mut ledger, clock) = setup();
    grant_fee_capability(&mut ledger, pool());
    grant_fee_capability(&mut ledger, borrower_ops());
    let calls = vec![set_fee(pool(), 100), set_fee(borrower_ops(), 5_000)];
    let id = ledger
        .schedule_batch(lowsec(), techops(), calls.clone(), Hash32::ZERO, Hash32::ZERO, D + 1)
        .unwrap();

    clock.advance(D + 1);
    let err = ledger
        .execute_batch(lowsec(), techops(), &calls, Hash32::ZERO, Hash32::ZERO)
        .unwrap_err();
    assert!(matches!(
        err.as_timelock(),
        Some(TimelockError::CallReverted { target, .. }) if *target == borrower_ops()
    ));
    assert_eq!(fee(&ledger, pool()), 0);
    let timelock = ledger.timelock(lowsec()).unwrap();
    assert_eq!(timelock.operation_state(&id, ledger.now()), OperationState::Ready);
}

#[test]
fn racing_proposers_schedule_exactly_once() {
    let (mut ledger, _) = setup();
    grant_fee_capability(&mut ledger, pool());
    let shared = SharedLedger::new(ledger);
    let call = set_fee(pool(), 300);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = shared.clone();
            let call = call.clone();
            thread::spawn(move || {
                shared.with(|l| l.schedule(lowsec(), techops(), call, Hash32::ZERO, Hash32::ZERO, D + 1))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let id = call.id(Hash32::ZERO, Hash32::ZERO);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.as_timelock(), Some(&TimelockError::AlreadyScheduled(id)));
    }
    assert_eq!(shared.lock().timelock(lowsec()).unwrap().operations().len(), 1);
}

#[test]
fn delay_update_goes_through_an_operation() {
    let (mut ledger, clock) = setup();
    let payload = govlock_timelock::TimelockCall::UpdateDelay { delay: 3_600 }.encode();
    let direct = ledger.call(techops(), lowsec(), &payload, 0).unwrap_err();
    assert!(direct.is_permission_error());

    let call = OperationCall::new(lowsec(), payload);
    ledger
        .schedule(lowsec(), techops(), call.clone(), Hash32::ZERO, Hash32::ZERO, D + 1)
        .unwrap();
    clock.advance(D + 1);
    ledger
        .execute(lowsec(), techops(), &call, Hash32::ZERO, Hash32::ZERO)
        .unwrap();
    assert_eq!(ledger.timelock(lowsec()).unwrap().min_delay(), 3_600);
}

#[test]
fn burned_registry_function_is_closed_to_the_owner() {
    let (mut ledger, _) = setup();
    let selector = RegistryFunction::SetUserRole.selector();
    assert!(ledger.can_call(deployer(), authority(), selector));
    registry_call(
        &mut ledger,
        RegistryCall::BurnCapability {
            target: authority(),
            selector,
        },
    );

    assert!(!ledger.can_call(deployer(), authority(), selector));
    let payload = RegistryCall::SetUserRole {
        user: Address::from_label("x"),
        role: RoleId::new(1),
        enabled: true,
    }
    .encode();
    let err = ledger.call(deployer(), authority(), &payload, 0).unwrap_err();
    assert!(err.is_permission_error());
    let registry = ledger.state().registry(authority()).unwrap();
    assert!(!registry.does_user_have_role(Address::from_label("x"), RoleId::new(1)));

    // unburned mutators keep the owner bypass
    assert!(ledger.can_call(deployer(), authority(), RegistryFunction::SetRoleName.selector()));
}
