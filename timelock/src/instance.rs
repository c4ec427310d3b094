//! A timelock instance: role membership, a minimum delay and the operations
//! it owns.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use govlock_codec::{hash_operation_batch, OperationCall};
use govlock_types::{Address, Hash32, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{
    Environment, Operation, OperationBook, OperationState, OperationStatus, TimelockCall,
    TimelockError, TimelockRole,
};

/// Outcome of an idempotent schedule-or-execute step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    /// Freshly scheduled.
    Queued { id: Hash32, ready_at: Timestamp },
    /// Already scheduled; still waiting.
    NotYetReady {
        id: Hash32,
        ready_at: Timestamp,
        remaining_secs: u64,
    },
    /// Executed by this call.
    Executed { id: Hash32 },
    /// Executed by an earlier call.
    AlreadyExecuted { id: Hash32 },
}

impl Progress {
    pub fn id(&self) -> Hash32 {
        match *self {
            Self::Queued { id, .. }
            | Self::NotYetReady { id, .. }
            | Self::Executed { id }
            | Self::AlreadyExecuted { id } => id,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued { id, ready_at } => write!(f, "queued {id} (ready at {ready_at})"),
            Self::NotYetReady {
                id, remaining_secs, ..
            } => write!(f, "{id} not yet ready, {remaining_secs}s remaining"),
            Self::Executed { id } => write!(f, "executed {id}"),
            Self::AlreadyExecuted { id } => write!(f, "{id} already executed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockInstance {
    label: String,
    address: Address,
    min_delay: u64,
    members: BTreeMap<TimelockRole, BTreeSet<Address>>,
    operations: OperationBook,
}

impl TimelockInstance {
    /// A new instance. It holds `Admin` over itself so that role changes can
    /// be made through its own operations.
    pub fn new(label: impl Into<String>, address: Address, min_delay: u64) -> Self {
        let mut instance = Self {
            label: label.into(),
            address,
            min_delay,
            members: BTreeMap::new(),
            operations: OperationBook::new(),
        };
        instance.add_member(TimelockRole::Admin, address);
        instance
    }

    pub fn with_member(mut self, role: TimelockRole, account: Address) -> Self {
        self.add_member(role, account);
        self
    }

    /// Unchecked membership change (genesis only).
    pub fn add_member(&mut self, role: TimelockRole, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    fn remove_member(&mut self, role: TimelockRole, account: Address) -> bool {
        let removed = self
            .members
            .get_mut(&role)
            .is_some_and(|set| set.remove(&account));
        if self.members.get(&role).is_some_and(BTreeSet::is_empty) {
            self.members.remove(&role);
        }
        removed
    }

    // ── Lens ────────────────────────────────────────────────────────────

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    pub fn has_role(&self, role: TimelockRole, account: Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(&account))
    }

    /// Executor membership of the zero address opens execution to everyone.
    pub fn is_open_role(&self, role: TimelockRole) -> bool {
        self.has_role(role, Address::ZERO)
    }

    pub fn members(&self, role: TimelockRole) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn operation(&self, id: &Hash32) -> Option<&Operation> {
        self.operations.get(id)
    }

    pub fn operation_state(&self, id: &Hash32, now: Timestamp) -> OperationState {
        self.operations.state(id, now)
    }

    pub fn operations(&self) -> &OperationBook {
        &self.operations
    }

    pub fn operations_in(&self, state: OperationState, now: Timestamp) -> Vec<&Operation> {
        self.operations.in_state(state, now)
    }

    // ── Ids ─────────────────────────────────────────────────────────────

    pub fn hash_operation(call: &OperationCall, predecessor: Hash32, salt: Hash32) -> Hash32 {
        call.id(predecessor, salt)
    }

    pub fn hash_operation_batch(
        calls: &[OperationCall],
        predecessor: Hash32,
        salt: Hash32,
    ) -> Hash32 {
        hash_operation_batch(calls, predecessor, salt)
    }

    // ── Checks ──────────────────────────────────────────────────────────

    fn require_role(&self, role: TimelockRole, account: Address) -> Result<(), TimelockError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(TimelockError::PermissionDenied { account, role })
        }
    }

    /// Every call leaving the instance must be allowed by the target's
    /// authority. Calls to the instance itself are gated by its own roles.
    fn require_capabilities(
        &self,
        env: &dyn Environment,
        calls: &[OperationCall],
    ) -> Result<(), TimelockError> {
        for call in calls.iter().filter(|c| c.target != self.address) {
            let selector = call.selector().ok_or_else(|| {
                TimelockError::MalformedPayload(format!("call to {} has no selector", call.target))
            })?;
            if !env.can_call(self.address, call.target, selector) {
                return Err(TimelockError::NotAuthorized {
                    target: call.target,
                    selector,
                });
            }
        }
        Ok(())
    }

    // ── Schedule ────────────────────────────────────────────────────────

    pub fn schedule(
        &mut self,
        env: &dyn Environment,
        caller: Address,
        call: OperationCall,
        predecessor: Hash32,
        salt: Hash32,
        delay: u64,
    ) -> Result<Hash32, TimelockError> {
        let id = call.id(predecessor, salt);
        self.schedule_operation(env, caller, id, vec![call], false, predecessor, salt, delay)
    }

    pub fn schedule_batch(
        &mut self,
        env: &dyn Environment,
        caller: Address,
        calls: Vec<OperationCall>,
        predecessor: Hash32,
        salt: Hash32,
        delay: u64,
    ) -> Result<Hash32, TimelockError> {
        if calls.is_empty() {
            return Err(TimelockError::EmptyBatch);
        }
        let id = hash_operation_batch(&calls, predecessor, salt);
        self.schedule_operation(env, caller, id, calls, true, predecessor, salt, delay)
    }

    #[allow(clippy::too_many_arguments)]
    fn schedule_operation(
        &mut self,
        env: &dyn Environment,
        caller: Address,
        id: Hash32,
        calls: Vec<OperationCall>,
        batch: bool,
        predecessor: Hash32,
        salt: Hash32,
        delay: u64,
    ) -> Result<Hash32, TimelockError> {
        self.require_role(TimelockRole::Proposer, caller)?;
        if delay <= self.min_delay {
            return Err(TimelockError::DelayTooLow {
                delay,
                min_delay: self.min_delay,
            });
        }
        self.require_capabilities(env, &calls)?;

        let now = env.now();
        let ready_at = now.plus(delay);
        self.operations.insert_new(Operation {
            id,
            calls,
            batch,
            predecessor,
            salt,
            delay,
            proposer: caller,
            scheduled_at: now,
            ready_at,
            status: OperationStatus::Scheduled,
        })?;
        tracing::info!(
            timelock = %self.label,
            %id,
            proposer = %caller,
            delay,
            ready_at = ready_at.as_secs(),
            "operation scheduled"
        );
        Ok(id)
    }

    // ── Execute ─────────────────────────────────────────────────────────

    pub fn execute(
        &mut self,
        env: &mut dyn Environment,
        caller: Address,
        call: &OperationCall,
        predecessor: Hash32,
        salt: Hash32,
    ) -> Result<Hash32, TimelockError> {
        let id = call.id(predecessor, salt);
        self.execute_operation(env, caller, id)?;
        Ok(id)
    }

    pub fn execute_batch(
        &mut self,
        env: &mut dyn Environment,
        caller: Address,
        calls: &[OperationCall],
        predecessor: Hash32,
        salt: Hash32,
    ) -> Result<Hash32, TimelockError> {
        if calls.is_empty() {
            return Err(TimelockError::EmptyBatch);
        }
        let id = hash_operation_batch(calls, predecessor, salt);
        self.execute_operation(env, caller, id)?;
        Ok(id)
    }

    /// Execute by id. The caller's role, the operation's readiness, its
    /// predecessor and every call's capability are all checked now, at
    /// execution time.
    ///
    /// On a failed call the instance is left mid-operation; the surrounding
    /// ledger transaction is expected to roll back.
    pub fn execute_operation(
        &mut self,
        env: &mut dyn Environment,
        caller: Address,
        id: Hash32,
    ) -> Result<(), TimelockError> {
        if !self.is_open_role(TimelockRole::Executor) {
            self.require_role(TimelockRole::Executor, caller)?;
        }
        let now = env.now();
        let op = self.operations.get(&id).ok_or(TimelockError::NeverScheduled(id))?;
        match op.state(now) {
            OperationState::Ready => {}
            OperationState::Pending => {
                return Err(TimelockError::NotYetReady {
                    id,
                    ready_at: op.ready_at,
                    remaining_secs: op.remaining_secs(now),
                })
            }
            OperationState::Done => return Err(TimelockError::AlreadyDone(id)),
            OperationState::Cancelled => return Err(TimelockError::AlreadyCancelled(id)),
            OperationState::Unset => return Err(TimelockError::NeverScheduled(id)),
        }
        if op.has_predecessor()
            && self.operations.state(&op.predecessor, now) != OperationState::Done
        {
            return Err(TimelockError::PredecessorNotDone {
                id,
                predecessor: op.predecessor,
            });
        }
        let calls = op.calls.clone();
        self.require_capabilities(&*env, &calls)?;

        for call in &calls {
            if call.target == self.address {
                self.handle_call(self.address, &call.payload)?;
            } else {
                env.dispatch(self.address, call)
                    .map_err(|e| TimelockError::CallReverted {
                        target: call.target,
                        reason: e.to_string(),
                    })?;
            }
        }

        self.operations.mark_done(&id, now, caller)?;
        tracing::info!(timelock = %self.label, %id, executor = %caller, "operation executed");
        Ok(())
    }

    // ── Cancel ──────────────────────────────────────────────────────────

    /// Cancel a pending or ready operation.
    pub fn cancel(
        &mut self,
        env: &dyn Environment,
        caller: Address,
        id: Hash32,
    ) -> Result<(), TimelockError> {
        self.require_role(TimelockRole::Canceller, caller)?;
        self.operations.mark_cancelled(&id, env.now(), caller)?;
        tracing::info!(timelock = %self.label, %id, canceller = %caller, "operation cancelled");
        Ok(())
    }

    // ── Idempotent driver ───────────────────────────────────────────────

    /// Schedule with `min_delay + 1` if unset, execute if ready, report
    /// otherwise. The id is recomputed from the parameters on every call.
    pub fn schedule_or_execute(
        &mut self,
        env: &mut dyn Environment,
        caller: Address,
        call: OperationCall,
        salt: Hash32,
    ) -> Result<Progress, TimelockError> {
        let id = call.id(Hash32::ZERO, salt);
        self.advance(env, caller, id, vec![call], false, salt)
    }

    pub fn schedule_or_execute_batch(
        &mut self,
        env: &mut dyn Environment,
        caller: Address,
        calls: Vec<OperationCall>,
        salt: Hash32,
    ) -> Result<Progress, TimelockError> {
        if calls.is_empty() {
            return Err(TimelockError::EmptyBatch);
        }
        let id = hash_operation_batch(&calls, Hash32::ZERO, salt);
        self.advance(env, caller, id, calls, true, salt)
    }

    fn advance(
        &mut self,
        env: &mut dyn Environment,
        caller: Address,
        id: Hash32,
        calls: Vec<OperationCall>,
        batch: bool,
        salt: Hash32,
    ) -> Result<Progress, TimelockError> {
        let now = env.now();
        match self.operations.state(&id, now) {
            OperationState::Unset => {
                let delay = self.min_delay.saturating_add(1);
                self.schedule_operation(&*env, caller, id, calls, batch, Hash32::ZERO, salt, delay)?;
                Ok(Progress::Queued {
                    id,
                    ready_at: now.plus(delay),
                })
            }
            OperationState::Pending => {
                let (ready_at, remaining_secs) = self
                    .operations
                    .get(&id)
                    .map(|op| (op.ready_at, op.remaining_secs(now)))
                    .unwrap_or((now, 0));
                tracing::debug!(timelock = %self.label, %id, remaining_secs, "operation not yet ready");
                Ok(Progress::NotYetReady {
                    id,
                    ready_at,
                    remaining_secs,
                })
            }
            OperationState::Ready => {
                self.execute_operation(env, caller, id)?;
                Ok(Progress::Executed { id })
            }
            OperationState::Done => Ok(Progress::AlreadyExecuted { id }),
            OperationState::Cancelled => Err(TimelockError::AlreadyCancelled(id)),
        }
    }

    // ── Calls addressed to the instance ─────────────────────────────────

    /// Handle a call made to this instance's address.
    pub fn handle_call(&mut self, caller: Address, payload: &[u8]) -> Result<Vec<u8>, TimelockError> {
        match TimelockCall::decode(payload)? {
            TimelockCall::UpdateDelay { delay } => {
                if caller != self.address {
                    return Err(TimelockError::OnlySelf { caller });
                }
                tracing::info!(
                    timelock = %self.label,
                    old = self.min_delay,
                    new = delay,
                    "minimum delay updated"
                );
                self.min_delay = delay;
            }
            TimelockCall::GrantRole { role, account } => {
                self.require_role(TimelockRole::Admin, caller)?;
                if self.add_member(role, account) {
                    tracing::info!(timelock = %self.label, %role, %account, "role granted");
                }
            }
            TimelockCall::RevokeRole { role, account } => {
                self.require_role(TimelockRole::Admin, caller)?;
                if self.remove_member(role, account) {
                    tracing::info!(timelock = %self.label, %role, %account, "role revoked");
                }
            }
            TimelockCall::RenounceRole { role, account } => {
                if caller != account {
                    return Err(TimelockError::PermissionDenied {
                        account: caller,
                        role,
                    });
                }
                if self.remove_member(role, account) {
                    tracing::info!(timelock = %self.label, %role, %account, "role renounced");
                }
            }
        }
        Ok(Vec::new())
    }
}
