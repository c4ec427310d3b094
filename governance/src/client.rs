//! The governance client: one verb per change an operator can make.
//!
//! Timelocked verbs are idempotent. Each invocation recomputes the operation
//! id from the call parameters and moves the operation one step along:
//! the first call queues it, calls before the delay has elapsed report the
//! remaining wait, the first call after it executes it and later calls report
//! that it already ran. Whenever a change takes effect during a call, the
//! client reads the target back and fails with `PostconditionMismatch` if it
//! does not hold the intended value.

use std::fmt;

use govlock_authority::{CapabilityRegistry, RegistryCall};
use govlock_codec::abi::Token;
use govlock_codec::{CodecError, OperationCall};
use govlock_ledger::{Ledger, SharedLedger};
use govlock_timelock::{OperationState, TimelockCall, TimelockRole};
use govlock_types::{Address, Hash32, RoleId, Selector};

use crate::{ContractBook, GovernanceError, GovernedParam, Outcome, SecurityTier};

#[derive(Clone)]
pub struct GovernanceClient {
    ledger: SharedLedger,
    actor: Address,
    contracts: ContractBook,
}

impl GovernanceClient {
    pub fn new(ledger: SharedLedger, actor: Address) -> Result<Self, GovernanceError> {
        let contracts = ContractBook::resolve(ledger.lock().state())?;
        Ok(Self {
            ledger,
            actor,
            contracts,
        })
    }

    /// The same client acting as someone else.
    pub fn with_actor(&self, actor: Address) -> Self {
        Self {
            actor,
            ..self.clone()
        }
    }

    pub fn actor(&self) -> Address {
        self.actor
    }

    pub fn contracts(&self) -> &ContractBook {
        &self.contracts
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    // ── Core ────────────────────────────────────────────────────────────

    /// Advance the operation made of `calls` on the `tier` timelock by one
    /// step, running `verify` if it executed.
    fn govern(
        &self,
        tier: SecurityTier,
        calls: Vec<OperationCall>,
        salt: Hash32,
        verify: impl FnOnce(&Ledger) -> Result<(), GovernanceError>,
    ) -> Result<Outcome, GovernanceError> {
        let timelock = self.contracts.timelock(tier);
        let mut ledger = self.ledger.lock();

        for call in calls.iter().filter(|c| c.target != timelock) {
            let selector = selector_of(call)?;
            if !ledger.can_call(timelock, call.target, selector) {
                return Err(GovernanceError::PermissionDenied {
                    caller: timelock,
                    target: call.target,
                    selector,
                });
            }
        }

        let progress = match <[OperationCall; 1]>::try_from(calls) {
            Ok([call]) => ledger.schedule_or_execute(timelock, self.actor, call, salt)?,
            Err(calls) => ledger.schedule_or_execute_batch(timelock, self.actor, calls, salt)?,
        };
        let outcome = Outcome::from(progress);
        tracing::info!(%tier, actor = %self.actor, %outcome, "governance step");

        if outcome.took_effect() {
            verify(&ledger)?;
        }
        Ok(outcome)
    }

    /// An immediate call as the actor, gated by the capability matrix.
    fn direct(
        &self,
        call: &OperationCall,
        verify: impl FnOnce(&Ledger) -> Result<(), GovernanceError>,
    ) -> Result<Vec<u8>, GovernanceError> {
        let selector = selector_of(call)?;
        let mut ledger = self.ledger.lock();
        if !ledger.can_call(self.actor, call.target, selector) {
            return Err(GovernanceError::PermissionDenied {
                caller: self.actor,
                target: call.target,
                selector,
            });
        }
        let out = ledger.call(self.actor, call.target, &call.payload, call.value)?;
        tracing::info!(actor = %self.actor, target = %call.target, %selector, "direct call applied");
        verify(&ledger)?;
        Ok(out)
    }

    fn registry<'a>(&self, ledger: &'a Ledger) -> Result<&'a CapabilityRegistry, GovernanceError> {
        ledger
            .state()
            .registry(self.contracts.registry)
            .ok_or_else(|| GovernanceError::MissingContract("capability registry".into()))
    }

    // ── Parameters ──────────────────────────────────────────────────────

    pub fn param_call(&self, param: GovernedParam, value: &Token) -> Result<OperationCall, GovernanceError> {
        Ok(OperationCall::new(
            self.contracts.contract(param.contract()),
            param.payload(value)?,
        ))
    }

    pub fn param_value(&self, param: GovernedParam) -> Option<Token> {
        let ledger = self.ledger.lock();
        ledger
            .state()
            .target(self.contracts.contract(param.contract()))
            .and_then(|t| t.slot(param.slot()))
            .cloned()
    }

    fn expect_param(&self, ledger: &Ledger, param: GovernedParam, expected: &Token) -> Result<(), GovernanceError> {
        let actual = ledger
            .state()
            .target(self.contracts.contract(param.contract()))
            .and_then(|t| t.slot(param.slot()));
        match actual {
            Some(actual) => expect(param.name(), expected, actual),
            None => Err(mismatch(param.name(), expected, &"<unset>")),
        }
    }

    /// Change `param` through the `tier` timelock.
    pub fn set(
        &self,
        param: GovernedParam,
        value: Token,
        tier: SecurityTier,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let call = self.param_call(param, &value)?;
        self.govern(tier, vec![call], salt, |l| self.expect_param(l, param, &value))
    }

    /// Change an emergency switch immediately.
    pub fn set_direct(&self, param: GovernedParam, value: Token) -> Result<Outcome, GovernanceError> {
        if !param.allows_fast_path() {
            return Err(GovernanceError::FastPathNotAllowed(param.name().to_string()));
        }
        let call = self.param_call(param, &value)?;
        self.direct(&call, |l| self.expect_param(l, param, &value))?;
        Ok(Outcome::Applied)
    }

    /// Perform any call immediately if the actor holds the capability.
    pub fn call_direct(&self, call: &OperationCall) -> Result<Vec<u8>, GovernanceError> {
        self.direct(call, |_| Ok(()))
    }

    /// Several parameter changes as one batch operation.
    pub fn govern_batch(
        &self,
        changes: &[(GovernedParam, Token)],
        tier: SecurityTier,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let calls = changes
            .iter()
            .map(|(param, value)| self.param_call(*param, value))
            .collect::<Result<Vec<_>, _>>()?;
        self.govern(tier, calls, salt, |l| {
            changes
                .iter()
                .try_for_each(|(param, value)| self.expect_param(l, *param, value))
        })
    }

    pub fn collateral_feed_source_and_redemption_fee_floor(
        &self,
        enable_dynamic_feed: bool,
        fee_floor: u128,
        tier: SecurityTier,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        self.govern_batch(
            &[
                (GovernedParam::CollateralFeedSource, Token::Bool(enable_dynamic_feed)),
                (GovernedParam::RedemptionFeeFloor, Token::Uint(fee_floor)),
            ],
            tier,
            salt,
        )
    }

    // ── Capability registry (always highsec) ────────────────────────────

    fn govern_registry(
        &self,
        call: RegistryCall,
        salt: Hash32,
        verify: impl FnOnce(&CapabilityRegistry) -> Result<(), GovernanceError>,
    ) -> Result<Outcome, GovernanceError> {
        let op = OperationCall::new(self.contracts.registry, call.encode());
        self.govern(SecurityTier::Highsec, vec![op], salt, |l| verify(self.registry(l)?))
    }

    pub fn set_role_name(&self, role: RoleId, name: &str, salt: Hash32) -> Result<Outcome, GovernanceError> {
        let call = RegistryCall::SetRoleName {
            role,
            name: name.to_string(),
        };
        self.govern_registry(call, salt, |r| expect("role name", name, r.role_name(role)))
    }

    pub fn set_user_role(
        &self,
        user: Address,
        role: RoleId,
        enabled: bool,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let call = RegistryCall::SetUserRole {
            user,
            role,
            enabled,
        };
        self.govern_registry(call, salt, |r| {
            expect("user role", &enabled, &r.does_user_have_role(user, role))
        })
    }

    pub fn set_role_capability(
        &self,
        role: RoleId,
        target: Address,
        selector: Selector,
        enabled: bool,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let call = RegistryCall::SetRoleCapability {
            role,
            target,
            selector,
            enabled,
        };
        self.govern_registry(call, salt, |r| {
            expect(
                "role capability",
                &enabled,
                &r.does_role_have_capability(role, target, selector),
            )
        })
    }

    pub fn set_public_capability(
        &self,
        target: Address,
        selector: Selector,
        enabled: bool,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let call = RegistryCall::SetPublicCapability {
            target,
            selector,
            enabled,
        };
        self.govern_registry(call, salt, |r| {
            expect(
                "public capability",
                &enabled,
                &r.is_public_capability(target, selector),
            )
        })
    }

    pub fn burn_capability(
        &self,
        target: Address,
        selector: Selector,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let call = RegistryCall::BurnCapability { target, selector };
        self.govern_registry(call, salt, |r| {
            expect("burned capability", &true, &r.is_burned(target, selector))
        })
    }

    pub fn set_authority(&self, authority: Address, salt: Hash32) -> Result<Outcome, GovernanceError> {
        let call = RegistryCall::SetAuthority { authority };
        self.govern_registry(call, salt, |r| expect("authority", &authority, &r.authority()))
    }

    // ── Timelock management ─────────────────────────────────────────────

    fn govern_timelock(
        &self,
        tier: SecurityTier,
        call: TimelockCall,
        salt: Hash32,
        verify: impl FnOnce(&govlock_timelock::TimelockInstance) -> Result<(), GovernanceError>,
    ) -> Result<Outcome, GovernanceError> {
        let timelock = self.contracts.timelock(tier);
        let op = OperationCall::new(timelock, call.encode());
        self.govern(tier, vec![op], salt, |l| verify(l.timelock(timelock)?))
    }

    pub fn grant_timelock_role(
        &self,
        role: TimelockRole,
        account: Address,
        tier: SecurityTier,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let call = TimelockCall::GrantRole { role, account };
        self.govern_timelock(tier, call, salt, |t| {
            expect("timelock role", &true, &t.has_role(role, account))
        })
    }

    /// Revoke a role the account currently holds.
    pub fn revoke_timelock_role(
        &self,
        role: TimelockRole,
        account: Address,
        tier: SecurityTier,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let call = TimelockCall::RevokeRole { role, account };
        let (held, state) = {
            let ledger = self.ledger.lock();
            let timelock = ledger.timelock(self.contracts.timelock(tier))?;
            let id = OperationCall::new(timelock.address(), call.encode()).id(Hash32::ZERO, salt);
            (timelock.has_role(role, account), timelock.operation_state(&id, ledger.now()))
        };
        // a revocation already in flight keeps advancing after the role is gone
        if !held && state == OperationState::Unset {
            return Err(GovernanceError::RoleNotHeld { role, account });
        }
        self.govern_timelock(tier, call, salt, |t| {
            expect("timelock role", &false, &t.has_role(role, account))
        })
    }

    /// Change the instance's minimum delay through its own operation.
    pub fn update_timelock_delay(
        &self,
        new_delay: u64,
        tier: SecurityTier,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        let call = TimelockCall::UpdateDelay { delay: new_delay };
        let (current, state) = {
            let ledger = self.ledger.lock();
            let timelock = ledger.timelock(self.contracts.timelock(tier))?;
            let id = OperationCall::new(timelock.address(), call.encode()).id(Hash32::ZERO, salt);
            (timelock.min_delay(), timelock.operation_state(&id, ledger.now()))
        };
        if current == new_delay && state == OperationState::Unset {
            return Err(GovernanceError::DelayUnchanged(current));
        }
        self.govern_timelock(tier, call, salt, |t| {
            expect("minimum delay", &new_delay, &t.min_delay())
        })
    }

    // ── Cancellation and status ─────────────────────────────────────────

    pub fn cancel(&self, tier: SecurityTier, id: Hash32) -> Result<Outcome, GovernanceError> {
        let timelock = self.contracts.timelock(tier);
        self.ledger.lock().cancel(timelock, self.actor, id)?;
        tracing::info!(%tier, actor = %self.actor, %id, "operation cancelled");
        Ok(Outcome::Cancelled { id })
    }

    /// Cancel the operation identified by its call parameters.
    pub fn cancel_call(
        &self,
        tier: SecurityTier,
        call: &OperationCall,
        predecessor: Hash32,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        self.cancel(tier, call.id(predecessor, salt))
    }

    pub fn cancel_batch(
        &self,
        tier: SecurityTier,
        calls: &[OperationCall],
        predecessor: Hash32,
        salt: Hash32,
    ) -> Result<Outcome, GovernanceError> {
        self.cancel(
            tier,
            govlock_codec::hash_operation_batch(calls, predecessor, salt),
        )
    }

    pub fn operation_state(&self, tier: SecurityTier, id: Hash32) -> Result<OperationState, GovernanceError> {
        let ledger = self.ledger.lock();
        let timelock = ledger.timelock(self.contracts.timelock(tier))?;
        Ok(timelock.operation_state(&id, ledger.now()))
    }
}

fn selector_of(call: &OperationCall) -> Result<Selector, GovernanceError> {
    call.selector()
        .ok_or(GovernanceError::Codec(CodecError::PayloadTooShort(call.payload.len())))
}

fn mismatch(what: &str, expected: &dyn fmt::Display, actual: &dyn fmt::Display) -> GovernanceError {
    tracing::error!(what, %expected, %actual, "post-condition mismatch");
    GovernanceError::PostconditionMismatch {
        what: what.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn expect<T: PartialEq + fmt::Display + ?Sized>(
    what: &str,
    expected: &T,
    actual: &T,
) -> Result<(), GovernanceError> {
    if expected == actual {
        Ok(())
    } else {
        Err(mismatch(what, &expected, &actual))
    }
}
