//! Everything the ledger holds, and how a call is routed to it.

use std::collections::BTreeMap;

use govlock_authority::{Authority, CapabilityRegistry};
use govlock_codec::{split_payload, OperationCall};
use govlock_timelock::{DispatchError, Environment, TimelockInstance};
use govlock_types::{Address, Selector, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, ParameterTarget};

/// What lives at an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractKind {
    Registry,
    Timelock,
    Target,
}

/// The contracts deployed on the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    registries: BTreeMap<Address, CapabilityRegistry>,
    timelocks: BTreeMap<Address, TimelockInstance>,
    targets: BTreeMap<Address, ParameterTarget>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_free(&self, address: Address) -> Result<(), LedgerError> {
        if self.kind_of(address).is_some() {
            return Err(LedgerError::DuplicateAddress(address));
        }
        Ok(())
    }

    pub fn add_registry(&mut self, registry: CapabilityRegistry) -> Result<(), LedgerError> {
        self.ensure_free(registry.address())?;
        self.registries.insert(registry.address(), registry);
        Ok(())
    }

    pub fn add_timelock(&mut self, timelock: TimelockInstance) -> Result<(), LedgerError> {
        self.ensure_free(timelock.address())?;
        self.timelocks.insert(timelock.address(), timelock);
        Ok(())
    }

    pub fn add_target(&mut self, target: ParameterTarget) -> Result<(), LedgerError> {
        self.ensure_free(target.address())?;
        self.targets.insert(target.address(), target);
        Ok(())
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    pub fn kind_of(&self, address: Address) -> Option<ContractKind> {
        if self.registries.contains_key(&address) {
            Some(ContractKind::Registry)
        } else if self.timelocks.contains_key(&address) {
            Some(ContractKind::Timelock)
        } else if self.targets.contains_key(&address) {
            Some(ContractKind::Target)
        } else {
            None
        }
    }

    pub fn registry(&self, address: Address) -> Option<&CapabilityRegistry> {
        self.registries.get(&address)
    }

    pub fn registry_mut(&mut self, address: Address) -> Option<&mut CapabilityRegistry> {
        self.registries.get_mut(&address)
    }

    pub fn timelock(&self, address: Address) -> Option<&TimelockInstance> {
        self.timelocks.get(&address)
    }

    pub fn timelock_mut(&mut self, address: Address) -> Option<&mut TimelockInstance> {
        self.timelocks.get_mut(&address)
    }

    pub fn target(&self, address: Address) -> Option<&ParameterTarget> {
        self.targets.get(&address)
    }

    pub fn registries(&self) -> impl Iterator<Item = &CapabilityRegistry> {
        self.registries.values()
    }

    pub fn timelocks(&self) -> impl Iterator<Item = &TimelockInstance> {
        self.timelocks.values()
    }

    pub fn targets(&self) -> impl Iterator<Item = &ParameterTarget> {
        self.targets.values()
    }

    pub fn timelock_by_label(&self, label: &str) -> Option<&TimelockInstance> {
        self.timelocks.values().find(|t| t.label() == label)
    }

    pub fn target_by_label(&self, label: &str) -> Option<&ParameterTarget> {
        self.targets.values().find(|t| t.label() == label)
    }

    /// Label of whatever contract lives at `address`.
    pub fn label_of(&self, address: Address) -> Option<&str> {
        self.timelocks
            .get(&address)
            .map(TimelockInstance::label)
            .or_else(|| self.targets.get(&address).map(ParameterTarget::label))
    }

    pub(crate) fn take_timelock(&mut self, address: Address) -> Result<TimelockInstance, LedgerError> {
        self.timelocks
            .remove(&address)
            .ok_or(LedgerError::UnknownTimelock(address))
    }

    pub(crate) fn restore_timelock(&mut self, timelock: TimelockInstance) {
        self.timelocks.insert(timelock.address(), timelock);
    }

    // ── Authorization ───────────────────────────────────────────────────

    /// The registry that gates `registry`'s own mutators, if deployed.
    fn governing_registry<'a>(
        &'a self,
        registry: &'a CapabilityRegistry,
    ) -> Option<&'a CapabilityRegistry> {
        if registry.is_self_governed() {
            Some(registry)
        } else {
            self.registries.get(&registry.authority())
        }
    }

    /// Whether `caller` may invoke `selector` on `target` as decided by the
    /// authority governing `target`.
    ///
    /// Timelocks gate calls to themselves with their own roles, so the answer
    /// for a timelock target is always yes here.
    pub fn can_call(&self, caller: Address, target: Address, selector: Selector) -> bool {
        if let Some(t) = self.targets.get(&target) {
            return self
                .registries
                .get(&t.authority())
                .is_some_and(|r| r.can_call(caller, target, selector));
        }
        if let Some(registry) = self.registries.get(&target) {
            let governing = self.governing_registry(registry);
            if governing.is_some_and(|r| r.is_burned(target, selector)) {
                return false;
            }
            return caller == registry.owner()
                || governing.is_some_and(|r| r.can_call(caller, target, selector));
        }
        self.timelocks.contains_key(&target)
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    /// Perform `call` as `caller`.
    pub fn dispatch(&mut self, caller: Address, call: &OperationCall) -> Result<Vec<u8>, LedgerError> {
        let target = call.target;
        match self.kind_of(target) {
            Some(ContractKind::Registry) => {
                reject_value(target, call.value)?;
                let decoded = {
                    let registry = self
                        .registries
                        .get(&target)
                        .ok_or(LedgerError::UnknownRegistry(target))?;
                    let external = if registry.is_self_governed() {
                        None
                    } else {
                        self.registries
                            .get(&registry.authority())
                            .map(|r| r as &dyn Authority)
                    };
                    registry.authorize_call(caller, &call.payload, external)?
                };
                self.registries
                    .get_mut(&target)
                    .ok_or(LedgerError::UnknownRegistry(target))?
                    .apply(&decoded)?;
                tracing::debug!(registry = %target, %caller, call = ?decoded, "registry updated");
                Ok(Vec::new())
            }
            Some(ContractKind::Timelock) => {
                reject_value(target, call.value)?;
                let timelock = self
                    .timelocks
                    .get_mut(&target)
                    .ok_or(LedgerError::UnknownTimelock(target))?;
                Ok(timelock.handle_call(caller, &call.payload)?)
            }
            Some(ContractKind::Target) => {
                let (selector, _) = split_payload(&call.payload)?;
                let gated = self
                    .targets
                    .get(&target)
                    .is_some_and(|t| t.is_setter(selector));
                if gated && !self.can_call(caller, target, selector) {
                    return Err(LedgerError::PermissionDenied {
                        caller,
                        target,
                        selector,
                    });
                }
                self.targets
                    .get_mut(&target)
                    .ok_or(LedgerError::UnknownTarget(target))?
                    .call(&call.payload, call.value)
            }
            None => Err(LedgerError::UnknownTarget(target)),
        }
    }
}

fn reject_value(target: Address, value: u128) -> Result<(), LedgerError> {
    if value != 0 {
        return Err(LedgerError::NonPayable { target, value });
    }
    Ok(())
}

/// The ledger as seen by an executing timelock. The executing instance is
/// taken out of the state for the duration; its own calls never get here.
pub(crate) struct Substrate<'a> {
    state: &'a mut LedgerState,
    now: Timestamp,
}

impl<'a> Substrate<'a> {
    pub(crate) fn new(state: &'a mut LedgerState, now: Timestamp) -> Self {
        Self { state, now }
    }
}

impl Environment for Substrate<'_> {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn can_call(&self, caller: Address, target: Address, selector: Selector) -> bool {
        self.state.can_call(caller, target, selector)
    }

    fn dispatch(&mut self, caller: Address, call: &OperationCall) -> Result<Vec<u8>, DispatchError> {
        self.state
            .dispatch(caller, call)
            .map_err(|e| Box::new(e) as DispatchError)
    }
}
