//! The capability registry.
//!
//! Capabilities are keyed by `(target, selector)` and store the set of roles
//! enabled for the pair. A separate per-pair flag marks a function public or
//! burned. Burning is one-way: a burned pair can never be re-enabled.

use std::collections::BTreeMap;

use govlock_types::{Address, RoleId, Selector};
use serde::{Deserialize, Serialize};

use crate::call::RegistryCall;
use crate::{RegistryError, RoleSet};

/// Anything that can answer the capability question.
pub trait Authority {
    fn can_call(&self, caller: Address, target: Address, selector: Selector) -> bool;

    fn is_burned(&self, target: Address, selector: Selector) -> bool;
}

/// Per-pair flag orthogonal to the role matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityFlag {
    #[default]
    None,
    /// Callable by anyone.
    Public,
    /// Permanently disabled for every caller.
    Burned,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRegistry {
    address: Address,
    owner: Address,
    /// Authority consulted for this registry's own mutators.
    authority: Address,
    role_names: BTreeMap<RoleId, String>,
    user_roles: BTreeMap<Address, RoleSet>,
    capabilities: BTreeMap<Address, BTreeMap<Selector, RoleSet>>,
    flags: BTreeMap<Address, BTreeMap<Selector, CapabilityFlag>>,
}

impl CapabilityRegistry {
    /// A self-governed registry: its mutators are gated by its own matrix.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            authority: address,
            role_names: BTreeMap::new(),
            user_roles: BTreeMap::new(),
            capabilities: BTreeMap::new(),
            flags: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    pub fn is_self_governed(&self) -> bool {
        self.authority == self.address
    }

    // ── Gated entry point ───────────────────────────────────────────────

    /// Decode a payload addressed to this registry and check the caller may
    /// make it.
    ///
    /// `external` is the registry configured as this registry's authority
    /// when it is not self-governed. With no external authority available,
    /// only the owner passes.
    pub fn authorize_call(
        &self,
        caller: Address,
        payload: &[u8],
        external: Option<&dyn Authority>,
    ) -> Result<RegistryCall, RegistryError> {
        let call = RegistryCall::decode(payload)?;
        let selector = call.function().selector();
        let governing: Option<&dyn Authority> = if self.is_self_governed() {
            Some(self)
        } else {
            external
        };
        // a burned mutator is closed to the owner as well
        if governing.is_some_and(|a| a.is_burned(self.address, selector)) {
            tracing::warn!(%caller, %selector, registry = %self.address, "registry call to burned function");
            return Err(RegistryError::Unauthorized { caller, selector });
        }
        let allowed =
            caller == self.owner || governing.is_some_and(|a| a.can_call(caller, self.address, selector));
        if !allowed {
            tracing::warn!(%caller, %selector, registry = %self.address, "registry call rejected");
            return Err(RegistryError::Unauthorized { caller, selector });
        }
        Ok(call)
    }

    /// Gate and apply a payload against a self-governed registry.
    pub fn call(&mut self, caller: Address, payload: &[u8]) -> Result<RegistryCall, RegistryError> {
        let call = self.authorize_call(caller, payload, None)?;
        self.apply(&call)?;
        Ok(call)
    }

    /// Apply an already-authorized mutation.
    pub fn apply(&mut self, call: &RegistryCall) -> Result<(), RegistryError> {
        match call {
            RegistryCall::SetRoleName { role, name } => self.set_role_name(*role, name),
            RegistryCall::SetUserRole {
                user,
                role,
                enabled,
            } => self.set_user_role(*user, *role, *enabled),
            RegistryCall::SetRoleCapability {
                role,
                target,
                selector,
                enabled,
            } => self.set_role_capability(*role, *target, *selector, *enabled)?,
            RegistryCall::SetPublicCapability {
                target,
                selector,
                enabled,
            } => self.set_public_capability(*target, *selector, *enabled)?,
            RegistryCall::BurnCapability { target, selector } => {
                self.burn_capability(*target, *selector)
            }
            RegistryCall::SetAuthority { authority } => self.set_authority(*authority),
        }
        Ok(())
    }

    // ── Unchecked mutators (genesis and `apply`) ────────────────────────

    /// An empty name unassigns the role's name.
    pub fn set_role_name(&mut self, role: RoleId, name: &str) {
        if name.is_empty() {
            self.role_names.remove(&role);
        } else {
            self.role_names.insert(role, name.to_string());
        }
    }

    pub fn set_user_role(&mut self, user: Address, role: RoleId, enabled: bool) {
        let set = self.user_roles.entry(user).or_default();
        set.set(role, enabled);
        if set.is_empty() {
            self.user_roles.remove(&user);
        }
        tracing::debug!(%user, %role, enabled, "user role updated");
    }

    pub fn set_role_capability(
        &mut self,
        role: RoleId,
        target: Address,
        selector: Selector,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.ensure_not_burned(target, selector)?;
        let per_target = self.capabilities.entry(target).or_default();
        let set = per_target.entry(selector).or_default();
        set.set(role, enabled);
        if set.is_empty() {
            per_target.remove(&selector);
            if per_target.is_empty() {
                self.capabilities.remove(&target);
            }
        }
        tracing::debug!(%role, %target, %selector, enabled, "role capability updated");
        Ok(())
    }

    pub fn set_public_capability(
        &mut self,
        target: Address,
        selector: Selector,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.ensure_not_burned(target, selector)?;
        let flag = if enabled {
            CapabilityFlag::Public
        } else {
            CapabilityFlag::None
        };
        self.set_flag(target, selector, flag);
        tracing::debug!(%target, %selector, enabled, "public capability updated");
        Ok(())
    }

    /// Burn a pair. Burning an already-burned pair is a no-op.
    pub fn burn_capability(&mut self, target: Address, selector: Selector) {
        if self.capability_flag(target, selector) == CapabilityFlag::Burned {
            return;
        }
        self.set_flag(target, selector, CapabilityFlag::Burned);
        tracing::info!(%target, %selector, "capability burned");
    }

    pub fn set_authority(&mut self, authority: Address) {
        tracing::info!(registry = %self.address, %authority, "registry authority changed");
        self.authority = authority;
    }

    fn set_flag(&mut self, target: Address, selector: Selector, flag: CapabilityFlag) {
        let per_target = self.flags.entry(target).or_default();
        if flag == CapabilityFlag::None {
            per_target.remove(&selector);
            if per_target.is_empty() {
                self.flags.remove(&target);
            }
        } else {
            per_target.insert(selector, flag);
        }
    }

    fn ensure_not_burned(&self, target: Address, selector: Selector) -> Result<(), RegistryError> {
        if self.capability_flag(target, selector) == CapabilityFlag::Burned {
            return Err(RegistryError::BurnedCapability { target, selector });
        }
        Ok(())
    }

    fn role_set(&self, target: Address, selector: Selector) -> RoleSet {
        self.capabilities
            .get(&target)
            .and_then(|m| m.get(&selector))
            .copied()
            .unwrap_or_default()
    }

    fn user_set(&self, user: Address) -> RoleSet {
        self.user_roles.get(&user).copied().unwrap_or_default()
    }

    // ── Lens ────────────────────────────────────────────────────────────

    pub fn role_name(&self, role: RoleId) -> &str {
        self.role_names.get(&role).map(String::as_str).unwrap_or("")
    }

    /// Roles with an assigned name, ascending.
    pub fn named_roles(&self) -> Vec<(RoleId, &str)> {
        self.role_names
            .iter()
            .map(|(r, n)| (*r, n.as_str()))
            .collect()
    }

    pub fn does_user_have_role(&self, user: Address, role: RoleId) -> bool {
        self.user_set(user).contains(role)
    }

    pub fn does_role_have_capability(
        &self,
        role: RoleId,
        target: Address,
        selector: Selector,
    ) -> bool {
        self.role_set(target, selector).contains(role)
    }

    pub fn capability_flag(&self, target: Address, selector: Selector) -> CapabilityFlag {
        self.flags
            .get(&target)
            .and_then(|m| m.get(&selector))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_public_capability(&self, target: Address, selector: Selector) -> bool {
        self.capability_flag(target, selector) == CapabilityFlag::Public
    }

    pub fn is_burned(&self, target: Address, selector: Selector) -> bool {
        self.capability_flag(target, selector) == CapabilityFlag::Burned
    }

    pub fn roles_of(&self, user: Address) -> Vec<RoleId> {
        self.user_set(user).iter().collect()
    }

    pub fn users_by_role(&self, role: RoleId) -> Vec<Address> {
        self.user_roles
            .iter()
            .filter(|(_, set)| set.contains(role))
            .map(|(user, _)| *user)
            .collect()
    }

    /// Bitmask of roles enabled for the pair.
    pub fn roles_with_capability(&self, target: Address, selector: Selector) -> RoleSet {
        self.role_set(target, selector)
    }

    /// Selectors on `target` callable by someone: enabled for a role or
    /// public, and not burned.
    pub fn enabled_functions_in_target(&self, target: Address) -> Vec<Selector> {
        let mut out: Vec<Selector> = self
            .capabilities
            .get(&target)
            .into_iter()
            .flat_map(|m| m.keys().copied())
            .chain(
                self.flags
                    .get(&target)
                    .into_iter()
                    .flat_map(|m| m.iter())
                    .filter(|(_, f)| **f == CapabilityFlag::Public)
                    .map(|(s, _)| *s),
            )
            .filter(|s| !self.is_burned(target, *s))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Every target with at least one capability entry or flag.
    pub fn targets(&self) -> Vec<Address> {
        let mut out: Vec<Address> = self
            .capabilities
            .keys()
            .chain(self.flags.keys())
            .copied()
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

impl Authority for CapabilityRegistry {
    fn can_call(&self, caller: Address, target: Address, selector: Selector) -> bool {
        match self.capability_flag(target, selector) {
            CapabilityFlag::Burned => false,
            CapabilityFlag::Public => true,
            CapabilityFlag::None => self.user_set(caller).intersects(&self.role_set(target, selector)),
        }
    }

    fn is_burned(&self, target: Address, selector: Selector) -> bool {
        self.capability_flag(target, selector) == CapabilityFlag::Burned
    }
}
