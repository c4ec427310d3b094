//! Genesis: the deployment a fresh ledger starts from.
//!
//! A `GenesisConfig` names one capability registry, the timelock instances,
//! the parameter targets and the initial role/capability matrix. Contracts
//! are referred to by label anywhere an address is expected; a string that
//! is neither a `0x` address nor a contract label is treated as an account
//! label and mapped through `Address::from_label`.

use std::collections::BTreeMap;
use std::path::Path;

use govlock_authority::CapabilityRegistry;
use govlock_codec::abi::{ParamType, Token};
use govlock_codec::FunctionSignature;
use govlock_timelock::{TimelockInstance, TimelockRole};
use govlock_types::{Address, RoleId, Selector};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, LedgerState, ParameterTarget, Setter};

/// Two days.
pub const LOWSEC_MIN_DELAY: u64 = 2 * 24 * 60 * 60;
/// Seven days.
pub const HIGHSEC_MIN_DELAY: u64 = 7 * 24 * 60 * 60;

pub const ADMIN_ROLE: RoleId = RoleId::new(0);
pub const HIGHSEC_PARAMETERS_ROLE: RoleId = RoleId::new(2);
pub const LOWSEC_PARAMETERS_ROLE: RoleId = RoleId::new(3);
pub const PAUSE_GUARDIAN_ROLE: RoleId = RoleId::new(4);

pub const MAX_FEE_BPS: u64 = 1_000;
pub const MAX_REWARD_SPLIT: u64 = 10_000;
pub const MINIMUM_GRACE_PERIOD: u64 = 15 * 60;
pub const DECIMAL_PRECISION: u64 = 1_000_000_000_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySpec {
    #[serde(default = "default_registry_label")]
    pub label: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Account allowed to bypass the capability matrix. None: fully
    /// self-governed from the start.
    #[serde(default)]
    pub owner: Option<String>,
}

impl Default for RegistrySpec {
    fn default() -> Self {
        Self {
            label: default_registry_label(),
            address: None,
            owner: None,
        }
    }
}

fn default_registry_label() -> String {
    "authority".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockSpec {
    pub label: String,
    #[serde(default)]
    pub address: Option<String>,
    pub min_delay: u64,
    #[serde(default)]
    pub proposers: Vec<String>,
    #[serde(default)]
    pub executors: Vec<String>,
    #[serde(default)]
    pub cancellers: Vec<String>,
    /// Extra admins; every instance is always its own admin.
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetterSpec {
    pub signature: String,
    pub slot: String,
    /// Parsed according to the setter's argument type. Defaults to zero.
    #[serde(default)]
    pub initial: Option<String>,
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub label: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub setters: Vec<SetterSpec>,
}

/// Functions on one target, by canonical signature or `0x` selector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub target: String,
    pub functions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub id: u8,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<CapabilitySpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    #[serde(default)]
    pub registry: RegistrySpec,
    #[serde(default)]
    pub timelocks: Vec<TimelockSpec>,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub roles: Vec<RoleSpec>,
    #[serde(default)]
    pub public_capabilities: Vec<CapabilitySpec>,
    #[serde(default)]
    pub burned_capabilities: Vec<CapabilitySpec>,
}

impl GenesisConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| LedgerError::Genesis(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, LedgerError> {
        toml::from_str(s).map_err(|e| LedgerError::Genesis(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, LedgerError> {
        toml::to_string_pretty(self).map_err(|e| LedgerError::Genesis(e.to_string()))
    }

    /// The stock deployment: lowsec (2 days) proposed by techops, highsec
    /// (7 days) proposed by security, the four protocol targets, and a matrix
    /// where highsec administers the registry and can set everything, lowsec
    /// can set the CDP and pool parameters, and both multisigs can pause.
    pub fn preset() -> Self {
        let s = |v: &str| v.to_string();
        let setter = |signature: &str, slot: &str, initial: &str, min: Option<u64>, max: Option<u64>| {
            SetterSpec {
                signature: s(signature),
                slot: s(slot),
                initial: Some(s(initial)),
                min,
                max,
            }
        };
        let pool_setters = || {
            vec![
                setter("setFeeBps(uint256)", "feeBps", "0", Some(0), Some(MAX_FEE_BPS)),
                setter(
                    "setFeeRecipientAddress(address)",
                    "feeRecipientAddress",
                    "treasury",
                    None,
                    None,
                ),
                setter("setFlashLoansPaused(bool)", "flashLoansPaused", "false", None, None),
            ]
        };
        let cdp_setters = vec![
            setter(
                "setStakingRewardSplit(uint256)",
                "stakingRewardSplit",
                "5000",
                Some(0),
                Some(MAX_REWARD_SPLIT),
            ),
            setter(
                "setRedemptionFeeFloor(uint256)",
                "redemptionFeeFloor",
                "5000000000000000",
                Some(DECIMAL_PRECISION / 200),
                Some(DECIMAL_PRECISION),
            ),
            setter(
                "setMinuteDecayFactor(uint256)",
                "minuteDecayFactor",
                "999037758833783000",
                Some(1),
                Some(DECIMAL_PRECISION - 1),
            ),
            setter("setBeta(uint256)", "beta", "2", None, None),
            setter("setRedemptionsPaused(bool)", "redemptionsPaused", "false", None, None),
            setter(
                "setGracePeriod(uint128)",
                "recoveryModeGracePeriodDuration",
                "900",
                Some(MINIMUM_GRACE_PERIOD),
                None,
            ),
        ];
        let feed_setters = vec![
            setter(
                "setFallbackCaller(address)",
                "fallbackCaller",
                "0x0000000000000000000000000000000000000000",
                None,
                None,
            ),
            setter("setCollateralFeedSource(bool)", "useDynamicFeed", "false", None, None),
        ];

        let target = |label: &str, setters: Vec<SetterSpec>| TargetSpec {
            label: s(label),
            address: None,
            setters,
        };
        let targets = vec![
            target("cdp_manager", cdp_setters),
            target("price_feed", feed_setters),
            target("active_pool", pool_setters()),
            target("borrower_operations", pool_setters()),
        ];

        let every_setter = |t: &TargetSpec| CapabilitySpec {
            target: t.label.clone(),
            functions: t.setters.iter().map(|st| st.signature.clone()).collect(),
        };
        let highsec_caps: Vec<CapabilitySpec> = targets.iter().map(every_setter).collect();
        let lowsec_caps: Vec<CapabilitySpec> = targets
            .iter()
            .filter(|t| t.label != "price_feed")
            .map(every_setter)
            .collect();
        let registry_caps = vec![CapabilitySpec {
            target: default_registry_label(),
            functions: govlock_authority::RegistryFunction::ALL
                .iter()
                .map(|f| f.signature().canonical())
                .collect(),
        }];
        let pause_caps = vec![
            CapabilitySpec {
                target: s("cdp_manager"),
                functions: vec![s("setRedemptionsPaused(bool)")],
            },
            CapabilitySpec {
                target: s("active_pool"),
                functions: vec![s("setFlashLoansPaused(bool)")],
            },
            CapabilitySpec {
                target: s("borrower_operations"),
                functions: vec![s("setFlashLoansPaused(bool)")],
            },
        ];

        Self {
            registry: RegistrySpec::default(),
            timelocks: vec![
                TimelockSpec {
                    label: s("lowsec"),
                    address: None,
                    min_delay: LOWSEC_MIN_DELAY,
                    proposers: vec![s("techops")],
                    executors: vec![s("techops")],
                    cancellers: vec![s("techops"), s("security")],
                    admins: Vec::new(),
                },
                TimelockSpec {
                    label: s("highsec"),
                    address: None,
                    min_delay: HIGHSEC_MIN_DELAY,
                    proposers: vec![s("security")],
                    executors: vec![s("security")],
                    cancellers: vec![s("security")],
                    admins: Vec::new(),
                },
            ],
            targets,
            roles: vec![
                RoleSpec {
                    id: ADMIN_ROLE.get(),
                    name: s("Admin"),
                    members: vec![s("highsec")],
                    capabilities: registry_caps,
                },
                RoleSpec {
                    id: HIGHSEC_PARAMETERS_ROLE.get(),
                    name: s("Parameters: highsec"),
                    members: vec![s("highsec")],
                    capabilities: highsec_caps,
                },
                RoleSpec {
                    id: LOWSEC_PARAMETERS_ROLE.get(),
                    name: s("Parameters: lowsec"),
                    members: vec![s("lowsec")],
                    capabilities: lowsec_caps,
                },
                RoleSpec {
                    id: PAUSE_GUARDIAN_ROLE.get(),
                    name: s("Pause guardian"),
                    members: vec![s("techops"), s("security")],
                    capabilities: pause_caps,
                },
            ],
            public_capabilities: Vec::new(),
            burned_capabilities: Vec::new(),
        }
    }

    /// Deploy everything into a fresh state.
    pub fn build(&self) -> Result<LedgerState, LedgerError> {
        let contracts = self.contract_addresses()?;
        let resolve = |s: &str| resolve(&contracts, s);

        let registry_address = contracts[&self.registry.label];
        let owner = match &self.registry.owner {
            Some(owner) => resolve(owner)?,
            None => Address::ZERO,
        };
        let mut registry = CapabilityRegistry::new(registry_address, owner);

        let mut state = LedgerState::new();
        for spec in &self.timelocks {
            let mut timelock =
                TimelockInstance::new(&spec.label, contracts[&spec.label], spec.min_delay);
            let groups = [
                (TimelockRole::Proposer, &spec.proposers),
                (TimelockRole::Executor, &spec.executors),
                (TimelockRole::Canceller, &spec.cancellers),
                (TimelockRole::Admin, &spec.admins),
            ];
            for (role, accounts) in groups {
                for account in accounts {
                    timelock.add_member(role, resolve(account)?);
                }
            }
            state.add_timelock(timelock)?;
        }

        for spec in &self.targets {
            let mut target =
                ParameterTarget::new(&spec.label, contracts[&spec.label], registry_address);
            for st in &spec.setters {
                let setter = Setter {
                    signature: FunctionSignature::parse(&st.signature)?.canonical(),
                    slot: st.slot.clone(),
                    min: st.min.map(u128::from),
                    max: st.max.map(u128::from),
                };
                let param = setter.param()?;
                let initial = match &st.initial {
                    Some(text) => initial_token(&contracts, &param, text)?,
                    None => zero_token(&param),
                };
                target.add_setter(setter, initial)?;
            }
            state.add_target(target)?;
        }

        for role in &self.roles {
            let id = RoleId::new(role.id);
            if !role.name.is_empty() {
                registry.set_role_name(id, &role.name);
            }
            for member in &role.members {
                registry.set_user_role(resolve(member)?, id, true);
            }
            for cap in &role.capabilities {
                let target = resolve(&cap.target)?;
                for function in &cap.functions {
                    registry.set_role_capability(id, target, selector_of(function)?, true)?;
                }
            }
        }
        for cap in &self.public_capabilities {
            let target = resolve(&cap.target)?;
            for function in &cap.functions {
                registry.set_public_capability(target, selector_of(function)?, true)?;
            }
        }
        for cap in &self.burned_capabilities {
            let target = resolve(&cap.target)?;
            for function in &cap.functions {
                registry.burn_capability(target, selector_of(function)?);
            }
        }
        state.add_registry(registry)?;

        tracing::info!(
            registry = %registry_address,
            timelocks = self.timelocks.len(),
            targets = self.targets.len(),
            roles = self.roles.len(),
            "genesis built"
        );
        Ok(state)
    }

    fn contract_addresses(&self) -> Result<BTreeMap<String, Address>, LedgerError> {
        let mut contracts = BTreeMap::new();
        let declared = std::iter::once((&self.registry.label, &self.registry.address))
            .chain(self.timelocks.iter().map(|t| (&t.label, &t.address)))
            .chain(self.targets.iter().map(|t| (&t.label, &t.address)));
        for (label, address) in declared {
            let address = match address {
                Some(hex) => hex.parse().map_err(|e| {
                    LedgerError::Genesis(format!("address of {label}: {e}"))
                })?,
                None => Address::from_label(label),
            };
            if contracts.insert(label.clone(), address).is_some() {
                return Err(LedgerError::Genesis(format!("duplicate contract label {label}")));
            }
        }
        Ok(contracts)
    }
}

fn resolve(contracts: &BTreeMap<String, Address>, s: &str) -> Result<Address, LedgerError> {
    if s.starts_with("0x") {
        return s
            .parse()
            .map_err(|e| LedgerError::Genesis(format!("bad address {s}: {e}")));
    }
    Ok(contracts
        .get(s)
        .copied()
        .unwrap_or_else(|| Address::from_label(s)))
}

fn selector_of(function: &str) -> Result<Selector, LedgerError> {
    if function.starts_with("0x") {
        return function
            .parse()
            .map_err(|e| LedgerError::Genesis(format!("bad selector {function}: {e}")));
    }
    Ok(FunctionSignature::parse(function)?.selector())
}

fn initial_token(
    contracts: &BTreeMap<String, Address>,
    param: &ParamType,
    text: &str,
) -> Result<Token, LedgerError> {
    if *param == ParamType::Address {
        return Ok(Token::Address(resolve(contracts, text)?));
    }
    Ok(Token::parse(param, text)?)
}

fn zero_token(param: &ParamType) -> Token {
    match param {
        ParamType::Address => Token::Address(Address::ZERO),
        ParamType::Uint(_) => Token::Uint(0),
        ParamType::Bool => Token::Bool(false),
        ParamType::FixedBytes(n) => Token::FixedBytes(vec![0; *n]),
        ParamType::Bytes => Token::Bytes(Vec::new()),
        ParamType::String => Token::String(String::new()),
        ParamType::Array(_) => Token::Array(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govlock_authority::{Authority, RegistryFunction};

    #[test]
    fn preset_builds() {
        let state = GenesisConfig::preset().build().unwrap();
        let lowsec = state.timelock_by_label("lowsec").unwrap();
        let highsec = state.timelock_by_label("highsec").unwrap();
        assert_eq!(lowsec.min_delay(), LOWSEC_MIN_DELAY);
        assert_eq!(highsec.min_delay(), HIGHSEC_MIN_DELAY);
        assert!(lowsec.has_role(TimelockRole::Proposer, Address::from_label("techops")));
        assert_eq!(state.targets().count(), 4);

        let registry = state.registry(Address::from_label("authority")).unwrap();
        assert_eq!(registry.role_name(LOWSEC_PARAMETERS_ROLE), "Parameters: lowsec");
        let pool = state.target_by_label("active_pool").unwrap();
        let (fee, _) = pool.setter_named("setFeeBps").unwrap();
        assert!(registry.can_call(lowsec.address(), pool.address(), fee));
        assert!(!registry.can_call(Address::from_label("techops"), pool.address(), fee));

        let feed = state.target_by_label("price_feed").unwrap();
        let (fallback, _) = feed.setter_named("setFallbackCaller").unwrap();
        assert!(!registry.can_call(lowsec.address(), feed.address(), fallback));
        assert!(registry.can_call(highsec.address(), feed.address(), fallback));

        assert!(registry.can_call(
            highsec.address(),
            registry.address(),
            RegistryFunction::SetUserRole.selector()
        ));
        assert_eq!(
            pool.slot("feeRecipientAddress"),
            Some(&Token::Address(Address::from_label("treasury")))
        );
    }

    #[test]
    fn preset_round_trips_through_toml() {
        let preset = GenesisConfig::preset();
        let text = preset.to_toml_string().unwrap();
        assert_eq!(GenesisConfig::from_toml_str(&text).unwrap(), preset);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = GenesisConfig::from_toml_str(
            r#"
            [[timelocks]]
            label = "lowsec"
            min_delay = 60
            proposers = ["ops"]

            [[targets]]
            label = "pool"
            [[targets.setters]]
            signature = "setFeeBps(uint256)"
            slot = "feeBps"
            max = 1000

            [[roles]]
            id = 5
            members = ["lowsec"]
            capabilities = [{ target = "pool", functions = ["setFeeBps(uint256)"] }]
            "#,
        )
        .unwrap();
        assert_eq!(config.registry.label, "authority");
        let state = config.build().unwrap();
        let pool = state.target_by_label("pool").unwrap();
        assert_eq!(pool.slot("feeBps"), Some(&Token::Uint(0)));
        let registry = state.registry(Address::from_label("authority")).unwrap();
        assert_eq!(registry.owner(), Address::ZERO);
        assert!(registry.does_user_have_role(Address::from_label("lowsec"), RoleId::new(5)));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let mut config = GenesisConfig::preset();
        config.targets[0].label = "lowsec".into();
        assert!(matches!(config.build(), Err(LedgerError::Genesis(_))));
    }

    #[test]
    fn out_of_bounds_initial_value_is_rejected() {
        let mut config = GenesisConfig::preset();
        config.targets[2].setters[0].initial = Some("5000".into());
        assert!(matches!(config.build(), Err(LedgerError::OutOfBounds { .. })));
    }

    #[test]
    fn missing_file_returns_genesis_error() {
        let err = GenesisConfig::from_toml_file("/nonexistent/genesis.toml").unwrap_err();
        assert!(matches!(err, LedgerError::Genesis(_)));
    }
}
