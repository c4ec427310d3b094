//! Where things live in a deployment.

use std::fmt;
use std::str::FromStr;

use govlock_ledger::LedgerState;
use govlock_types::Address;
use serde::{Deserialize, Serialize};

use crate::GovernanceError;

/// The governed business-logic contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Contract {
    CdpManager,
    PriceFeed,
    ActivePool,
    BorrowerOperations,
}

impl Contract {
    pub const ALL: [Contract; 4] = [
        Self::CdpManager,
        Self::PriceFeed,
        Self::ActivePool,
        Self::BorrowerOperations,
    ];

    /// Deployment label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CdpManager => "cdp_manager",
            Self::PriceFeed => "price_feed",
            Self::ActivePool => "active_pool",
            Self::BorrowerOperations => "borrower_operations",
        }
    }
}

/// Which timelock a change goes through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityTier {
    #[default]
    Lowsec,
    Highsec,
}

impl SecurityTier {
    pub fn from_highsec_flag(highsec: bool) -> Self {
        if highsec {
            Self::Highsec
        } else {
            Self::Lowsec
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lowsec => "lowsec",
            Self::Highsec => "highsec",
        }
    }
}

impl fmt::Display for SecurityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SecurityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowsec" | "low" => Ok(Self::Lowsec),
            "highsec" | "high" => Ok(Self::Highsec),
            other => Err(format!("unknown security tier: {other}")),
        }
    }
}

/// Addresses of the registry, both timelocks and the governed contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContractBook {
    pub registry: Address,
    pub lowsec: Address,
    pub highsec: Address,
    pub cdp_manager: Address,
    pub price_feed: Address,
    pub active_pool: Address,
    pub borrower_operations: Address,
}

impl ContractBook {
    /// Look every contract up by label. The deployment must have exactly one
    /// capability registry.
    pub fn resolve(state: &LedgerState) -> Result<Self, GovernanceError> {
        let missing = |what: &str| GovernanceError::MissingContract(what.to_string());
        let mut registries = state.registries();
        let registry = match (registries.next(), registries.next()) {
            (Some(r), None) => r.address(),
            _ => return Err(missing("single capability registry")),
        };
        let timelock = |tier: SecurityTier| {
            state
                .timelock_by_label(tier.label())
                .map(|t| t.address())
                .ok_or_else(|| missing(tier.label()))
        };
        let target = |contract: Contract| {
            state
                .target_by_label(contract.label())
                .map(|t| t.address())
                .ok_or_else(|| missing(contract.label()))
        };
        Ok(Self {
            registry,
            lowsec: timelock(SecurityTier::Lowsec)?,
            highsec: timelock(SecurityTier::Highsec)?,
            cdp_manager: target(Contract::CdpManager)?,
            price_feed: target(Contract::PriceFeed)?,
            active_pool: target(Contract::ActivePool)?,
            borrower_operations: target(Contract::BorrowerOperations)?,
        })
    }

    pub fn timelock(&self, tier: SecurityTier) -> Address {
        match tier {
            SecurityTier::Lowsec => self.lowsec,
            SecurityTier::Highsec => self.highsec,
        }
    }

    pub fn contract(&self, contract: Contract) -> Address {
        match contract {
            Contract::CdpManager => self.cdp_manager,
            Contract::PriceFeed => self.price_feed,
            Contract::ActivePool => self.active_pool,
            Contract::BorrowerOperations => self.borrower_operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govlock_ledger::GenesisConfig;

    #[test]
    fn resolves_preset() {
        let state = GenesisConfig::preset().build().unwrap();
        let book = ContractBook::resolve(&state).unwrap();
        assert_eq!(book.timelock(SecurityTier::Highsec), Address::from_label("highsec"));
        assert_eq!(book.contract(Contract::PriceFeed), Address::from_label("price_feed"));
        assert_eq!(book.registry, Address::from_label("authority"));
    }

    #[test]
    fn missing_timelock_is_reported() {
        let mut genesis = GenesisConfig::preset();
        genesis.timelocks.retain(|t| t.label != "highsec");
        let state = genesis.build().unwrap();
        assert!(matches!(
            ContractBook::resolve(&state),
            Err(GovernanceError::MissingContract(what)) if what == "highsec"
        ));
    }

    #[test]
    fn tier_flag() {
        assert_eq!(SecurityTier::from_highsec_flag(true), SecurityTier::Highsec);
        assert_eq!("LOW".parse::<SecurityTier>().unwrap(), SecurityTier::Lowsec);
    }
}
