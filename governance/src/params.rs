//! The governed protocol parameters.

use std::fmt;
use std::str::FromStr;

use govlock_codec::abi::{ParamType, Token};
use govlock_codec::{encode_call, FunctionSignature};
use serde::{Deserialize, Serialize};

use crate::{Contract, GovernanceError};

/// Every parameter the client knows how to change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernedParam {
    // CDP manager
    StakingRewardSplit,
    RedemptionFeeFloor,
    MinuteDecayFactor,
    Beta,
    RedemptionsPaused,
    GracePeriod,

    // Price feed
    FallbackCaller,
    CollateralFeedSource,

    // Active pool
    ActivePoolFeeBps,
    ActivePoolFeeRecipient,
    ActivePoolFlashLoansPaused,

    // Borrower operations
    BorrowerOperationsFeeBps,
    BorrowerOperationsFeeRecipient,
    BorrowerOperationsFlashLoansPaused,
}

impl GovernedParam {
    pub const ALL: [GovernedParam; 14] = [
        Self::StakingRewardSplit,
        Self::RedemptionFeeFloor,
        Self::MinuteDecayFactor,
        Self::Beta,
        Self::RedemptionsPaused,
        Self::GracePeriod,
        Self::FallbackCaller,
        Self::CollateralFeedSource,
        Self::ActivePoolFeeBps,
        Self::ActivePoolFeeRecipient,
        Self::ActivePoolFlashLoansPaused,
        Self::BorrowerOperationsFeeBps,
        Self::BorrowerOperationsFeeRecipient,
        Self::BorrowerOperationsFlashLoansPaused,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::StakingRewardSplit => "staking_reward_split",
            Self::RedemptionFeeFloor => "redemption_fee_floor",
            Self::MinuteDecayFactor => "minute_decay_factor",
            Self::Beta => "beta",
            Self::RedemptionsPaused => "redemptions_paused",
            Self::GracePeriod => "grace_period",
            Self::FallbackCaller => "fallback_caller",
            Self::CollateralFeedSource => "collateral_feed_source",
            Self::ActivePoolFeeBps => "active_pool_fee_bps",
            Self::ActivePoolFeeRecipient => "active_pool_fee_recipient",
            Self::ActivePoolFlashLoansPaused => "active_pool_flash_loans_paused",
            Self::BorrowerOperationsFeeBps => "borrower_operations_fee_bps",
            Self::BorrowerOperationsFeeRecipient => "borrower_operations_fee_recipient",
            Self::BorrowerOperationsFlashLoansPaused => "borrower_operations_flash_loans_paused",
        }
    }

    pub fn contract(&self) -> Contract {
        match self {
            Self::StakingRewardSplit
            | Self::RedemptionFeeFloor
            | Self::MinuteDecayFactor
            | Self::Beta
            | Self::RedemptionsPaused
            | Self::GracePeriod => Contract::CdpManager,
            Self::FallbackCaller | Self::CollateralFeedSource => Contract::PriceFeed,
            Self::ActivePoolFeeBps
            | Self::ActivePoolFeeRecipient
            | Self::ActivePoolFlashLoansPaused => Contract::ActivePool,
            Self::BorrowerOperationsFeeBps
            | Self::BorrowerOperationsFeeRecipient
            | Self::BorrowerOperationsFlashLoansPaused => Contract::BorrowerOperations,
        }
    }

    /// Canonical setter signature on the target.
    pub fn setter(&self) -> &'static str {
        match self {
            Self::StakingRewardSplit => "setStakingRewardSplit(uint256)",
            Self::RedemptionFeeFloor => "setRedemptionFeeFloor(uint256)",
            Self::MinuteDecayFactor => "setMinuteDecayFactor(uint256)",
            Self::Beta => "setBeta(uint256)",
            Self::RedemptionsPaused => "setRedemptionsPaused(bool)",
            Self::GracePeriod => "setGracePeriod(uint128)",
            Self::FallbackCaller => "setFallbackCaller(address)",
            Self::CollateralFeedSource => "setCollateralFeedSource(bool)",
            Self::ActivePoolFeeBps | Self::BorrowerOperationsFeeBps => "setFeeBps(uint256)",
            Self::ActivePoolFeeRecipient | Self::BorrowerOperationsFeeRecipient => {
                "setFeeRecipientAddress(address)"
            }
            Self::ActivePoolFlashLoansPaused | Self::BorrowerOperationsFlashLoansPaused => {
                "setFlashLoansPaused(bool)"
            }
        }
    }

    /// Storage slot read back for the post-condition.
    pub fn slot(&self) -> &'static str {
        match self {
            Self::StakingRewardSplit => "stakingRewardSplit",
            Self::RedemptionFeeFloor => "redemptionFeeFloor",
            Self::MinuteDecayFactor => "minuteDecayFactor",
            Self::Beta => "beta",
            Self::RedemptionsPaused => "redemptionsPaused",
            Self::GracePeriod => "recoveryModeGracePeriodDuration",
            Self::FallbackCaller => "fallbackCaller",
            Self::CollateralFeedSource => "useDynamicFeed",
            Self::ActivePoolFeeBps | Self::BorrowerOperationsFeeBps => "feeBps",
            Self::ActivePoolFeeRecipient | Self::BorrowerOperationsFeeRecipient => {
                "feeRecipientAddress"
            }
            Self::ActivePoolFlashLoansPaused | Self::BorrowerOperationsFlashLoansPaused => {
                "flashLoansPaused"
            }
        }
    }

    /// Emergency switches that may skip the timelock.
    pub fn allows_fast_path(&self) -> bool {
        matches!(
            self,
            Self::RedemptionsPaused
                | Self::ActivePoolFlashLoansPaused
                | Self::BorrowerOperationsFlashLoansPaused
        )
    }

    pub fn signature(&self) -> Result<FunctionSignature, GovernanceError> {
        Ok(FunctionSignature::parse(self.setter())?)
    }

    pub fn value_type(&self) -> Result<ParamType, GovernanceError> {
        self.signature()?
            .inputs
            .into_iter()
            .next()
            .ok_or_else(|| GovernanceError::UnknownParam(self.name().to_string()))
    }

    /// Parse operator input for this parameter.
    pub fn parse_value(&self, text: &str) -> Result<Token, GovernanceError> {
        Ok(Token::parse(&self.value_type()?, text)?)
    }

    /// Setter payload for `value`, type-checked.
    pub fn payload(&self, value: &Token) -> Result<Vec<u8>, GovernanceError> {
        let expected = self.value_type()?;
        if !value.matches(&expected) {
            return Err(GovernanceError::TypeMismatch {
                param: self.name().to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(encode_call(&self.signature()?, std::slice::from_ref(value))?)
    }
}

impl fmt::Display for GovernedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GovernedParam {
    type Err = GovernanceError;

    /// Accepts `active_pool_fee_bps` or `active-pool-fee-bps`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| GovernanceError::UnknownParam(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govlock_types::Address;

    #[test]
    fn names_round_trip() {
        for param in GovernedParam::ALL {
            assert_eq!(param.name().parse::<GovernedParam>().unwrap(), param);
            param.signature().unwrap();
        }
        assert_eq!(
            "Active-Pool-Fee-Bps".parse::<GovernedParam>().unwrap(),
            GovernedParam::ActivePoolFeeBps
        );
        assert!("fee".parse::<GovernedParam>().is_err());
    }

    #[test]
    fn only_pause_switches_take_the_fast_path() {
        let fast: Vec<_> = GovernedParam::ALL
            .into_iter()
            .filter(GovernedParam::allows_fast_path)
            .collect();
        assert_eq!(fast.len(), 3);
        assert!(fast.iter().all(|p| p.setter().ends_with("(bool)")));
    }

    #[test]
    fn payload_is_type_checked() {
        let param = GovernedParam::FallbackCaller;
        assert!(matches!(
            param.payload(&Token::Uint(1)),
            Err(GovernanceError::TypeMismatch { .. })
        ));
        let payload = param.payload(&Token::Address(Address::repeat_byte(1))).unwrap();
        assert_eq!(&payload[..4], param.signature().unwrap().selector().as_bytes());
    }

    #[test]
    fn parse_value_uses_setter_type() {
        assert_eq!(
            GovernedParam::Beta.parse_value("3").unwrap(),
            Token::Uint(3)
        );
        assert_eq!(
            GovernedParam::RedemptionsPaused.parse_value("true").unwrap(),
            Token::Bool(true)
        );
        assert!(GovernedParam::Beta.parse_value("yes").is_err());
    }
}
