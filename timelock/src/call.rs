//! Calls a timelock accepts on its own address.

use govlock_codec::abi::{self, ParamType, Token};
use govlock_codec::FunctionSignature;
use govlock_types::{Address, Selector};

use crate::{TimelockError, TimelockRole};

/// Administrative calls handled by the instance itself.
///
/// `UpdateDelay` is accepted only from the instance's own address, i.e. only
/// as part of an executed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelockCall {
    UpdateDelay { delay: u64 },
    GrantRole { role: TimelockRole, account: Address },
    RevokeRole { role: TimelockRole, account: Address },
    RenounceRole { role: TimelockRole, account: Address },
}

const UPDATE_DELAY: &str = "updateDelay";
const GRANT_ROLE: &str = "grantRole";
const REVOKE_ROLE: &str = "revokeRole";
const RENOUNCE_ROLE: &str = "renounceRole";

fn signature(name: &str) -> FunctionSignature {
    let inputs = if name == UPDATE_DELAY {
        vec![ParamType::Uint(256)]
    } else {
        vec![ParamType::Uint(8), ParamType::Address]
    };
    FunctionSignature {
        name: name.to_string(),
        inputs,
    }
}

impl TimelockCall {
    fn name(&self) -> &'static str {
        match self {
            Self::UpdateDelay { .. } => UPDATE_DELAY,
            Self::GrantRole { .. } => GRANT_ROLE,
            Self::RevokeRole { .. } => REVOKE_ROLE,
            Self::RenounceRole { .. } => RENOUNCE_ROLE,
        }
    }

    pub fn signature(&self) -> FunctionSignature {
        signature(self.name())
    }

    pub fn selector(&self) -> Selector {
        self.signature().selector()
    }

    pub fn encode(&self) -> Vec<u8> {
        let args = match *self {
            Self::UpdateDelay { delay } => vec![Token::Uint(delay as u128)],
            Self::GrantRole { role, account }
            | Self::RevokeRole { role, account }
            | Self::RenounceRole { role, account } => vec![
                Token::Uint(role.ledger_id() as u128),
                Token::Address(account),
            ],
        };
        let mut payload = self.selector().as_bytes().to_vec();
        payload.extend_from_slice(&abi::encode(&args));
        payload
    }

    pub fn decode(payload: &[u8]) -> Result<Self, TimelockError> {
        let (selector, _) = govlock_codec::split_payload(payload)?;
        let name = [UPDATE_DELAY, GRANT_ROLE, REVOKE_ROLE, RENOUNCE_ROLE]
            .into_iter()
            .find(|n| signature(n).selector() == selector)
            .ok_or_else(|| {
                TimelockError::MalformedPayload(format!("unknown timelock function {selector}"))
            })?;
        let args = govlock_codec::decode_call(&signature(name), payload)?;

        if name == UPDATE_DELAY {
            let delay = args
                .first()
                .and_then(Token::as_uint)
                .and_then(|d| u64::try_from(d).ok())
                .ok_or_else(|| TimelockError::MalformedPayload("delay out of range".into()))?;
            return Ok(Self::UpdateDelay { delay });
        }

        let role = args
            .first()
            .and_then(Token::as_uint)
            .and_then(|id| u8::try_from(id).ok())
            .and_then(TimelockRole::from_ledger_id)
            .ok_or_else(|| TimelockError::MalformedPayload("unknown role id".into()))?;
        let account = args
            .get(1)
            .and_then(Token::as_address)
            .ok_or_else(|| TimelockError::MalformedPayload("missing account".into()))?;
        Ok(match name {
            GRANT_ROLE => Self::GrantRole { role, account },
            REVOKE_ROLE => Self::RevokeRole { role, account },
            _ => Self::RenounceRole { role, account },
        })
    }
}
