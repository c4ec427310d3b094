//! Registry mutators as encoded calls.
//!
//! Registry changes travel through timelocks as ordinary payloads, so every
//! mutator has a canonical signature and a selector the registry can itself
//! gate on.

use govlock_codec::abi::{self, ParamType, Token};
use govlock_codec::{CodecError, FunctionSignature};
use govlock_types::{Address, RoleId, Selector};
use serde::{Deserialize, Serialize};

use crate::RegistryError;

/// The registry's gated functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryFunction {
    SetRoleName,
    SetUserRole,
    SetRoleCapability,
    SetPublicCapability,
    BurnCapability,
    SetAuthority,
}

impl RegistryFunction {
    pub const ALL: [RegistryFunction; 6] = [
        Self::SetRoleName,
        Self::SetUserRole,
        Self::SetRoleCapability,
        Self::SetPublicCapability,
        Self::BurnCapability,
        Self::SetAuthority,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SetRoleName => "setRoleName",
            Self::SetUserRole => "setUserRole",
            Self::SetRoleCapability => "setRoleCapability",
            Self::SetPublicCapability => "setPublicCapability",
            Self::BurnCapability => "burnCapability",
            Self::SetAuthority => "setAuthority",
        }
    }

    pub fn inputs(&self) -> Vec<ParamType> {
        let role = ParamType::Uint(8);
        let selector = ParamType::FixedBytes(4);
        match self {
            Self::SetRoleName => vec![role, ParamType::String],
            Self::SetUserRole => vec![ParamType::Address, role, ParamType::Bool],
            Self::SetRoleCapability => {
                vec![role, ParamType::Address, selector, ParamType::Bool]
            }
            Self::SetPublicCapability => vec![ParamType::Address, selector, ParamType::Bool],
            Self::BurnCapability => vec![ParamType::Address, selector],
            Self::SetAuthority => vec![ParamType::Address],
        }
    }

    pub fn signature(&self) -> FunctionSignature {
        FunctionSignature {
            name: self.name().to_string(),
            inputs: self.inputs(),
        }
    }

    pub fn selector(&self) -> Selector {
        self.signature().selector()
    }

    pub fn from_selector(selector: Selector) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.selector() == selector)
    }
}

/// A decoded registry mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryCall {
    SetRoleName {
        role: RoleId,
        name: String,
    },
    SetUserRole {
        user: Address,
        role: RoleId,
        enabled: bool,
    },
    SetRoleCapability {
        role: RoleId,
        target: Address,
        selector: Selector,
        enabled: bool,
    },
    SetPublicCapability {
        target: Address,
        selector: Selector,
        enabled: bool,
    },
    BurnCapability {
        target: Address,
        selector: Selector,
    },
    SetAuthority {
        authority: Address,
    },
}

impl RegistryCall {
    pub fn function(&self) -> RegistryFunction {
        match self {
            Self::SetRoleName { .. } => RegistryFunction::SetRoleName,
            Self::SetUserRole { .. } => RegistryFunction::SetUserRole,
            Self::SetRoleCapability { .. } => RegistryFunction::SetRoleCapability,
            Self::SetPublicCapability { .. } => RegistryFunction::SetPublicCapability,
            Self::BurnCapability { .. } => RegistryFunction::BurnCapability,
            Self::SetAuthority { .. } => RegistryFunction::SetAuthority,
        }
    }

    fn tokens(&self) -> Vec<Token> {
        let role_token = |r: &RoleId| Token::Uint(r.get() as u128);
        let sel_token = |s: &Selector| Token::FixedBytes(s.as_bytes().to_vec());
        match self {
            Self::SetRoleName { role, name } => vec![role_token(role), Token::String(name.clone())],
            Self::SetUserRole {
                user,
                role,
                enabled,
            } => vec![Token::Address(*user), role_token(role), Token::Bool(*enabled)],
            Self::SetRoleCapability {
                role,
                target,
                selector,
                enabled,
            } => vec![
                role_token(role),
                Token::Address(*target),
                sel_token(selector),
                Token::Bool(*enabled),
            ],
            Self::SetPublicCapability {
                target,
                selector,
                enabled,
            } => vec![
                Token::Address(*target),
                sel_token(selector),
                Token::Bool(*enabled),
            ],
            Self::BurnCapability { target, selector } => {
                vec![Token::Address(*target), sel_token(selector)]
            }
            Self::SetAuthority { authority } => vec![Token::Address(*authority)],
        }
    }

    /// Payload for this call (`selector ‖ args`).
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = self.function().selector().as_bytes().to_vec();
        payload.extend_from_slice(&abi::encode(&self.tokens()));
        payload
    }

    pub fn decode(payload: &[u8]) -> Result<Self, RegistryError> {
        let (selector, _) = govlock_codec::split_payload(payload)?;
        let function =
            RegistryFunction::from_selector(selector).ok_or(RegistryError::UnknownFunction(selector))?;
        let args = govlock_codec::decode_call(&function.signature(), payload)?;
        let mut args = args.into_iter();
        let mut next = || args.next().ok_or(CodecError::ArgumentCount {
            expected: function.inputs().len(),
            actual: 0,
        });

        let call = match function {
            RegistryFunction::SetRoleName => Self::SetRoleName {
                role: role_of(next()?)?,
                name: string_of(next()?)?,
            },
            RegistryFunction::SetUserRole => Self::SetUserRole {
                user: address_of(next()?)?,
                role: role_of(next()?)?,
                enabled: bool_of(next()?)?,
            },
            RegistryFunction::SetRoleCapability => Self::SetRoleCapability {
                role: role_of(next()?)?,
                target: address_of(next()?)?,
                selector: selector_of(next()?)?,
                enabled: bool_of(next()?)?,
            },
            RegistryFunction::SetPublicCapability => Self::SetPublicCapability {
                target: address_of(next()?)?,
                selector: selector_of(next()?)?,
                enabled: bool_of(next()?)?,
            },
            RegistryFunction::BurnCapability => Self::BurnCapability {
                target: address_of(next()?)?,
                selector: selector_of(next()?)?,
            },
            RegistryFunction::SetAuthority => Self::SetAuthority {
                authority: address_of(next()?)?,
            },
        };
        Ok(call)
    }
}

fn mismatch(expected: &str) -> CodecError {
    CodecError::InvalidValue(format!("expected {expected}"))
}

fn role_of(token: Token) -> Result<RoleId, CodecError> {
    token
        .as_uint()
        .and_then(|v| u8::try_from(v).ok())
        .map(RoleId::new)
        .ok_or_else(|| mismatch("uint8"))
}

fn address_of(token: Token) -> Result<Address, CodecError> {
    token.as_address().ok_or_else(|| mismatch("address"))
}

fn bool_of(token: Token) -> Result<bool, CodecError> {
    token.as_bool().ok_or_else(|| mismatch("bool"))
}

fn string_of(token: Token) -> Result<String, CodecError> {
    match token {
        Token::String(s) => Ok(s),
        _ => Err(mismatch("string")),
    }
}

fn selector_of(token: Token) -> Result<Selector, CodecError> {
    token
        .as_fixed_bytes()
        .and_then(Selector::of_payload)
        .ok_or_else(|| mismatch("bytes4"))
}
