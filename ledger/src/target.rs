//! Parameter targets: business-logic contracts reduced to auth-gated setters
//! over named storage slots.
//!
//! Every setter takes exactly one argument and writes it to its slot. Each
//! slot is also readable through a zero-argument getter named after the slot
//! (`feeBps()`), which is ungated. Targets never accept value.

use std::collections::BTreeMap;

use govlock_codec::abi::{self, ParamType, Token};
use govlock_codec::{decode_call, split_payload, FunctionSignature};
use govlock_types::{Address, Selector};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// A declared setter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setter {
    /// Canonical signature, e.g. `setFeeBps(uint256)`.
    pub signature: String,
    pub slot: String,
    /// Inclusive bounds, only meaningful for `uint` setters.
    pub min: Option<u128>,
    pub max: Option<u128>,
}

impl Setter {
    pub fn new(signature: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            slot: slot.into(),
            min: None,
            max: None,
        }
    }

    pub fn bounded(mut self, min: u128, max: u128) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn at_least(mut self, min: u128) -> Self {
        self.min = Some(min);
        self
    }

    pub fn parsed(&self) -> Result<FunctionSignature, LedgerError> {
        Ok(FunctionSignature::parse(&self.signature)?)
    }

    /// The single argument type.
    pub fn param(&self) -> Result<ParamType, LedgerError> {
        let sig = self.parsed()?;
        match sig.inputs.as_slice() {
            [ty] => Ok(ty.clone()),
            _ => Err(LedgerError::Genesis(format!(
                "setter {} must take exactly one argument",
                self.signature
            ))),
        }
    }

    fn check_bounds(&self, value: &Token) -> Result<(), LedgerError> {
        let Some(v) = value.as_uint() else {
            return Ok(());
        };
        let min = self.min.unwrap_or(0);
        let max = self.max.unwrap_or(u128::MAX);
        if v < min || v > max {
            return Err(LedgerError::OutOfBounds {
                slot: self.slot.clone(),
                value: v,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Selector of the getter for `slot`.
pub fn getter_selector(slot: &str) -> Selector {
    FunctionSignature {
        name: slot.to_string(),
        inputs: Vec::new(),
    }
    .selector()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterTarget {
    label: String,
    address: Address,
    /// Registry deciding who may call the setters.
    authority: Address,
    setters: BTreeMap<Selector, Setter>,
    slots: BTreeMap<String, Token>,
}

impl ParameterTarget {
    pub fn new(label: impl Into<String>, address: Address, authority: Address) -> Self {
        Self {
            label: label.into(),
            address,
            authority,
            setters: BTreeMap::new(),
            slots: BTreeMap::new(),
        }
    }

    /// Declare a setter and seed its slot. Returns the setter's selector.
    pub fn add_setter(&mut self, setter: Setter, initial: Token) -> Result<Selector, LedgerError> {
        let param = setter.param()?;
        if !initial.matches(&param) {
            return Err(LedgerError::Genesis(format!(
                "initial value {initial} for {} is not a {param}",
                setter.slot
            )));
        }
        if (setter.min.is_some() || setter.max.is_some()) && !matches!(param, ParamType::Uint(_)) {
            return Err(LedgerError::Genesis(format!(
                "bounds on non-uint setter {}",
                setter.signature
            )));
        }
        setter.check_bounds(&initial)?;
        let selector = setter.parsed()?.selector();
        if self.setters.contains_key(&selector) {
            return Err(LedgerError::Genesis(format!(
                "{} declares {} twice",
                self.label, setter.signature
            )));
        }
        self.slots.insert(setter.slot.clone(), initial);
        self.setters.insert(selector, setter);
        Ok(selector)
    }

    pub fn with_setter(mut self, setter: Setter, initial: Token) -> Result<Self, LedgerError> {
        self.add_setter(setter, initial)?;
        Ok(self)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    pub fn setter(&self, selector: Selector) -> Option<&Setter> {
        self.setters.get(&selector)
    }

    pub fn setters(&self) -> impl Iterator<Item = (Selector, &Setter)> {
        self.setters.iter().map(|(s, setter)| (*s, setter))
    }

    pub fn is_setter(&self, selector: Selector) -> bool {
        self.setters.contains_key(&selector)
    }

    /// Find a setter by function name (`setFeeBps`) or canonical signature.
    pub fn setter_named(&self, name: &str) -> Option<(Selector, &Setter)> {
        self.setters().find(|(_, s)| {
            s.signature == name || s.signature.split('(').next() == Some(name)
        })
    }

    pub fn slot(&self, name: &str) -> Option<&Token> {
        self.slots.get(name)
    }

    pub fn slots(&self) -> &BTreeMap<String, Token> {
        &self.slots
    }

    /// Execute a payload. Authorization of setters is the caller's job.
    pub fn call(&mut self, payload: &[u8], value: u128) -> Result<Vec<u8>, LedgerError> {
        if value != 0 {
            return Err(LedgerError::NonPayable {
                target: self.address,
                value,
            });
        }
        let (selector, _) = split_payload(payload)?;

        if let Some(setter) = self.setters.get(&selector) {
            let mut args = decode_call(&setter.parsed()?, payload)?;
            let value = args.pop().ok_or_else(|| {
                LedgerError::Codec(govlock_codec::CodecError::ArgumentCount {
                    expected: 1,
                    actual: 0,
                })
            })?;
            setter.check_bounds(&value)?;
            tracing::debug!(target_label = %self.label, slot = %setter.slot, %value, "slot written");
            self.slots.insert(setter.slot.clone(), value);
            return Ok(Vec::new());
        }

        self.slots
            .iter()
            .find(|(slot, _)| getter_selector(slot) == selector)
            .map(|(_, value)| abi::encode(std::slice::from_ref(value)))
            .ok_or(LedgerError::UnknownFunction {
                target: self.address,
                selector,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govlock_codec::encode_call;

    fn active_pool() -> ParameterTarget {
        ParameterTarget::new(
            "active_pool",
            Address::from_label("active_pool"),
            Address::from_label("authority"),
        )
        .with_setter(Setter::new("setFeeBps(uint256)", "feeBps").bounded(0, 1000), Token::Uint(0))
        .unwrap()
        .with_setter(
            Setter::new("setFlashLoansPaused(bool)", "flashLoansPaused"),
            Token::Bool(false),
        )
        .unwrap()
    }

    fn payload(sig: &str, arg: Token) -> Vec<u8> {
        encode_call(&FunctionSignature::parse(sig).unwrap(), &[arg]).unwrap()
    }

    #[test]
    fn test_setter_writes_slot() {
        let mut pool = active_pool();
        pool.call(&payload("setFeeBps(uint256)", Token::Uint(500)), 0)
            .unwrap();
        assert_eq!(pool.slot("feeBps"), Some(&Token::Uint(500)));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut pool = active_pool();
        pool.call(&payload("setFeeBps(uint256)", Token::Uint(1000)), 0)
            .unwrap();
        let err = pool
            .call(&payload("setFeeBps(uint256)", Token::Uint(1001)), 0)
            .unwrap_err();
        assert!(matches!(err, LedgerError::OutOfBounds { value: 1001, .. }));
        assert_eq!(pool.slot("feeBps"), Some(&Token::Uint(1000)));
    }

    #[test]
    fn test_getter_returns_encoded_slot() {
        let mut pool = active_pool();
        let out = pool.call(getter_selector("flashLoansPaused").as_bytes(), 0).unwrap();
        assert_eq!(abi::decode(&[ParamType::Bool], &out).unwrap(), vec![Token::Bool(false)]);
    }

    #[test]
    fn test_rejects_value_and_unknown_selector() {
        let mut pool = active_pool();
        assert!(matches!(
            pool.call(&payload("setFeeBps(uint256)", Token::Uint(1)), 5),
            Err(LedgerError::NonPayable { value: 5, .. })
        ));
        assert!(matches!(
            pool.call(&[0xde, 0xad, 0xbe, 0xef], 0),
            Err(LedgerError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn test_declaration_is_validated() {
        let pool = active_pool();
        assert!(pool
            .clone()
            .with_setter(Setter::new("setBeta(uint256,uint256)", "beta"), Token::Uint(0))
            .is_err());
        assert!(pool
            .clone()
            .with_setter(Setter::new("setBeta(uint256)", "beta"), Token::Bool(true))
            .is_err());
        assert!(pool
            .with_setter(Setter::new("setPaused(bool)", "paused").bounded(0, 1), Token::Bool(false))
            .is_err());
    }

    #[test]
    fn test_setter_named() {
        let pool = active_pool();
        let (sel, setter) = pool.setter_named("setFeeBps").unwrap();
        assert_eq!(setter.slot, "feeBps");
        assert!(pool.is_setter(sel));
        assert!(pool.setter_named("setFeeBps(uint256)").is_some());
        assert!(pool.setter_named("setBeta").is_none());
    }
}
