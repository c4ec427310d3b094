//! Operation calls and their deterministic ids.

use std::fmt;

use govlock_types::{Address, Hash32, Selector};
use serde::{Deserialize, Serialize};

use crate::abi::{encode, Token};

/// One call an operation performs: `target.call{value}(payload)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCall {
    pub target: Address,
    pub value: u128,
    pub payload: Vec<u8>,
}

impl OperationCall {
    pub fn new(target: Address, payload: Vec<u8>) -> Self {
        Self {
            target,
            value: 0,
            payload,
        }
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    pub fn selector(&self) -> Option<Selector> {
        Selector::of_payload(&self.payload)
    }

    /// Id of a single-call operation made of this call.
    pub fn id(&self, predecessor: Hash32, salt: Hash32) -> Hash32 {
        hash_operation(self.target, self.value, &self.payload, predecessor, salt)
    }
}

impl fmt::Display for OperationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selector() {
            Some(sel) => write!(f, "{}::{}", self.target, sel),
            None => write!(f, "{}::<fallback>", self.target),
        }?;
        if self.value > 0 {
            write!(f, " value={}", self.value)?;
        }
        Ok(())
    }
}

/// `id = Blake2b-256(encode(target, value, payload, predecessor, salt))`.
pub fn hash_operation(
    target: Address,
    value: u128,
    payload: &[u8],
    predecessor: Hash32,
    salt: Hash32,
) -> Hash32 {
    let encoded = encode(&[
        Token::Address(target),
        Token::Uint(value),
        Token::Bytes(payload.to_vec()),
        Token::FixedBytes(predecessor.as_bytes().to_vec()),
        Token::FixedBytes(salt.as_bytes().to_vec()),
    ]);
    govlock_crypto::hash32(&encoded)
}

/// `id = Blake2b-256(encode(address[], uint[], bytes[], predecessor, salt))`.
///
/// Order matters: the same calls in a different order yield a different id.
pub fn hash_operation_batch(calls: &[OperationCall], predecessor: Hash32, salt: Hash32) -> Hash32 {
    let targets = calls.iter().map(|c| Token::Address(c.target)).collect();
    let values = calls.iter().map(|c| Token::Uint(c.value)).collect();
    let payloads = calls.iter().map(|c| Token::Bytes(c.payload.clone())).collect();
    let encoded = encode(&[
        Token::Array(targets),
        Token::Array(values),
        Token::Array(payloads),
        Token::FixedBytes(predecessor.as_bytes().to_vec()),
        Token::FixedBytes(salt.as_bytes().to_vec()),
    ]);
    govlock_crypto::hash32(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(byte: u8) -> OperationCall {
        OperationCall::new(Address::repeat_byte(byte), vec![byte; 36])
    }

    #[test]
    fn single_id_is_stable() {
        let c = call(1);
        assert_eq!(
            c.id(Hash32::ZERO, Hash32::from_low_u64(1)),
            hash_operation(c.target, 0, &c.payload, Hash32::ZERO, Hash32::from_low_u64(1))
        );
    }

    #[test]
    fn batch_order_matters() {
        let a = call(1);
        let b = call(2);
        let salt = Hash32::from_low_u64(9);
        assert_ne!(
            hash_operation_batch(&[a.clone(), b.clone()], Hash32::ZERO, salt),
            hash_operation_batch(&[b, a], Hash32::ZERO, salt)
        );
    }

    #[test]
    fn batch_of_one_differs_from_single() {
        let a = call(3);
        let salt = Hash32::ZERO;
        assert_ne!(
            hash_operation_batch(std::slice::from_ref(&a), Hash32::ZERO, salt),
            a.id(Hash32::ZERO, salt)
        );
    }

    #[test]
    fn display_shows_target_and_selector() {
        let c = OperationCall::new(Address::repeat_byte(0x11), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(c.to_string().ends_with("::0xdeadbeef"));
    }
}
