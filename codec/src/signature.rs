//! Canonical function signatures and call payloads.
//!
//! A payload is `selector ‖ encode(args)`, where the selector is the first
//! four bytes of the Blake2b-256 digest of the canonical signature string.

use std::fmt;
use std::str::FromStr;

use govlock_types::Selector;

use crate::abi::{self, ParamType, Token};
use crate::CodecError;

/// A parsed function signature such as `setUserRole(address,uint8,bool)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub name: String,
    pub inputs: Vec<ParamType>,
}

impl FunctionSignature {
    /// Parse a signature, tolerating whitespace and the `uint` alias.
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        let malformed = || CodecError::MalformedSignature(s.to_string());
        let s = s.trim();
        let open = s.find('(').ok_or_else(malformed)?;
        let body = s[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
        let name = s[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(malformed());
        }
        let inputs = if body.trim().is_empty() {
            Vec::new()
        } else {
            body.split(',')
                .map(ParamType::parse)
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(Self {
            name: name.to_string(),
            inputs,
        })
    }

    /// The canonical form hashed into the selector.
    pub fn canonical(&self) -> String {
        let args: Vec<String> = self.inputs.iter().map(|t| t.to_string()).collect();
        format!("{}({})", self.name, args.join(","))
    }

    pub fn selector(&self) -> Selector {
        govlock_crypto::selector(&self.canonical())
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for FunctionSignature {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Build a payload, checking every argument against the signature.
pub fn encode_call(sig: &FunctionSignature, args: &[Token]) -> Result<Vec<u8>, CodecError> {
    if sig.inputs.len() != args.len() {
        return Err(CodecError::ArgumentCount {
            expected: sig.inputs.len(),
            actual: args.len(),
        });
    }
    for (index, (arg, ty)) in args.iter().zip(&sig.inputs).enumerate() {
        if !arg.matches(ty) {
            return Err(CodecError::TypeMismatch {
                index,
                expected: ty.to_string(),
            });
        }
    }
    let mut payload = sig.selector().as_bytes().to_vec();
    payload.extend_from_slice(&abi::encode(args));
    Ok(payload)
}

/// Split a payload into its selector and argument bytes.
pub fn split_payload(payload: &[u8]) -> Result<(Selector, &[u8]), CodecError> {
    let selector = Selector::of_payload(payload).ok_or(CodecError::PayloadTooShort(payload.len()))?;
    Ok((selector, &payload[4..]))
}

/// Decode a payload produced for `sig`.
pub fn decode_call(sig: &FunctionSignature, payload: &[u8]) -> Result<Vec<Token>, CodecError> {
    let (selector, args) = split_payload(payload)?;
    let expected = sig.selector();
    if selector != expected {
        return Err(CodecError::SelectorMismatch {
            expected: expected.to_string(),
            actual: selector.to_string(),
        });
    }
    abi::decode(&sig.inputs, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use govlock_types::Address;

    #[test]
    fn canonical_form_normalises_input() {
        let sig = FunctionSignature::parse(" setUserRole( address , uint8, bool ) ").unwrap();
        assert_eq!(sig.canonical(), "setUserRole(address,uint8,bool)");

        let aliased = FunctionSignature::parse("updateDelay(uint)").unwrap();
        assert_eq!(aliased.canonical(), "updateDelay(uint256)");
    }

    #[test]
    fn no_argument_signature() {
        let sig = FunctionSignature::parse("claimFeeRecipientCollShares()").unwrap();
        assert!(sig.inputs.is_empty());
        let payload = encode_call(&sig, &[]).unwrap();
        assert_eq!(payload.len(), 4);
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert!(FunctionSignature::parse("noParens").is_err());
        assert!(FunctionSignature::parse("(uint8)").is_err());
        assert!(FunctionSignature::parse("f(uint8").is_err());
        assert!(FunctionSignature::parse("f(uint9)").is_err());
    }

    #[test]
    fn payload_starts_with_selector() {
        let sig = FunctionSignature::parse("setFeeRecipientAddress(address)").unwrap();
        let payload = encode_call(&sig, &[Token::Address(Address::repeat_byte(7))]).unwrap();
        assert_eq!(&payload[..4], sig.selector().as_bytes());
        assert_eq!(payload.len(), 36);
    }

    #[test]
    fn encode_type_checks_arguments() {
        let sig = FunctionSignature::parse("setFeeBps(uint16)").unwrap();
        assert_eq!(
            encode_call(&sig, &[]).unwrap_err(),
            CodecError::ArgumentCount {
                expected: 1,
                actual: 0
            }
        );
        assert_eq!(
            encode_call(&sig, &[Token::Bool(true)]).unwrap_err(),
            CodecError::TypeMismatch {
                index: 0,
                expected: "uint16".into()
            }
        );
        assert!(encode_call(&sig, &[Token::Uint(70_000)]).is_err());
    }

    #[test]
    fn decode_call_checks_selector() {
        let set = FunctionSignature::parse("setBeta(uint128)").unwrap();
        let other = FunctionSignature::parse("setGracePeriod(uint128)").unwrap();
        let payload = encode_call(&set, &[Token::Uint(2)]).unwrap();
        assert_eq!(decode_call(&set, &payload).unwrap(), vec![Token::Uint(2)]);
        assert!(matches!(
            decode_call(&other, &payload),
            Err(CodecError::SelectorMismatch { .. })
        ));
        assert_eq!(
            split_payload(&payload[..3]).unwrap_err(),
            CodecError::PayloadTooShort(3)
        );
    }
}
